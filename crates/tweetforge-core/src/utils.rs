//! Utility helpers — data paths, session keys, share-intent URLs.

use std::path::PathBuf;

/// Get the Tweetforge data directory (e.g. `~/.tweetforge/`).
pub fn get_data_path() -> PathBuf {
    let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".tweetforge")
}

/// Helper to get home directory.
fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("USERPROFILE").ok().map(PathBuf::from))
}

/// Get current ISO 8601 timestamp.
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Derive the rate-limit key shared by all limiters of one session.
///
/// The credential never appears in the key — only a short hash of it, so
/// keys are safe to log.
pub fn derive_session_key(provider_id: &str, credential: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    credential.hash(&mut hasher);
    format!("{}:{:08x}", provider_id, hasher.finish() as u32)
}

/// Build the share-intent URL for a finished post.
///
/// Nothing is ever posted by this system; opening this prefilled URL is the
/// entire social-network integration.
pub fn share_intent_url(tweet: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(tweet.as_bytes()).collect();
    format!("https://twitter.com/intent/tweet?text={encoded}")
}
