//! Error taxonomy for the generation pipeline.
//!
//! Four failure kinds, matching what callers can actually do about them:
//! fix configuration, retry later (transport/rate limit), or report an
//! unusable answer. The `Display` impls are the user-facing strings — the
//! orchestrator surfaces them verbatim in `{tweet: "", error}` outcomes.

use thiserror::Error;

/// A failure anywhere in the generation pipeline.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No usable credential before any network call was made.
    #[error("{0}")]
    Configuration(String),

    /// The provider answered with a non-2xx status after retry exhaustion.
    #[error("The {provider} API returned {status}: {detail}")]
    Transport {
        provider: String,
        status: u16,
        detail: String,
    },

    /// The request never produced a response (DNS, connect, TLS, read).
    #[error("Could not reach the provider: {0}")]
    Network(String),

    /// A 2xx response whose body no normalizer stage could make sense of.
    #[error("The model answered, but no usable post could be extracted. Try again or rephrase the topic.")]
    Parse,

    /// Local quota exceeded — the request never reached the network.
    #[error("Too many requests. Try again in {retry_after_secs}s.")]
    RateLimited { retry_after_secs: u64 },
}

impl GenerationError {
    /// Configuration error with setup guidance listing the credential keys.
    pub fn missing_credentials(env_keys: &[&str]) -> Self {
        GenerationError::Configuration(format!(
            "No LLM provider is configured. Set one of {} and retry.",
            env_keys.join(", ")
        ))
    }

    /// Shorten a provider error body to something fit for display.
    pub fn transport(provider: &str, status: u16, body: &str) -> Self {
        let detail = body.trim();
        let detail = if detail.is_empty() {
            "no response body".to_string()
        } else if detail.chars().count() > 200 {
            let cut: String = detail.chars().take(200).collect();
            format!("{cut}…")
        } else {
            detail.to_string()
        };
        GenerationError::Transport {
            provider: provider.to_string(),
            status,
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials_names_keys() {
        let err = GenerationError::missing_credentials(&["ZHIPU_API_KEY", "GROQ_API_KEY"]);
        let msg = err.to_string();
        assert!(msg.contains("ZHIPU_API_KEY"));
        assert!(msg.contains("GROQ_API_KEY"));
        assert!(msg.contains("No LLM provider is configured"));
    }

    #[test]
    fn test_transport_truncates_long_bodies() {
        let body = "x".repeat(500);
        let err = GenerationError::transport("Groq", 500, &body);
        let msg = err.to_string();
        assert!(msg.contains("Groq"));
        assert!(msg.contains("500"));
        assert!(msg.chars().count() < 300);
    }

    #[test]
    fn test_transport_empty_body() {
        let err = GenerationError::transport("Gemini", 503, "   ");
        assert!(err.to_string().contains("no response body"));
    }

    #[test]
    fn test_rate_limited_display() {
        let err = GenerationError::RateLimited {
            retry_after_secs: 42,
        };
        assert_eq!(err.to_string(), "Too many requests. Try again in 42s.");
    }
}
