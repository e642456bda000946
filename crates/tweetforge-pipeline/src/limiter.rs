//! Client-side request throttling.
//!
//! Sliding-window admission over per-key timestamp lists: each check prunes
//! entries older than the window, then admits and records, or denies with a
//! retry hint. The window boundary tracks the oldest retained request, which
//! degrades gracefully under bursts — upstream provider quotas are
//! themselves sliding, so this mirrors what the server would do anyway.
//!
//! Each operation category (single / batch / vision) gets its own limiter
//! instance with its own limit and window, so exhausting one never blocks
//! another. [`SessionLimits`] bundles the three for one session; state lives
//! and dies with the session object.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use tweetforge_core::config::schema::{LimitWindow, LimitsConfig};

// ─────────────────────────────────────────────
// Results & categories
// ─────────────────────────────────────────────

/// Outcome of one admission check. Derived, never stored.
#[derive(Clone, Copy, Debug)]
pub struct RateLimitResult {
    pub allowed: bool,
    /// Admissions left in the current window, after this check.
    pub remaining: u32,
    /// When the window frees up next.
    pub reset_at: Instant,
    /// How long to wait before retrying. Present only when denied.
    pub retry_after: Option<Duration>,
}

/// The three independently-throttled operation kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestCategory {
    Single,
    Batch,
    Vision,
}

impl RequestCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestCategory::Single => "single",
            RequestCategory::Batch => "batch",
            RequestCategory::Vision => "vision",
        }
    }
}

// ─────────────────────────────────────────────
// SlidingWindowLimiter
// ─────────────────────────────────────────────

/// Per-key sliding-window limiter.
///
/// `check` runs synchronously start-to-finish under the lock — there is no
/// await inside — so read-modify-write is atomic without further ceremony.
pub struct SlidingWindowLimiter {
    limit: u32,
    window: Duration,
    entries: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_window(w: LimitWindow) -> Self {
        Self::new(w.limit, Duration::from_secs(w.window_secs))
    }

    /// Admit or deny one request for `key`.
    pub fn check(&self, key: &str) -> RateLimitResult {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let list = entries.entry(key.to_string()).or_default();

        Self::prune(list, now, self.window);

        let count = list.len() as u32;
        if count < self.limit {
            list.push_back(now);
            let oldest = *list.front().unwrap_or(&now);
            RateLimitResult {
                allowed: true,
                remaining: self.limit - (count + 1),
                reset_at: oldest + self.window,
                retry_after: None,
            }
        } else {
            let oldest = *list.front().unwrap_or(&now);
            let reset_at = oldest + self.window;
            RateLimitResult {
                allowed: false,
                remaining: 0,
                reset_at,
                retry_after: Some(reset_at.saturating_duration_since(now)),
            }
        }
    }

    /// Forget all admissions for `key`.
    pub fn reset(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    /// Drop keys whose pruned lists are empty, bounding memory.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.retain(|_, list| {
            Self::prune(list, now, self.window);
            !list.is_empty()
        });
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.entries.lock().len()
    }

    fn prune(list: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(front) = list.front() {
            if now.duration_since(*front) >= window {
                list.pop_front();
            } else {
                break;
            }
        }
    }
}

// ─────────────────────────────────────────────
// SessionLimits
// ─────────────────────────────────────────────

/// The three per-category limiters of one session, sharing one derived key.
///
/// Constructed per session, disposed at session end — never a global.
pub struct SessionLimits {
    key: String,
    single: SlidingWindowLimiter,
    batch: SlidingWindowLimiter,
    vision: SlidingWindowLimiter,
}

impl SessionLimits {
    pub fn new(key: impl Into<String>, config: &LimitsConfig) -> Self {
        Self {
            key: key.into(),
            single: SlidingWindowLimiter::from_window(config.single),
            batch: SlidingWindowLimiter::from_window(config.batch),
            vision: SlidingWindowLimiter::from_window(config.vision),
        }
    }

    /// Admission check against the category's own limiter.
    pub fn check(&self, category: RequestCategory) -> RateLimitResult {
        let result = self.limiter(category).check(&self.key);
        if !result.allowed {
            debug!(
                category = category.as_str(),
                retry_after_ms = result.retry_after.map(|d| d.as_millis() as u64),
                "request denied by local limiter"
            );
        }
        result
    }

    /// Forget this session's admissions in every category.
    pub fn reset_all(&self) {
        self.single.reset(&self.key);
        self.batch.reset(&self.key);
        self.vision.reset(&self.key);
    }

    /// Prune empty keys in every category.
    pub fn cleanup(&self) {
        self.single.cleanup();
        self.batch.cleanup();
        self.vision.cleanup();
    }

    fn limiter(&self, category: RequestCategory) -> &SlidingWindowLimiter {
        match category {
            RequestCategory::Single => &self.single,
            RequestCategory::Batch => &self.batch,
            RequestCategory::Vision => &self.vision,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
