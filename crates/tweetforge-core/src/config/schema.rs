//! Configuration schema.
//!
//! Hierarchy: `Config` → `GenerationDefaults`, `ProvidersConfig`,
//! `LimitsConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! `#[serde(rename_all = "camelCase")]` handles the conversion.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::LengthTier;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.tweetforge/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub generation: GenerationDefaults,
    pub providers: ProvidersConfig,
    pub limits: LimitsConfig,
}

// ─────────────────────────────────────────────
// Generation defaults
// ─────────────────────────────────────────────

/// Default generation settings, overridable per request.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationDefaults {
    /// Default length tier when a request carries none.
    pub length: LengthTier,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// Maximum tokens to generate per response.
    pub max_tokens: u32,
    /// Transport retry attempts after the first request.
    pub max_retries: u32,
    /// Initial backoff delay in milliseconds (doubles per attempt).
    pub initial_delay_ms: u64,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            length: LengthTier::Long,
            temperature: 0.8,
            max_tokens: 1024,
            max_retries: 3,
            initial_delay_ms: 1000,
        }
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Configuration for a single LLM provider (API key, base URL override).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// API key for authentication.
    #[serde(default)]
    pub api_key: String,
    /// Custom API base URL (overrides the registry endpoint).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

impl ProviderConfig {
    /// Whether this provider has a configured API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// All provider configurations, one per supported backend.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub zhipu: ProviderConfig,
    #[serde(default)]
    pub groq: ProviderConfig,
    #[serde(default)]
    pub deepseek: ProviderConfig,
    #[serde(default)]
    pub gemini: ProviderConfig,
    #[serde(default)]
    pub openrouter: ProviderConfig,
}

impl ProvidersConfig {
    /// Get a provider config by registry id (e.g. `"zhipu"`).
    pub fn get_by_id(&self, id: &str) -> Option<&ProviderConfig> {
        match id {
            "zhipu" => Some(&self.zhipu),
            "groq" => Some(&self.groq),
            "deepseek" => Some(&self.deepseek),
            "gemini" => Some(&self.gemini),
            "openrouter" => Some(&self.openrouter),
            _ => None,
        }
    }

    /// Convert to a map keyed by provider id.
    pub fn to_map(&self) -> HashMap<String, ProviderConfig> {
        let entries: &[(&str, &ProviderConfig)] = &[
            ("zhipu", &self.zhipu),
            ("groq", &self.groq),
            ("deepseek", &self.deepseek),
            ("gemini", &self.gemini),
            ("openrouter", &self.openrouter),
        ];
        entries
            .iter()
            .map(|(id, cfg)| (id.to_string(), (*cfg).clone()))
            .collect()
    }
}

// ─────────────────────────────────────────────
// Rate limits
// ─────────────────────────────────────────────

/// One admission window: at most `limit` requests per `window_secs`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LimitWindow {
    pub limit: u32,
    pub window_secs: u64,
}

impl LimitWindow {
    pub const fn new(limit: u32, window_secs: u64) -> Self {
        Self { limit, window_secs }
    }
}

/// Per-category rate limits. Each category gets its own limiter instance,
/// so exhausting one never blocks another. Batch carries the tightest
/// ceiling, vision the next, single generation the loosest.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct LimitsConfig {
    pub single: LimitWindow,
    pub batch: LimitWindow,
    pub vision: LimitWindow,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            single: LimitWindow::new(15, 60),
            batch: LimitWindow::new(3, 60),
            vision: LimitWindow::new(8, 60),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
