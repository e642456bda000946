//! Config loader — reads `~/.tweetforge/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.tweetforge/config.json`
//! 3. Environment variables `TWEETFORGE_<SECTION>__<FIELD>` (override JSON)
//!
//! Bare provider env keys (`ZHIPU_API_KEY`, `GROQ_API_KEY`, …) are *not*
//! merged here — the provider selector consults them through its own
//! credential source, so config and environment stay separately testable.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be
/// parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    load_config_from_path(&config_path)
}

/// Load config from a specific file path.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    let config: Config = match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    apply_env_overrides(config)
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `TWEETFORGE_<SECTION>__<FIELD>` (double underscore as
/// delimiter).
///
/// Supported overrides:
/// - `TWEETFORGE_GENERATION__LENGTH` → `generation.length`
/// - `TWEETFORGE_GENERATION__TEMPERATURE` → `generation.temperature`
/// - `TWEETFORGE_GENERATION__MAX_TOKENS` → `generation.max_tokens`
/// - `TWEETFORGE_GENERATION__MAX_RETRIES` → `generation.max_retries`
/// - `TWEETFORGE_PROVIDERS__<ID>__API_KEY` → `providers.<id>.api_key`
/// - `TWEETFORGE_PROVIDERS__<ID>__API_BASE` → `providers.<id>.api_base`
fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(val) = std::env::var("TWEETFORGE_GENERATION__LENGTH") {
        match val.parse() {
            Ok(tier) => config.generation.length = tier,
            Err(e) => warn!("Ignoring TWEETFORGE_GENERATION__LENGTH: {}", e),
        }
    }
    if let Ok(val) = std::env::var("TWEETFORGE_GENERATION__TEMPERATURE") {
        if let Ok(t) = val.parse::<f64>() {
            config.generation.temperature = t;
        }
    }
    if let Ok(val) = std::env::var("TWEETFORGE_GENERATION__MAX_TOKENS") {
        if let Ok(n) = val.parse::<u32>() {
            config.generation.max_tokens = n;
        }
    }
    if let Ok(val) = std::env::var("TWEETFORGE_GENERATION__MAX_RETRIES") {
        if let Ok(n) = val.parse::<u32>() {
            config.generation.max_retries = n;
        }
    }

    apply_provider_env(&mut config.providers.zhipu, "ZHIPU");
    apply_provider_env(&mut config.providers.groq, "GROQ");
    apply_provider_env(&mut config.providers.deepseek, "DEEPSEEK");
    apply_provider_env(&mut config.providers.gemini, "GEMINI");
    apply_provider_env(&mut config.providers.openrouter, "OPENROUTER");

    config
}

/// Apply env var overrides for a single provider.
fn apply_provider_env(provider: &mut super::schema::ProviderConfig, name: &str) {
    if let Ok(val) = std::env::var(format!("TWEETFORGE_PROVIDERS__{name}__API_KEY")) {
        provider.api_key = val;
    }
    if let Ok(val) = std::env::var(format!("TWEETFORGE_PROVIDERS__{name}__API_BASE")) {
        provider.api_base = Some(val);
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LengthTier;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_missing_file() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.json"));
        assert_eq!(config.generation.max_tokens, 1024);
        assert_eq!(config.limits.single.limit, 15);
    }

    #[test]
    fn test_load_valid_json() {
        let file = write_temp_json(
            r#"{
            "generation": {
                "maxTokens": 512,
                "maxRetries": 5
            }
        }"#,
        );

        let config = load_config_from_path(file.path());
        assert_eq!(config.generation.max_tokens, 512);
        assert_eq!(config.generation.max_retries, 5);
        // Default preserved
        assert_eq!(config.generation.temperature, 0.8);
    }

    #[test]
    fn test_load_invalid_json_returns_defaults() {
        let file = write_temp_json("not valid json {{{");
        let config = load_config_from_path(file.path());
        assert_eq!(config.generation.max_tokens, 1024);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.generation.length = LengthTier::Short;
        config.providers.groq.api_key = "gsk-test".to_string();

        save_config(&config, Some(&path)).unwrap();

        let reloaded = load_config_from_path(&path);
        assert_eq!(reloaded.generation.length, LengthTier::Short);
        assert_eq!(reloaded.providers.groq.api_key, "gsk-test");
    }

    #[test]
    fn test_env_override_length() {
        std::env::set_var("TWEETFORGE_GENERATION__LENGTH", "short");
        let config = apply_env_overrides(Config::default());
        assert_eq!(config.generation.length, LengthTier::Short);
        std::env::remove_var("TWEETFORGE_GENERATION__LENGTH");
    }

    #[test]
    fn test_env_override_provider_key() {
        std::env::set_var("TWEETFORGE_PROVIDERS__DEEPSEEK__API_KEY", "sk-env");
        let config = apply_env_overrides(Config::default());
        assert_eq!(config.providers.deepseek.api_key, "sk-env");
        std::env::remove_var("TWEETFORGE_PROVIDERS__DEEPSEEK__API_KEY");
    }

    #[test]
    fn test_saved_json_uses_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        save_config(&Config::default(), Some(&path)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&content).unwrap();

        assert!(raw["generation"].get("maxTokens").is_some());
        assert!(raw["generation"].get("max_tokens").is_none());
    }
}
