//! Provider registry — static specs for all supported providers, plus the
//! selector that picks which one a session talks to.
//!
//! Each `ProviderSpec` describes how to connect: endpoint, model ids,
//! credential key, auth scheme, request body shape, streaming support.
//! The table is ordered — the selector walks it top to bottom and takes the
//! first provider whose credential is present.

use std::collections::HashMap;

use tweetforge_core::config::schema::ProvidersConfig;

// ─────────────────────────────────────────────
// ProviderSpec — static metadata for one provider
// ─────────────────────────────────────────────

/// How a provider authenticates requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`.
    Bearer,
    /// A custom header carrying the raw key, e.g. `x-goog-api-key`.
    Header(&'static str),
    /// Short-lived HMAC-SHA256-signed token derived from an `id.secret`
    /// compound key (see [`crate::auth::signed_token`]).
    SignedToken,
}

/// The JSON body shape a provider expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyShape {
    /// OpenAI-compatible `/chat/completions` request.
    OpenAiChat,
    /// Gemini `contents/parts` request.
    GeminiContents,
}

/// Static connection parameters for one LLM provider.
#[derive(Clone, Debug)]
pub struct ProviderSpec {
    /// Internal id (e.g. `"zhipu"`).
    pub id: &'static str,
    /// Human-readable name for logs. E.g. `"ZhiPu"`.
    pub display_name: &'static str,
    /// Full endpoint URL for chat completion calls.
    pub endpoint: &'static str,
    /// Default text model.
    pub model: &'static str,
    /// Vision-capable model, when the provider has a distinct one.
    pub vision_model: Option<&'static str>,
    /// Environment variable holding the credential. E.g. `"ZHIPU_API_KEY"`.
    pub credential_key: &'static str,
    pub auth: AuthScheme,
    pub body: BodyShape,
    /// Whether the endpoint supports SSE streaming.
    pub supports_streaming: bool,
}

impl ProviderSpec {
    /// Model to use for a call, honoring the vision switch.
    pub fn model_for(&self, vision: bool) -> &'static str {
        if vision {
            self.vision_model.unwrap_or(self.model)
        } else {
            self.model
        }
    }
}

// ─────────────────────────────────────────────
// All providers, in fixed priority order
// ─────────────────────────────────────────────

/// Complete list of supported provider specifications, in selection
/// priority order.
pub static PROVIDERS: &[ProviderSpec] = &[
    // 1. ZhiPu GLM — generous free tier, signed-token auth
    ProviderSpec {
        id: "zhipu",
        display_name: "ZhiPu",
        endpoint: "https://open.bigmodel.cn/api/paas/v4/chat/completions",
        model: "glm-4-flash",
        vision_model: Some("glm-4v-flash"),
        credential_key: "ZHIPU_API_KEY",
        auth: AuthScheme::SignedToken,
        body: BodyShape::OpenAiChat,
        supports_streaming: true,
    },
    // 2. Groq
    ProviderSpec {
        id: "groq",
        display_name: "Groq",
        endpoint: "https://api.groq.com/openai/v1/chat/completions",
        model: "llama-3.3-70b-versatile",
        vision_model: Some("llama-3.2-90b-vision-preview"),
        credential_key: "GROQ_API_KEY",
        auth: AuthScheme::Bearer,
        body: BodyShape::OpenAiChat,
        supports_streaming: true,
    },
    // 3. DeepSeek
    ProviderSpec {
        id: "deepseek",
        display_name: "DeepSeek",
        endpoint: "https://api.deepseek.com/v1/chat/completions",
        model: "deepseek-chat",
        vision_model: None,
        credential_key: "DEEPSEEK_API_KEY",
        auth: AuthScheme::Bearer,
        body: BodyShape::OpenAiChat,
        supports_streaming: true,
    },
    // 4. Gemini — contents/parts body, key in a custom header, no SSE
    ProviderSpec {
        id: "gemini",
        display_name: "Gemini",
        endpoint:
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent",
        model: "gemini-2.0-flash",
        vision_model: Some("gemini-2.0-flash"),
        credential_key: "GEMINI_API_KEY",
        auth: AuthScheme::Header("x-goog-api-key"),
        body: BodyShape::GeminiContents,
        supports_streaming: false,
    },
    // 5. OpenRouter — gateway fallback
    ProviderSpec {
        id: "openrouter",
        display_name: "OpenRouter",
        endpoint: "https://openrouter.ai/api/v1/chat/completions",
        model: "meta-llama/llama-3.3-70b-instruct",
        vision_model: None,
        credential_key: "OPENROUTER_API_KEY",
        auth: AuthScheme::Bearer,
        body: BodyShape::OpenAiChat,
        supports_streaming: true,
    },
];

/// Find a provider spec by id.
pub fn find_by_id(id: &str) -> Option<&'static ProviderSpec> {
    PROVIDERS.iter().find(|spec| spec.id == id)
}

/// The credential env keys, in priority order — for setup guidance.
pub fn credential_keys() -> Vec<&'static str> {
    PROVIDERS.iter().map(|s| s.credential_key).collect()
}

// ─────────────────────────────────────────────
// Credential sources
// ─────────────────────────────────────────────

/// Where credentials come from. Injected so the selector is a pure function
/// of its source — tests never touch the real process environment.
pub trait CredentialSource {
    /// The credential for a provider, if present and non-empty.
    fn credential(&self, spec: &ProviderSpec) -> Option<String>;
}

/// Reads credentials from process environment variables.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn credential(&self, spec: &ProviderSpec) -> Option<String> {
        std::env::var(spec.credential_key)
            .ok()
            .filter(|v| !v.is_empty())
    }
}

/// Layers the loaded config over the process environment: an `apiKey` in
/// `config.json` wins, the provider's env var is the fallback.
#[derive(Clone, Debug)]
pub struct ConfigCredentials {
    providers: ProvidersConfig,
}

impl ConfigCredentials {
    pub fn new(providers: ProvidersConfig) -> Self {
        Self { providers }
    }

    /// The configured endpoint override for a provider, if any.
    pub fn api_base(&self, spec: &ProviderSpec) -> Option<String> {
        self.providers
            .get_by_id(spec.id)
            .and_then(|c| c.api_base.clone())
    }
}

impl CredentialSource for ConfigCredentials {
    fn credential(&self, spec: &ProviderSpec) -> Option<String> {
        self.providers
            .get_by_id(spec.id)
            .filter(|c| c.is_configured())
            .map(|c| c.api_key.clone())
            .or_else(|| EnvCredentials.credential(spec))
    }
}

/// Fixed map from provider id to credential. The test double.
#[derive(Clone, Debug, Default)]
pub struct StaticCredentials {
    map: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            map: entries
                .iter()
                .map(|(id, key)| (id.to_string(), key.to_string()))
                .collect(),
        }
    }
}

impl CredentialSource for StaticCredentials {
    fn credential(&self, spec: &ProviderSpec) -> Option<String> {
        self.map.get(spec.id).filter(|v| !v.is_empty()).cloned()
    }
}

// ─────────────────────────────────────────────
// Selector
// ─────────────────────────────────────────────

/// Pick the provider a session will use.
///
/// Scans [`PROVIDERS`] in priority order and returns the first with a
/// present credential. If none has one, returns the top-priority spec
/// anyway — the missing credential is reported by the orchestrator before
/// any network call, not here.
pub fn select_provider(source: &dyn CredentialSource) -> &'static ProviderSpec {
    PROVIDERS
        .iter()
        .find(|spec| source.credential(spec).is_some())
        .unwrap_or(&PROVIDERS[0])
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tweetforge_core::config::schema::ProviderConfig;

    #[test]
    fn test_provider_count_and_order() {
        assert_eq!(PROVIDERS.len(), 5);
        assert_eq!(PROVIDERS[0].id, "zhipu");
        assert_eq!(PROVIDERS[4].id, "openrouter");
    }

    #[test]
    fn test_all_providers_have_unique_ids() {
        let mut ids: Vec<&str> = PROVIDERS.iter().map(|s| s.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), PROVIDERS.len(), "Duplicate provider ids found");
    }

    #[test]
    fn test_find_by_id() {
        let spec = find_by_id("gemini").unwrap();
        assert_eq!(spec.display_name, "Gemini");
        assert_eq!(spec.auth, AuthScheme::Header("x-goog-api-key"));
        assert_eq!(spec.body, BodyShape::GeminiContents);
        assert!(!spec.supports_streaming);
        assert!(find_by_id("nope").is_none());
    }

    #[test]
    fn test_exactly_one_signed_token_provider() {
        let signed: Vec<_> = PROVIDERS
            .iter()
            .filter(|s| s.auth == AuthScheme::SignedToken)
            .collect();
        assert_eq!(signed.len(), 1);
        assert_eq!(signed[0].id, "zhipu");
    }

    #[test]
    fn test_model_for_vision() {
        let zhipu = find_by_id("zhipu").unwrap();
        assert_eq!(zhipu.model_for(false), "glm-4-flash");
        assert_eq!(zhipu.model_for(true), "glm-4v-flash");

        // No dedicated vision model → falls back to the text model
        let deepseek = find_by_id("deepseek").unwrap();
        assert_eq!(deepseek.model_for(true), "deepseek-chat");
    }

    #[test]
    fn test_select_first_configured() {
        let creds = StaticCredentials::new(&[("deepseek", "sk-ds"), ("openrouter", "sk-or")]);
        let spec = select_provider(&creds);
        assert_eq!(spec.id, "deepseek");
    }

    #[test]
    fn test_select_honors_priority_order() {
        let creds = StaticCredentials::new(&[("openrouter", "sk-or"), ("zhipu", "id.secret")]);
        let spec = select_provider(&creds);
        assert_eq!(spec.id, "zhipu");
    }

    #[test]
    fn test_select_is_deterministic() {
        let creds = StaticCredentials::new(&[("groq", "gsk-1")]);
        for _ in 0..10 {
            assert_eq!(select_provider(&creds).id, "groq");
        }
    }

    #[test]
    fn test_select_without_any_credential_returns_top_priority() {
        let creds = StaticCredentials::default();
        let spec = select_provider(&creds);
        assert_eq!(spec.id, PROVIDERS[0].id);
    }

    #[test]
    fn test_select_ignores_empty_credential() {
        let creds = StaticCredentials::new(&[("zhipu", ""), ("groq", "gsk-2")]);
        assert_eq!(select_provider(&creds).id, "groq");
    }

    #[test]
    fn test_config_credentials_prefer_config_over_env() {
        let mut providers = ProvidersConfig::default();
        providers.groq = ProviderConfig {
            api_key: "from-config".to_string(),
            api_base: Some("http://localhost:9999".to_string()),
        };
        let creds = ConfigCredentials::new(providers);

        let groq = find_by_id("groq").unwrap();
        assert_eq!(creds.credential(groq).as_deref(), Some("from-config"));
        assert_eq!(
            creds.api_base(groq).as_deref(),
            Some("http://localhost:9999")
        );
    }

    #[test]
    fn test_credential_keys_for_guidance() {
        let keys = credential_keys();
        assert_eq!(keys[0], "ZHIPU_API_KEY");
        assert!(keys.contains(&"GEMINI_API_KEY"));
    }
}
