//! The orchestrator — one place where requests become outcomes.
//!
//! Wires selector, limiter, transport, decoder, and the normalizers
//! together, and converts every failure kind into the uniform
//! `{tweet: "", error}` shape. Nothing past this point ever sees the typed
//! taxonomy, and nothing here ever panics out to a caller: every call
//! resolves with content or a display-ready error string. A cancelled
//! stream resolves quietly with whatever partial content had already been
//! surfaced.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use tweetforge_core::config::schema::{Config, GenerationDefaults};
use tweetforge_core::error::GenerationError;
use tweetforge_core::types::{BatchOutcome, GenerationOutcome, GenerationRequest, LengthTier};
use tweetforge_core::utils::derive_session_key;
use tweetforge_providers::client::{CompletionBackend, CompletionOpts, DeltaStream, ProviderClient};
use tweetforge_providers::registry::{credential_keys, select_provider, ConfigCredentials, CredentialSource};
use tweetforge_providers::transport::RetryPolicy;

use crate::limiter::{RequestCategory, SessionLimits};
use crate::normalize::normalize;
use crate::length::truncate_post;
use crate::prompt::{build_messages, build_vision_messages};

/// Incremental delta observer. A thin adapter over the decoder's native
/// stream contract, for callers that want to paint tokens as they arrive.
pub type DeltaObserver<'a> = &'a mut dyn FnMut(&str);

// ─────────────────────────────────────────────
// Generator
// ─────────────────────────────────────────────

/// The generation pipeline bound to one backend and one session's limits.
pub struct Generator<B: CompletionBackend> {
    backend: B,
    limits: SessionLimits,
    defaults: GenerationDefaults,
}

impl Generator<ProviderClient> {
    /// Build the production pipeline from loaded config and credentials.
    ///
    /// Detects the provider up front and fails with setup guidance before
    /// any network call when no credential is present.
    pub fn from_config(
        config: &Config,
        credentials: &ConfigCredentials,
    ) -> Result<Self, GenerationError> {
        let spec = select_provider(credentials);
        let credential = credentials
            .credential(spec)
            .ok_or_else(|| GenerationError::missing_credentials(&credential_keys()))?;

        info!(provider = spec.display_name, "provider selected");

        let mut client = ProviderClient::new(spec, credential.clone()).with_retry(RetryPolicy {
            max_retries: config.generation.max_retries,
            initial_delay: Duration::from_millis(config.generation.initial_delay_ms),
        });
        if let Some(base) = credentials.api_base(spec) {
            client = client.with_endpoint(base);
        }

        let session_key = derive_session_key(spec.id, &credential);
        Ok(Generator::new(client, session_key, config))
    }
}

impl<B: CompletionBackend> Generator<B> {
    pub fn new(backend: B, session_key: impl Into<String>, config: &Config) -> Self {
        Generator {
            backend,
            limits: SessionLimits::new(session_key, &config.limits),
            defaults: config.generation.clone(),
        }
    }

    /// Generate one post.
    pub async fn generate(&self, req: &GenerationRequest) -> GenerationOutcome {
        self.generate_observed(req, None, None).await
    }

    /// Generate one post, optionally painting deltas as they arrive and
    /// honoring an abort handle.
    ///
    /// Cancellation is cooperative and idempotent: notify the handle once
    /// (or many times) and the call resolves quietly with the partial text.
    pub async fn generate_observed(
        &self,
        req: &GenerationRequest,
        on_delta: Option<DeltaObserver<'_>>,
        abort: Option<Arc<Notify>>,
    ) -> GenerationOutcome {
        if let Err(e) = self.admit(RequestCategory::Single) {
            return GenerationOutcome::failure(e.to_string());
        }
        match self.produce(req, None, on_delta, abort).await {
            Ok(tweet) => GenerationOutcome::ok(tweet),
            Err(e) => GenerationOutcome::failure(e.to_string()),
        }
    }

    /// Generate `count` variations. The batch category is admitted once per
    /// call; partial successes are kept.
    pub async fn generate_batch(&self, req: &GenerationRequest, count: usize) -> BatchOutcome {
        if let Err(e) = self.admit(RequestCategory::Batch) {
            return BatchOutcome::failure(e.to_string());
        }

        let mut tweets = Vec::with_capacity(count);
        let mut last_error: Option<GenerationError> = None;
        for i in 0..count {
            match self.produce(req, Some(i), None, None).await {
                Ok(tweet) => tweets.push(tweet),
                Err(e) => {
                    warn!(variation = i, error = %e, "batch item failed");
                    last_error = Some(e);
                }
            }
        }

        match (tweets.is_empty(), last_error) {
            (true, Some(e)) => BatchOutcome::failure(e.to_string()),
            (true, None) => BatchOutcome::failure(GenerationError::Parse.to_string()),
            (false, _) => BatchOutcome::ok(tweets),
        }
    }

    /// Describe an image as a post. Vision-capable models tend to answer
    /// with deliberation traces, which is exactly what the normalizer's
    /// salvage stage is for.
    pub async fn describe_image(
        &self,
        image_url: &str,
        req: &GenerationRequest,
    ) -> GenerationOutcome {
        if let Err(e) = self.admit(RequestCategory::Vision) {
            return GenerationOutcome::failure(e.to_string());
        }

        let tier = self.tier_for(req);
        let messages = build_vision_messages(req, tier, image_url);
        let opts = self.opts_for(req, true);

        let result = async {
            let raw = self.backend.complete(&messages, &opts).await?;
            self.finish_text(&raw, tier, false)
        }
        .await;

        match result {
            Ok(tweet) => GenerationOutcome::ok(tweet),
            Err(e) => GenerationOutcome::failure(e.to_string()),
        }
    }

    /// This session's limiter state, for collaborators that surface quota.
    pub fn limits(&self) -> &SessionLimits {
        &self.limits
    }

    // ── internals ──

    fn admit(&self, category: RequestCategory) -> Result<(), GenerationError> {
        let result = self.limits.check(category);
        if result.allowed {
            Ok(())
        } else {
            Err(GenerationError::RateLimited {
                retry_after_secs: result
                    .retry_after
                    .map(|d| d.as_secs().max(1))
                    .unwrap_or(1),
            })
        }
    }

    async fn produce(
        &self,
        req: &GenerationRequest,
        variation: Option<usize>,
        on_delta: Option<DeltaObserver<'_>>,
        abort: Option<Arc<Notify>>,
    ) -> Result<String, GenerationError> {
        let tier = self.tier_for(req);
        let messages = build_messages(req, tier, variation);
        let opts = self.opts_for(req, false);

        // Streaming only buys something when the caller watches deltas or
        // may cancel; otherwise one round-trip is strictly simpler.
        if on_delta.is_none() && abort.is_none() {
            let raw = self.backend.complete(&messages, &opts).await?;
            return self.finish_text(&raw, tier, false);
        }

        let stream = self.backend.stream(&messages, &opts).await?;
        let (raw, cancelled) = collect_deltas(stream, on_delta, abort).await?;
        self.finish_text(&raw, tier, cancelled)
    }

    fn tier_for(&self, req: &GenerationRequest) -> LengthTier {
        req.advanced
            .as_ref()
            .and_then(|a| a.length)
            .unwrap_or(self.defaults.length)
    }

    fn opts_for(&self, req: &GenerationRequest, vision: bool) -> CompletionOpts {
        CompletionOpts {
            temperature: req
                .advanced
                .as_ref()
                .and_then(|a| a.temperature)
                .unwrap_or(self.defaults.temperature),
            max_tokens: self.defaults.max_tokens,
            vision,
        }
    }

    /// The normalize → trim tail of the pipeline.
    ///
    /// A cancelled call resolves quietly: best-effort text, never an error.
    fn finish_text(
        &self,
        raw: &str,
        tier: LengthTier,
        cancelled: bool,
    ) -> Result<String, GenerationError> {
        let max = tier.max_chars();

        let text = match normalize(raw) {
            Some(post) => {
                let best = post.best_text().trim().to_string();
                if best.is_empty() {
                    debug!("model explicitly answered empty");
                    usable_plain_text(raw).unwrap_or_default()
                } else {
                    best
                }
            }
            None => usable_plain_text(raw).unwrap_or_default(),
        };

        if text.is_empty() {
            if cancelled {
                return Ok(String::new());
            }
            return Err(GenerationError::Parse);
        }

        Ok(truncate_post(&text, max))
    }
}

/// Accumulate a delta stream into its final text.
///
/// Returns `(text, cancelled)`. The accumulated text only ever grows while
/// the stream is live; dropping the stream on return releases the
/// connection. A stream that errors after producing text keeps the partial
/// rather than discarding work.
async fn collect_deltas(
    mut stream: DeltaStream,
    mut on_delta: Option<DeltaObserver<'_>>,
    abort: Option<Arc<Notify>>,
) -> Result<(String, bool), GenerationError> {
    let mut accumulated = String::new();

    loop {
        let next = match &abort {
            Some(notify) => {
                tokio::select! {
                    _ = notify.notified() => {
                        debug!(chars = accumulated.chars().count(), "stream cancelled by caller");
                        return Ok((accumulated, true));
                    }
                    item = stream.next() => item,
                }
            }
            None => stream.next().await,
        };

        match next {
            Some(Ok(delta)) => {
                if let Some(cb) = on_delta.as_deref_mut() {
                    cb(&delta);
                }
                accumulated.push_str(&delta);
            }
            Some(Err(e)) => {
                if accumulated.is_empty() {
                    return Err(e);
                }
                warn!(error = %e, "stream broke mid-way, keeping partial text");
                return Ok((accumulated, false));
            }
            None => return Ok((accumulated, false)),
        }
    }
}

/// Whether raw text is worth surfacing when no structured answer parsed.
/// Failed JSON shells and symbol soup are not.
fn usable_plain_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('{') || trimmed.starts_with('[') {
        return None;
    }
    if trimmed.chars().filter(|c| c.is_alphabetic()).count() < 3 {
        return None;
    }
    Some(trimmed.to_string())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
