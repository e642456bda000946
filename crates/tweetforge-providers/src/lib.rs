//! LLM provider layer for Tweetforge.
//!
//! Direct HTTP clients for every supported provider — no SDK dependency.
//!
//! # Architecture
//!
//! - [`registry`] — static specs for the supported providers + the selector
//! - [`auth`] — bearer / custom-header / signed-token authentication
//! - [`request`] — OpenAI-compatible and Gemini `contents/parts` bodies
//! - [`transport`] — one HTTP call with bounded retries and backoff
//! - [`sse`] — incremental SSE decoding into text deltas
//! - [`client`] — [`client::ProviderClient`], the [`client::CompletionBackend`]
//!   implementation tying the above together

pub mod auth;
pub mod client;
pub mod registry;
pub mod request;
pub mod sse;
pub mod transport;

// Re-export main types for convenience
pub use client::{CompletionBackend, CompletionOpts, DeltaStream, ProviderClient};
pub use registry::{
    select_provider, ConfigCredentials, CredentialSource, EnvCredentials, ProviderSpec,
    StaticCredentials, PROVIDERS,
};
pub use transport::{execute, RetryPolicy, RetryReason};
