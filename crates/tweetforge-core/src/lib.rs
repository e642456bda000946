//! Core types, errors, and configuration for Tweetforge.
//!
//! Everything the provider and pipeline crates share lives here:
//!
//! - [`types`] — generation requests, chat messages, length tiers, outcomes
//! - [`error`] — the [`error::GenerationError`] taxonomy
//! - [`config`] — schema, loading, and env var overrides
//! - [`utils`] — session keys, share-intent URLs, small string helpers

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use error::GenerationError;
pub use types::{
    AdvancedSettings, BatchOutcome, ChatMessage, GenerationOutcome, GenerationRequest,
    LengthTier, NormalizedPost,
};
