//! Core types for Tweetforge — requests, chat messages, and outcomes.
//!
//! The chat message types model the OpenAI chat completions format used by
//! most providers; the Gemini `contents/parts` shape is derived from them at
//! request-build time.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Length tiers
// ─────────────────────────────────────────────

/// Target length for a generated post, mapped to a character budget.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthTier {
    Short,
    Medium,
    #[default]
    Long,
}

impl LengthTier {
    /// Character budget for this tier, counted in Unicode code points.
    pub fn max_chars(self) -> usize {
        match self {
            LengthTier::Short => 150,
            LengthTier::Medium => 230,
            LengthTier::Long => 280,
        }
    }
}

impl std::str::FromStr for LengthTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "short" => Ok(LengthTier::Short),
            "medium" => Ok(LengthTier::Medium),
            "long" => Ok(LengthTier::Long),
            other => Err(format!("unknown length tier '{other}' (short|medium|long)")),
        }
    }
}

// ─────────────────────────────────────────────
// Generation request
// ─────────────────────────────────────────────

/// One request to generate a post. Immutable for the duration of a call.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationRequest {
    /// What the post is about. The only required field.
    pub topic: String,
    /// Writing style, e.g. `"viral"`, `"professional"`, `"casual"`.
    pub style: String,
    pub include_hashtags: bool,
    pub include_emojis: bool,
    /// Optional preset template text the post should follow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    /// Opening hook the post should lead with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook: Option<String>,
    /// Write in a first-person, personal voice.
    pub personal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advanced: Option<AdvancedSettings>,
}

impl GenerationRequest {
    /// Create a request with the required fields; hashtags and emojis on.
    pub fn new(topic: impl Into<String>, style: impl Into<String>) -> Self {
        GenerationRequest {
            topic: topic.into(),
            style: style.into(),
            include_hashtags: true,
            include_emojis: true,
            ..Default::default()
        }
    }

    /// The length tier for this request, falling back to the default tier.
    pub fn length_tier(&self) -> LengthTier {
        self.advanced
            .as_ref()
            .and_then(|a| a.length)
            .unwrap_or_default()
    }
}

/// Advanced per-request overrides.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AdvancedSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<LengthTier>,
}

// ─────────────────────────────────────────────
// Chat messages (OpenAI chat completions format)
// ─────────────────────────────────────────────

/// A chat message in the OpenAI format.
///
/// Each variant maps to a `role` field value. Only the roles the pipeline
/// actually sends are modeled.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role")]
pub enum ChatMessage {
    #[serde(rename = "system")]
    System { content: String },

    #[serde(rename = "user")]
    User { content: MessageContent },
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage::System {
            content: content.into(),
        }
    }

    /// Create a user message with text content.
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage::User {
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a user message with multipart content (text + images).
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        ChatMessage::User {
            content: MessageContent::Parts(parts),
        }
    }

    /// The plain text of this message; multipart text parts are joined.
    pub fn text(&self) -> String {
        match self {
            ChatMessage::System { content } => content.clone(),
            ChatMessage::User { content } => match content {
                MessageContent::Text(t) => t.clone(),
                MessageContent::Parts(parts) => parts
                    .iter()
                    .filter_map(|p| match p {
                        ContentPart::Text { text } => Some(text.as_str()),
                        ContentPart::ImageUrl { .. } => None,
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            },
        }
    }
}

/// User message content — plain text or multipart (for vision requests).
///
/// When serialized: text becomes a plain string, parts become an array.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A single part of a multipart message.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

/// Image URL payload (a URL or base64 data URI).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ImageUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

// ─────────────────────────────────────────────
// Normalized output
// ─────────────────────────────────────────────

/// The structured answer extracted from a provider's raw text.
///
/// "Nothing usable" is `Option::<NormalizedPost>::None` at the normalizer
/// boundary — distinct from a post whose fields happen to be empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizedPost {
    pub description: String,
    pub tweet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl NormalizedPost {
    /// The post text to surface: the tweet field, or the description when
    /// the model only filled that in.
    pub fn best_text(&self) -> &str {
        if !self.tweet.trim().is_empty() {
            &self.tweet
        } else {
            &self.description
        }
    }
}

// ─────────────────────────────────────────────
// Outcomes returned to collaborators
// ─────────────────────────────────────────────

/// Result of one generation call.
///
/// `error` is always a ready-to-display string; collaborators never see the
/// typed taxonomy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub tweet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationOutcome {
    /// Successful outcome.
    pub fn ok(tweet: impl Into<String>) -> Self {
        GenerationOutcome {
            tweet: tweet.into(),
            error: None,
        }
    }

    /// Failed outcome — empty tweet plus a display-ready error string.
    pub fn failure(error: impl Into<String>) -> Self {
        GenerationOutcome {
            tweet: String::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of one batch generation call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub tweets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchOutcome {
    pub fn ok(tweets: Vec<String>) -> Self {
        BatchOutcome {
            tweets,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        BatchOutcome {
            tweets: Vec::new(),
            error: Some(error.into()),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
