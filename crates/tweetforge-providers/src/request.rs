//! Request body construction and response parsing for both provider
//! body shapes.
//!
//! Most providers take the OpenAI chat-completions shape; Gemini takes
//! `contents/parts`. Both are built from the same [`ChatMessage`] list so
//! the pipeline never branches on provider.

use serde::{Deserialize, Serialize};

use tweetforge_core::types::{ChatMessage, ContentPart, MessageContent};

use crate::registry::BodyShape;

// ─────────────────────────────────────────────
// OpenAI-compatible shape
// ─────────────────────────────────────────────

/// Request body for an OpenAI-compatible chat completion API.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    pub stream: bool,
}

/// Raw chat completion response, for deserialization.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    pub content: Option<String>,
}

// ─────────────────────────────────────────────
// Gemini contents/parts shape
// ─────────────────────────────────────────────

/// Request body for the Gemini `generateContent` API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    pub generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct GeminiContent {
    pub role: String,
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
pub enum GeminiPart {
    #[serde(rename = "text")]
    Text(String),
    #[serde(rename = "fileData", rename_all = "camelCase")]
    FileData { file_uri: String },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    pub temperature: f64,
    pub max_output_tokens: u32,
}

// ─────────────────────────────────────────────
// Body building
// ─────────────────────────────────────────────

/// Build the JSON request body for a provider.
///
/// For the Gemini shape, the system message is folded into the first user
/// turn — the `generateContent` endpoint has no system role in this layout.
pub fn build_body(
    shape: BodyShape,
    model: &str,
    messages: &[ChatMessage],
    temperature: f64,
    max_tokens: u32,
    stream: bool,
) -> serde_json::Value {
    match shape {
        BodyShape::OpenAiChat => {
            let request = ChatCompletionRequest {
                model: model.to_string(),
                messages: messages.to_vec(),
                max_tokens: Some(max_tokens),
                temperature: Some(temperature),
                stream,
            };
            serde_json::to_value(request).unwrap_or_default()
        }
        BodyShape::GeminiContents => {
            let mut parts: Vec<GeminiPart> = Vec::new();
            for msg in messages {
                match msg {
                    ChatMessage::System { content } => {
                        parts.push(GeminiPart::Text(content.clone()));
                    }
                    ChatMessage::User { content } => match content {
                        MessageContent::Text(text) => parts.push(GeminiPart::Text(text.clone())),
                        MessageContent::Parts(user_parts) => {
                            for part in user_parts {
                                match part {
                                    ContentPart::Text { text } => {
                                        parts.push(GeminiPart::Text(text.clone()));
                                    }
                                    ContentPart::ImageUrl { image_url } => {
                                        parts.push(GeminiPart::FileData {
                                            file_uri: image_url.url.clone(),
                                        });
                                    }
                                }
                            }
                        }
                    },
                }
            }
            let request = GeminiRequest {
                contents: vec![GeminiContent {
                    role: "user".to_string(),
                    parts,
                }],
                generation_config: GeminiGenerationConfig {
                    temperature,
                    max_output_tokens: max_tokens,
                },
            };
            serde_json::to_value(request).unwrap_or_default()
        }
    }
}

// ─────────────────────────────────────────────
// Response parsing
// ─────────────────────────────────────────────

/// Extract the answer text from a 2xx completion response body.
///
/// Returns `None` when the body doesn't carry the expected shape — the
/// caller maps that to a parse failure.
pub fn parse_completion(shape: BodyShape, body: &serde_json::Value) -> Option<String> {
    match shape {
        BodyShape::OpenAiChat => {
            let response: ChatCompletionResponse = serde_json::from_value(body.clone()).ok()?;
            response.choices.into_iter().next()?.message.content
        }
        BodyShape::GeminiContents => {
            let parts = body
                .get("candidates")?
                .get(0)?
                .get("content")?
                .get("parts")?
                .as_array()?;
            let text: Vec<&str> = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect();
            if text.is_empty() {
                None
            } else {
                Some(text.join(""))
            }
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tweetforge_core::types::ImageUrl;

    #[test]
    fn test_openai_body_shape() {
        let messages = vec![
            ChatMessage::system("You write posts."),
            ChatMessage::user("Rust tips"),
        ];
        let body = build_body(BodyShape::OpenAiChat, "glm-4-flash", &messages, 0.8, 1024, true);

        assert_eq!(body["model"], "glm-4-flash");
        assert_eq!(body["stream"], true);
        assert_eq!(body["temperature"], 0.8);
        assert_eq!(body["max_tokens"], 1024);
        let msgs = body["messages"].as_array().unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0]["role"], "system");
        assert_eq!(msgs[1]["content"], "Rust tips");
    }

    #[test]
    fn test_gemini_body_folds_system_into_user_turn() {
        let messages = vec![
            ChatMessage::system("You write posts."),
            ChatMessage::user("Rust tips"),
        ];
        let body = build_body(BodyShape::GeminiContents, "gemini-2.0-flash", &messages, 0.5, 256, false);

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["role"], "user");
        let parts = contents[0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["text"], "You write posts.");
        assert_eq!(parts[1]["text"], "Rust tips");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
        assert_eq!(body["generationConfig"]["temperature"], 0.5);
        assert!(body.get("model").is_none());
    }

    #[test]
    fn test_gemini_body_maps_image_parts() {
        let messages = vec![ChatMessage::user_parts(vec![
            tweetforge_core::types::ContentPart::Text {
                text: "Describe this".to_string(),
            },
            tweetforge_core::types::ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: "https://example.com/p.jpg".to_string(),
                    detail: None,
                },
            },
        ])];
        let body = build_body(BodyShape::GeminiContents, "gemini-2.0-flash", &messages, 0.5, 256, false);

        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts[1]["fileData"]["fileUri"], "https://example.com/p.jpg");
    }

    #[test]
    fn test_parse_openai_completion() {
        let body = json!({
            "choices": [{ "message": { "content": "Tip! #React" } }]
        });
        assert_eq!(
            parse_completion(BodyShape::OpenAiChat, &body).as_deref(),
            Some("Tip! #React")
        );
    }

    #[test]
    fn test_parse_openai_missing_choices() {
        assert_eq!(parse_completion(BodyShape::OpenAiChat, &json!({})), None);
        assert_eq!(
            parse_completion(BodyShape::OpenAiChat, &json!({"choices": []})),
            None
        );
    }

    #[test]
    fn test_parse_gemini_completion_joins_parts() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello " }, { "text": "world" }] }
            }]
        });
        assert_eq!(
            parse_completion(BodyShape::GeminiContents, &body).as_deref(),
            Some("Hello world")
        );
    }

    #[test]
    fn test_parse_gemini_empty() {
        let body = json!({ "candidates": [{ "content": { "parts": [] } }] });
        assert_eq!(parse_completion(BodyShape::GeminiContents, &body), None);
    }
}
