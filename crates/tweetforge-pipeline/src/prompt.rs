//! Prompt construction — one `GenerationRequest` in, chat messages out.
//!
//! The system message pins the output contract (JSON with `description`,
//! `tweet`, `location`) so the normalizer usually gets its easy case;
//! everything after that is defense in depth.

use tweetforge_core::types::{
    ChatMessage, ContentPart, GenerationRequest, ImageUrl, LengthTier,
};

/// Build the messages for a text generation call.
///
/// Deterministic for a fixed request. `variation` makes batch items diverge
/// instead of producing near-duplicates.
pub fn build_messages(
    req: &GenerationRequest,
    tier: LengthTier,
    variation: Option<usize>,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt(req, tier)),
        ChatMessage::user(user_prompt(req, variation)),
    ]
}

/// Build the messages for an image-description call. The image travels as a
/// multipart user message; the textual instructions are shared with the
/// text path.
pub fn build_vision_messages(
    req: &GenerationRequest,
    tier: LengthTier,
    image_url: &str,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt(req, tier)),
        ChatMessage::user_parts(vec![
            ContentPart::Text {
                text: format!(
                    "Look at this image and write a post about it.\n{}",
                    user_prompt(req, None)
                ),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image_url.to_string(),
                    detail: None,
                },
            },
        ]),
    ]
}

fn system_prompt(req: &GenerationRequest, tier: LengthTier) -> String {
    let mut lines = vec![
        "You are an expert social media copywriter.".to_string(),
        format!(
            "Write one post of at most {} characters.",
            tier.max_chars()
        ),
    ];

    lines.push(if req.include_hashtags {
        "Include one or two relevant hashtags.".to_string()
    } else {
        "Do not use hashtags.".to_string()
    });
    lines.push(if req.include_emojis {
        "Use emojis where they add energy.".to_string()
    } else {
        "Do not use emojis.".to_string()
    });

    lines.push(
        "Answer strictly as JSON with the keys \"description\", \"tweet\" and \
         optionally \"location\". No markdown fences, no commentary."
            .to_string(),
    );

    lines.join(" ")
}

fn user_prompt(req: &GenerationRequest, variation: Option<usize>) -> String {
    let mut parts = vec![format!("Topic: {}", req.topic)];

    if !req.style.is_empty() {
        parts.push(format!("Style: {}", req.style));
    }
    if let Some(mood) = &req.mood {
        parts.push(format!("Mood: {mood}"));
    }
    if let Some(audience) = &req.audience {
        parts.push(format!("Audience: {audience}"));
    }
    if let Some(hook) = &req.hook {
        parts.push(format!("Open with this hook: {hook}"));
    }
    if let Some(template) = &req.template {
        parts.push(format!("Follow this template: {template}"));
    }
    if req.personal {
        parts.push("Write in a first-person, personal voice.".to_string());
    }
    if let Some(tone) = req.advanced.as_ref().and_then(|a| a.tone.as_ref()) {
        parts.push(format!("Tone: {tone}"));
    }
    if let Some(n) = variation {
        parts.push(format!(
            "This is variation {} — take a noticeably different angle from the obvious one.",
            n + 1
        ));
    }

    parts.join("\n")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tweetforge_core::types::AdvancedSettings;

    #[test]
    fn test_messages_shape() {
        let req = GenerationRequest::new("React tips", "viral");
        let messages = build_messages(&req, LengthTier::Long, None);

        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], ChatMessage::System { .. }));
        assert!(matches!(messages[1], ChatMessage::User { .. }));
    }

    #[test]
    fn test_system_prompt_carries_budget_and_contract() {
        let req = GenerationRequest::new("x", "casual");
        let messages = build_messages(&req, LengthTier::Short, None);
        let system = messages[0].text();

        assert!(system.contains("150"));
        assert!(system.contains("\"tweet\""));
        assert!(system.contains("\"description\""));
    }

    #[test]
    fn test_hashtag_and_emoji_switches() {
        let mut req = GenerationRequest::new("x", "casual");
        req.include_hashtags = false;
        req.include_emojis = false;
        let system = build_messages(&req, LengthTier::Long, None)[0].text();

        assert!(system.contains("Do not use hashtags"));
        assert!(system.contains("Do not use emojis"));
    }

    #[test]
    fn test_user_prompt_includes_optional_fields() {
        let mut req = GenerationRequest::new("launch day", "excited");
        req.mood = Some("celebratory".to_string());
        req.audience = Some("indie hackers".to_string());
        req.hook = Some("After 6 months...".to_string());
        req.personal = true;
        req.advanced = Some(AdvancedSettings {
            tone: Some("warm".to_string()),
            ..Default::default()
        });

        let user = build_messages(&req, LengthTier::Long, None)[1].text();
        assert!(user.contains("Topic: launch day"));
        assert!(user.contains("Mood: celebratory"));
        assert!(user.contains("Audience: indie hackers"));
        assert!(user.contains("After 6 months..."));
        assert!(user.contains("first-person"));
        assert!(user.contains("Tone: warm"));
    }

    #[test]
    fn test_variation_hint_only_for_batch_items() {
        let req = GenerationRequest::new("x", "viral");
        let plain = build_messages(&req, LengthTier::Long, None)[1].text();
        let varied = build_messages(&req, LengthTier::Long, Some(2))[1].text();

        assert!(!plain.contains("variation"));
        assert!(varied.contains("variation 3"));
    }

    #[test]
    fn test_deterministic_for_fixed_request() {
        let req = GenerationRequest::new("stable", "calm");
        let a = build_messages(&req, LengthTier::Medium, Some(1));
        let b = build_messages(&req, LengthTier::Medium, Some(1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_vision_messages_carry_image_part() {
        let req = GenerationRequest::new("sunset", "dreamy");
        let messages = build_vision_messages(&req, LengthTier::Long, "https://example.com/p.jpg");

        let json = serde_json::to_value(&messages[1]).unwrap();
        let parts = json["content"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1]["image_url"]["url"], "https://example.com/p.jpg");
        assert!(parts[0]["text"].as_str().unwrap().contains("sunset"));
    }
}
