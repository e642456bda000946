//! Output normalization — provider text in, structured post out.
//!
//! Providers disagree on answer shape: clean JSON, JSON fenced in triple
//! backticks, JSON embedded in prose, or a long deliberation trace with the
//! real answer buried inside followed by self-correction. Provider output
//! is effectively adversarial input here, so every stage degrades to the
//! next and nothing ever panics or errors out.
//!
//! Stages, first success wins:
//!
//! 1. strip a code fence, strict JSON parse;
//! 2. field-level pattern extraction against the raw text;
//! 3. reasoning-trace salvage between boundary phrases;
//! 4. the no-result sentinel (`None`).
//!
//! `None` means "nothing usable" — distinct from a parsed post whose
//! `tweet` is the empty string, which means the model explicitly answered
//! empty.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use tweetforge_core::types::NormalizedPost;

/// Below this size, prose without trace markers is not considered a
/// deliberation dump — stage 3 stays out of its way.
const DELIBERATION_MIN_CHARS: usize = 160;

/// How much trailing text the last-resort truncation keeps.
const TRAIL_CHARS: usize = 200;

// ─────────────────────────────────────────────
// Patterns
// ─────────────────────────────────────────────

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:[a-zA-Z0-9_-]+)?\s*(.*?)\s*```").unwrap()
});

static TWEET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"tweet"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap()
});

static DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"description"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap()
});

static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"location"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap()
});

// Living lists: these phrases are model- and version-dependent. When a new
// provider's traces slip past them, extend here rather than in the logic.
static INTRO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:here(?:'|’)?s (?:the|your|a) (?:tweet|post)|here is (?:the|your|a) (?:tweet|post)|final (?:answer|tweet|post)|the (?:tweet|post) (?:is|would be|could be)|i(?:'|’)?ll go with|tweet:)",
    )
    .unwrap()
});

static CORRECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\bwait\b|\bactually\b|\bhmm+\b|on second thought|let me (?:reconsider|revise|rethink|try again)|scratch that|hold on|that(?:'|’)?s not quite)",
    )
    .unwrap()
});

static QUOTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"\n]{2,})"|“([^”\n]{2,})”"#).unwrap());

// ─────────────────────────────────────────────
// Entry point
// ─────────────────────────────────────────────

/// Extract a [`NormalizedPost`] from arbitrary provider text.
pub fn normalize(raw: &str) -> Option<NormalizedPost> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(post) = parse_strict(raw) {
        return Some(post);
    }
    if let Some(post) = extract_fields(raw) {
        return Some(post);
    }
    salvage_trace(raw).map(|tweet| NormalizedPost {
        description: String::new(),
        tweet,
        location: None,
    })
}

// ─────────────────────────────────────────────
// Stage 1: fence strip + strict parse
// ─────────────────────────────────────────────

fn parse_strict(raw: &str) -> Option<NormalizedPost> {
    let body = FENCE_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw);

    let value: serde_json::Value = serde_json::from_str(body.trim()).ok()?;
    let obj = value.as_object()?;

    let text_field = |key: &str| {
        obj.get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    let post = NormalizedPost {
        description: text_field("description"),
        tweet: text_field("tweet"),
        location: obj
            .get("location")
            .and_then(|v| v.as_str())
            .map(String::from),
    };

    if post.description.is_empty() && post.tweet.is_empty() {
        None
    } else {
        Some(post)
    }
}

// ─────────────────────────────────────────────
// Stage 2: field-level extraction
// ─────────────────────────────────────────────

fn extract_fields(raw: &str) -> Option<NormalizedPost> {
    let tweet = TWEET_RE.captures(raw).map(|c| unescape(&c[1]));
    let description = DESCRIPTION_RE.captures(raw).map(|c| unescape(&c[1]));
    let location = LOCATION_RE.captures(raw).map(|c| unescape(&c[1]));

    if tweet.is_none() && description.is_none() {
        return None;
    }

    Some(NormalizedPost {
        description: description.unwrap_or_default(),
        tweet: tweet.unwrap_or_default(),
        location,
    })
}

/// Undo JSON string escapes. Unknown escapes pass through verbatim.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

// ─────────────────────────────────────────────
// Stage 3: reasoning-trace salvage
// ─────────────────────────────────────────────

/// Dig the answer out of a deliberation dump.
///
/// Candidate = text strictly between the *last* introductory phrase and the
/// *first* self-correction phrase after it. A quoted, sentence-like
/// substring carrying a hashtag or emoji beats the raw candidate — that
/// best discriminates the literal answer from surrounding commentary.
fn salvage_trace(raw: &str) -> Option<String> {
    let dominated = raw.chars().count() > DELIBERATION_MIN_CHARS
        || INTRO_RE.is_match(raw)
        || CORRECTION_RE.is_match(raw);
    if !dominated {
        return None;
    }

    if let Some(intro) = INTRO_RE.find_iter(raw).last() {
        let rest = &raw[intro.end()..];
        let end = CORRECTION_RE
            .find(rest)
            .map(|m| m.start())
            .unwrap_or(rest.len());
        let candidate = rest[..end]
            .trim()
            .trim_start_matches([':', '-', '—', ' '])
            .trim();

        if let Some(quoted) = best_quoted(candidate) {
            return Some(quoted);
        }
        if !candidate.is_empty() {
            return Some(candidate.to_string());
        }
    } else if let Some(quoted) = best_quoted(raw) {
        return Some(quoted);
    }

    if let Some(sentence) = last_nontrivial_sentence(raw) {
        return Some(sentence);
    }

    warn!("output normalizer fell through to trailing truncation — provider answer format may have drifted");
    hard_trail(raw)
}

/// The longest quoted substring that reads like an answer.
fn best_quoted(text: &str) -> Option<String> {
    let mut best: Option<&str> = None;
    for cap in QUOTED_RE.captures_iter(text) {
        let Some(m) = cap.get(1).or_else(|| cap.get(2)) else {
            continue;
        };
        let inner = m.as_str().trim();
        if sentence_like(inner) && has_post_signal(inner) {
            if best.map_or(true, |b| inner.chars().count() > b.chars().count()) {
                best = Some(inner);
            }
        }
    }
    best.map(String::from)
}

fn sentence_like(s: &str) -> bool {
    s.chars().count() >= 8 && s.contains(' ')
}

/// Hashtags and emoji discriminate the literal post from commentary.
fn has_post_signal(s: &str) -> bool {
    s.contains('#') || s.chars().any(is_emoji)
}

fn is_emoji(c: char) -> bool {
    matches!(c as u32, 0x1F000..=0x1FAFF | 0x2600..=0x27BF | 0x2B00..=0x2BFF | 0xFE0F)
}

fn last_nontrivial_sentence(raw: &str) -> Option<String> {
    raw.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| s.chars().count() >= 20)
        .last()
        .map(String::from)
}

fn hard_trail(raw: &str) -> Option<String> {
    let chars: Vec<char> = raw.chars().collect();
    let start = chars.len().saturating_sub(TRAIL_CHARS);
    let tail: String = chars[start..].iter().collect();
    let tail = tail.trim().to_string();
    if tail.is_empty() {
        None
    } else {
        Some(tail)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
