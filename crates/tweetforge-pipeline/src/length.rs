//! Length normalization — trim a post to its character budget.
//!
//! Budgets are counted in Unicode code points, so emoji and accented
//! characters are single units.

/// Trim `text` to at most `max_chars` code points.
///
/// Already-fitting text is returned unchanged. Otherwise: hard-cut at the
/// budget, back up to the previous whitespace when that keeps at least 80%
/// of the budget, then strip dangling punctuation/whitespace left by the
/// cut.
pub fn truncate_post(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let chars: Vec<char> = text.chars().take(max_chars).collect();

    // Prefer a word boundary when it doesn't cost more than 20% of the budget
    let min_keep = (max_chars * 4) / 5;
    let mut cut = chars.len();
    for (i, c) in chars.iter().enumerate().rev() {
        if c.is_whitespace() {
            if i >= min_keep {
                cut = i;
            }
            break;
        }
    }

    let kept: String = chars[..cut].iter().collect();
    kept.trim_end_matches(is_dangling).to_string()
}

/// Characters that read as debris when a cut lands on them. Sentence-final
/// `!`/`?` and trailing hashtags stay.
fn is_dangling(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | '.' | ';' | ':' | '-' | '–' | '—' | '…' | '(')
}
