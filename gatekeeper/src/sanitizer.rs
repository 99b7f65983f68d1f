//! Prompt Injection Filter
//!
//! Strips known injection markers from free-text user input before it is
//! embedded in a model prompt, then length-caps the result.
//!
//! # Threat Model
//!
//! - **Delimiter smuggling:** `<<< ... >>>`, `[INST] ... [/INST]` and
//!   `<s> ... </s>` pairs try to open a fake instruction block.
//! - **Override phrases:** "ignore previous instructions", "you are now",
//!   "new instructions:", "SYSTEM:" and `### System` headings try to replace
//!   the system instruction. Everything from the phrase to the end of input is
//!   dropped.
//!
//! This is a best-effort filter. The prompt builder also fences the text as
//! data, and the pattern list is not assumed to be complete.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum sanitized length, in characters.
pub const MAX_INPUT_CHARS: usize = 1000;

/// Injection markers, applied in order. All are case-insensitive and let `.`
/// cross line breaks.
static INJECTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)<<<.*?>>>",
        r"(?is)\[INST\].*?\[/INST\]",
        r"(?is)<s>.*?</s>",
        r"(?is)###\s*(System|Instruction|Override).*",
        r"(?is)Ignore (previous|above|all) instructions?.*",
        r"(?is)You are now.*",
        r"(?is)New instructions?:.*",
        r"(?is)SYSTEM:.*",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("INJECTION_PATTERNS regex should compile"))
    .collect()
});

/// Remove every injection marker once, in pattern order.
fn strip_markers_once(text: &str) -> String {
    let mut out = text.to_string();
    for pattern in INJECTION_PATTERNS.iter() {
        out = pattern.replace_all(&out, "").into_owned();
    }
    out
}

/// Whether the text still contains any injection marker.
pub fn contains_injection(text: &str) -> bool {
    INJECTION_PATTERNS.iter().any(|p| p.is_match(text))
}

/// Truncate to at most `max` characters without splitting a code point.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Sanitize free-text user input for embedding in a prompt.
///
/// Pure and idempotent: `sanitize(&sanitize(x)) == sanitize(x)`.
pub fn sanitize(text: &str) -> String {
    // Removing one marker can join two fragments into another.
    let mut out = strip_markers_once(text);
    loop {
        let next = strip_markers_once(&out);
        if next == out {
            break;
        }
        out = next;
    }

    let trimmed = out.trim();
    truncate_chars(trimmed, MAX_INPUT_CHARS).trim_end().to_string()
}
