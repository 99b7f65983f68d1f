//! Design-token check: every color literal must come from the design system.

use std::sync::LazyLock;

use regex::Regex;

use crate::tokens::DesignSystem;

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#([0-9a-fA-F]{3,8})\b").expect("HEX_COLOR regex should compile")
});

static RGB_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"rgba?\([^)]+\)").expect("RGB_COLOR regex should compile")
});

/// rgb()/rgba() values are quoted at most this many characters in errors.
const RGB_PREVIEW_CHARS: usize = 50;

fn preview(value: &str) -> String {
    value.chars().take(RGB_PREVIEW_CHARS).collect()
}

pub fn check_design_tokens(code: &str, design: &DesignSystem, exempt: &[String]) -> Vec<String> {
    let mut errors = Vec::new();
    let allowed = design.allowed_colors();
    let is_known = |candidate: &str, set: &[String]| set.iter().any(|v| v == candidate);

    for caps in HEX_COLOR.captures_iter(code) {
        let full = caps[0].to_lowercase();
        let short = caps[1].to_lowercase();
        if is_known(&full, &allowed) || is_known(&short, &allowed) {
            continue;
        }
        if is_known(&full, exempt) || is_known(&short, exempt) {
            continue;
        }
        errors.push(format!(
            "Design Token: Hard-coded color '{full}' not in design system. Use a design token."
        ));
    }

    let serialized = design.serialized();
    for m in RGB_COLOR.find_iter(code) {
        let value = m.as_str();
        let in_effects = design.tokens.effects.values().any(|e| e.contains(value));
        if serialized.contains(value) || in_effects {
            continue;
        }
        errors.push(format!(
            "Design Token: Non-system color value '{}' detected. Use design tokens.",
            preview(value)
        ));
    }

    errors
}
