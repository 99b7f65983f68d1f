//! Syntax check: delimiter balance and leaked chat formatting.
//!
//! Counts are textual; string and comment contents are not excluded. Every
//! violation adds one error and the remaining checks still run.

/// Opening phrases that mean the model answered in prose instead of code.
const FILLER_PREFIXES: &[&str] = &["here is", "here's", "sure", "of course", "i'll", "this is"];

fn count(code: &str, ch: char) -> usize {
    code.chars().filter(|c| *c == ch).count()
}

pub fn check_syntax(code: &str) -> Vec<String> {
    let mut errors = Vec::new();

    let (opens, closes) = (count(code, '{'), count(code, '}'));
    if opens != closes {
        errors.push(format!(
            "Syntax: Unbalanced braces ({opens} '{{' vs {closes} '}}')"
        ));
    }

    let (opens, closes) = (count(code, '('), count(code, ')'));
    if opens != closes {
        errors.push(format!(
            "Syntax: Unbalanced parentheses ({opens} '(' vs {closes} ')')"
        ));
    }

    let (opens, closes) = (count(code, '['), count(code, ']'));
    if opens != closes {
        errors.push(format!(
            "Syntax: Unbalanced square brackets ({opens} '[' vs {closes} ']')"
        ));
    }

    if count(code, '`') % 2 != 0 {
        errors.push("Syntax: Odd number of backticks, unclosed template literal".to_string());
    }

    if code.contains("```") {
        errors.push(
            "Output: Code contains markdown fences (```), must be raw code only".to_string(),
        );
    }

    let first_line = code
        .trim()
        .lines()
        .next()
        .unwrap_or_default()
        .to_lowercase();
    if FILLER_PREFIXES.iter().any(|p| first_line.starts_with(p)) {
        errors.push("Output: Response starts with conversational text, not code".to_string());
    }

    errors
}
