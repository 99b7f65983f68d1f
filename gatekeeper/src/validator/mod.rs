//! Deterministic Validator
//!
//! Statically checks generated component text before it is accepted:
//! - **syntax**: delimiter balance, template literals, leaked chat formatting
//! - **design_tokens**: hex and rgb()/rgba() literals must come from the design system
//! - **structure**: decorator, template, exported class and imports are present
//!
//! All three checks always run and their errors are concatenated in that
//! order, so a given artifact always produces the same error list.
//!
//! # Architecture
//!
//! ```text
//! Artifact → syntax → design_tokens → structure → ValidationReport
//!                                                      │
//!                              valid ⇔ errors.is_empty()
//! ```

pub mod design_tokens;
pub mod report;
pub mod structure;
pub mod syntax;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::tokens::DesignSystem;

pub use design_tokens::check_design_tokens;
pub use report::{CheckKind, CheckOutcome, CheckResult, ValidationReport};
pub use structure::check_structure;
pub use syntax::check_syntax;

/// Validator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Hex colors always accepted, with or without `#`, lower-case
    pub exempt_colors: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self::with_exempt_colors(["#fff", "#ffffff", "#000", "#000000"])
    }
}

impl ValidatorConfig {
    /// Build a config whose exempt set holds each color both with and
    /// without its `#`, lower-cased.
    pub fn with_exempt_colors<I, S>(colors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut exempt_colors = Vec::new();
        for color in colors {
            let lower = color.as_ref().trim().to_lowercase();
            let bare = lower.trim_start_matches('#').to_string();
            for form in [format!("#{bare}"), bare] {
                if !exempt_colors.contains(&form) {
                    exempt_colors.push(form);
                }
            }
        }
        Self { exempt_colors }
    }
}

/// Validator bound to one design system.
#[derive(Debug, Clone)]
pub struct Validator {
    design: Arc<DesignSystem>,
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(design: Arc<DesignSystem>, config: ValidatorConfig) -> Self {
        Self { design, config }
    }

    pub fn design(&self) -> &DesignSystem {
        &self.design
    }

    /// Run all checks on an artifact.
    pub fn validate(&self, code: &str) -> ValidationReport {
        let report = run_checks(code, &self.design, &self.config.exempt_colors);
        tracing::debug!(summary = %report.summary(), "Validated artifact");
        report
    }
}

fn run_checks(code: &str, design: &DesignSystem, exempt: &[String]) -> ValidationReport {
    ValidationReport::from_checks(vec![
        CheckResult::from_errors(CheckKind::Syntax, check_syntax(code)),
        CheckResult::from_errors(
            CheckKind::DesignTokens,
            check_design_tokens(code, design, exempt),
        ),
        CheckResult::from_errors(CheckKind::Structure, check_structure(code)),
    ])
}

/// Validate with the default exempt colors.
pub fn validate(code: &str, design: &DesignSystem) -> ValidationReport {
    run_checks(code, design, &ValidatorConfig::default().exempt_colors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_exempt_set_has_both_forms() {
        let config = ValidatorConfig::default();
        for color in ["#fff", "fff", "#ffffff", "ffffff", "#000", "000", "#000000", "000000"] {
            assert!(config.exempt_colors.iter().any(|c| c == color), "{color}");
        }
        assert_eq!(config.exempt_colors.len(), 8);
    }

    #[test]
    fn test_exempt_colors_normalized() {
        let config = ValidatorConfig::with_exempt_colors(["F0F0F0"]);
        assert_eq!(config.exempt_colors, vec!["#f0f0f0", "f0f0f0"]);
    }

    #[test]
    fn test_validator_and_free_fn_agree() {
        let design = Arc::new(
            DesignSystem::from_json(r##"{"tokens": {"colors": {"p": "#6366f1"}, "effects": {}}}"##)
                .unwrap(),
        );
        let validator = Validator::new(design.clone(), ValidatorConfig::default());
        let code = "Here is code: color: #abcdef; (";
        assert_eq!(validator.validate(code), validate(code, &design));
    }
}
