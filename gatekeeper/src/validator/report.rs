//! Validation Report: structured output of the validator.
//!
//! Holds the flat, ordered error list the correction loop feeds back to the
//! model, plus a per-check breakdown for display and history.

use serde::{Deserialize, Serialize};

/// The three independent checks, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Syntax,
    DesignTokens,
    Structure,
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::DesignTokens => write!(f, "design_tokens"),
            Self::Structure => write!(f, "structure"),
        }
    }
}

/// Outcome of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    Passed,
    Failed,
}

impl std::fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => write!(f, "PASS"),
            Self::Failed => write!(f, "FAIL"),
        }
    }
}

/// Result of a single check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check: CheckKind,
    pub outcome: CheckOutcome,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl CheckResult {
    pub fn from_errors(check: CheckKind, errors: Vec<String>) -> Self {
        let outcome = if errors.is_empty() {
            CheckOutcome::Passed
        } else {
            CheckOutcome::Failed
        };
        Self {
            check,
            outcome,
            errors,
        }
    }
}

/// Complete validation report for one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True iff `errors` is empty
    pub valid: bool,
    /// All errors, syntax first, then design tokens, then structure
    pub errors: Vec<String>,
    /// Per-check breakdown
    pub checks: Vec<CheckResult>,
}

impl ValidationReport {
    /// Assemble a report from check results in run order.
    pub fn from_checks(checks: Vec<CheckResult>) -> Self {
        let errors: Vec<String> = checks
            .iter()
            .flat_map(|c| c.errors.iter().cloned())
            .collect();
        Self {
            valid: errors.is_empty(),
            errors,
            checks,
        }
    }

    /// Number of checks that passed.
    pub fn checks_passed(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.outcome == CheckOutcome::Passed)
            .count()
    }

    /// First failing check (for quick triage)
    pub fn first_failure(&self) -> Option<CheckKind> {
        self.checks
            .iter()
            .find(|c| c.outcome == CheckOutcome::Failed)
            .map(|c| c.check)
    }

    /// One-line summary for logging.
    pub fn summary(&self) -> String {
        let gates: Vec<String> = self
            .checks
            .iter()
            .map(|c| format!("{}={}", c.check, c.outcome))
            .collect();
        format!(
            "{}/{} checks passed, {} error(s) [{}]",
            self.checks_passed(),
            self.checks.len(),
            self.errors.len(),
            gates.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_orders_errors_by_check() {
        let report = ValidationReport::from_checks(vec![
            CheckResult::from_errors(CheckKind::Syntax, vec!["a".into()]),
            CheckResult::from_errors(CheckKind::DesignTokens, vec![]),
            CheckResult::from_errors(CheckKind::Structure, vec!["b".into(), "c".into()]),
        ]);
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["a", "b", "c"]);
        assert_eq!(report.checks_passed(), 1);
        assert_eq!(report.first_failure(), Some(CheckKind::Syntax));
    }

    #[test]
    fn test_summary_lists_each_check() {
        let report = ValidationReport::from_checks(vec![
            CheckResult::from_errors(CheckKind::Syntax, vec![]),
            CheckResult::from_errors(CheckKind::Structure, vec!["missing".into()]),
        ]);
        let summary = report.summary();
        assert!(summary.contains("1/2 checks passed"));
        assert!(summary.contains("syntax=PASS"));
        assert!(summary.contains("structure=FAIL"));
    }
}
