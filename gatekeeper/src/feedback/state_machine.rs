//! Run State Machine: explicit states and legal transition guards for one
//! generate-validate-repair run.
//!
//! Every run starts at `Attempting(1)` and terminates at `Succeeded`,
//! `ExhaustedWithErrors` or `Aborted`. Each transition is checked against the
//! state graph and recorded, so a run's path can be replayed from its result.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// States of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Attempt `k` (1-indexed) is being prompted, generated and validated.
    Attempting(u32),
    /// An attempt validated cleanly. Terminal.
    Succeeded,
    /// The attempt budget ran out with errors remaining. Terminal.
    ExhaustedWithErrors,
    /// The completion provider failed. Terminal.
    Aborted,
}

impl RunState {
    /// Whether this is a terminal state (no further transitions allowed).
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Attempting(_))
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attempting(k) => write!(f, "Attempting({k})"),
            Self::Succeeded => write!(f, "Succeeded"),
            Self::ExhaustedWithErrors => write!(f, "ExhaustedWithErrors"),
            Self::Aborted => write!(f, "Aborted"),
        }
    }
}

/// Legal transitions for a budget of `max` attempts:
/// ```text
/// Attempting(k) → Attempting(k+1)        when k < max
/// Attempting(k) → Succeeded
/// Attempting(k) → ExhaustedWithErrors    when k == max
/// Attempting(k) → Aborted
/// ```
fn is_legal_transition(from: RunState, to: RunState, max: u32) -> bool {
    use RunState::*;

    match (from, to) {
        (Attempting(k), Attempting(next)) => next == k + 1 && next <= max,
        (Attempting(_), Succeeded) | (Attempting(_), Aborted) => true,
        (Attempting(k), ExhaustedWithErrors) => k == max,
        _ => false,
    }
}

/// A single recorded state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: RunState,
    pub to: RunState,
    /// Milliseconds since the run started.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: RunState,
    pub to: RunState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Illegal run transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// State machine for one run with a fixed attempt budget.
#[derive(Debug)]
pub struct RunStateMachine {
    current: RunState,
    max_attempts: u32,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl RunStateMachine {
    /// Start a run at `Attempting(1)`. A budget of zero is raised to one.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            current: RunState::Attempting(1),
            max_attempts: max_attempts.max(1),
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> RunState {
        self.current
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// The attempt in progress, if the run has not terminated.
    pub fn attempt(&self) -> Option<u32> {
        match self.current {
            RunState::Attempting(k) => Some(k),
            _ => None,
        }
    }

    /// Move to `to` if the transition is legal, recording it.
    pub fn advance(&mut self, to: RunState, reason: Option<&str>) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to, self.max_attempts) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        tracing::debug!(from = %self.current, to = %to, "Run transition");

        self.transitions.push(TransitionRecord {
            from: self.current,
            to,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        });
        self.current = to;
        Ok(())
    }

    /// Apply a validation outcome for the current attempt and return the
    /// resulting state.
    pub fn record_outcome(
        &mut self,
        valid: bool,
        error_count: usize,
    ) -> Result<RunState, IllegalTransition> {
        let Some(k) = self.attempt() else {
            return Err(IllegalTransition {
                from: self.current,
                to: self.current,
            });
        };

        if valid {
            self.advance(RunState::Succeeded, Some("validation passed"))?;
        } else if k < self.max_attempts {
            let reason = format!("{error_count} validation error(s), retrying");
            self.advance(RunState::Attempting(k + 1), Some(&reason))?;
        } else {
            let reason = format!("{error_count} validation error(s), budget exhausted");
            self.advance(RunState::ExhaustedWithErrors, Some(&reason))?;
        }
        Ok(self.current)
    }

    /// Terminate on a provider failure.
    pub fn abort(&mut self, reason: &str) -> Result<(), IllegalTransition> {
        self.advance(RunState::Aborted, Some(reason))
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    pub fn into_transitions(self) -> Vec<TransitionRecord> {
        self.transitions
    }

    pub fn summary(&self) -> String {
        let states: Vec<String> = self.transitions.iter().map(|t| t.to.to_string()).collect();
        let mut summary = format!(
            "{} → {} ({}ms, {} transitions)",
            RunState::Attempting(1),
            self.current,
            self.created_at.elapsed().as_millis(),
            self.transitions.len(),
        );
        if !states.is_empty() {
            summary.push_str(&format!(" [{}]", states.join(" → ")));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let sm = RunStateMachine::new(3);
        assert_eq!(sm.current(), RunState::Attempting(1));
        assert_eq!(sm.attempt(), Some(1));
        assert!(!sm.is_terminal());
        assert!(sm.transitions().is_empty());
    }

    #[test]
    fn test_zero_budget_raised_to_one() {
        let mut sm = RunStateMachine::new(0);
        assert_eq!(sm.max_attempts(), 1);
        assert_eq!(
            sm.record_outcome(false, 2).unwrap(),
            RunState::ExhaustedWithErrors
        );
    }

    #[test]
    fn test_success_on_second_attempt() {
        let mut sm = RunStateMachine::new(3);
        assert_eq!(sm.record_outcome(false, 1).unwrap(), RunState::Attempting(2));
        assert_eq!(sm.record_outcome(true, 0).unwrap(), RunState::Succeeded);
        assert!(sm.is_terminal());
        assert_eq!(sm.transitions().len(), 2);
        assert_eq!(
            sm.transitions()[0].reason.as_deref(),
            Some("1 validation error(s), retrying")
        );
    }

    #[test]
    fn test_exhaustion_after_budget() {
        let mut sm = RunStateMachine::new(3);
        sm.record_outcome(false, 4).unwrap();
        sm.record_outcome(false, 2).unwrap();
        assert_eq!(
            sm.record_outcome(false, 1).unwrap(),
            RunState::ExhaustedWithErrors
        );
        assert_eq!(sm.attempt(), None);
    }

    #[test]
    fn test_cannot_skip_or_exceed_budget() {
        let mut sm = RunStateMachine::new(2);
        assert!(sm.advance(RunState::Attempting(3), None).is_err());
        assert!(sm.advance(RunState::ExhaustedWithErrors, None).is_err());
        sm.advance(RunState::Attempting(2), None).unwrap();
        assert!(sm.advance(RunState::Attempting(3), None).is_err());
    }

    #[test]
    fn test_abort_from_any_attempt() {
        let mut sm = RunStateMachine::new(3);
        sm.record_outcome(false, 1).unwrap();
        sm.abort("connection reset").unwrap();
        assert_eq!(sm.current(), RunState::Aborted);
        assert!(sm.abort("again").is_err());
    }

    #[test]
    fn test_no_outcome_after_terminal() {
        let mut sm = RunStateMachine::new(3);
        sm.record_outcome(true, 0).unwrap();
        let err = sm.record_outcome(false, 1).unwrap_err();
        assert_eq!(err.from, RunState::Succeeded);
    }

    #[test]
    fn test_summary() {
        let mut sm = RunStateMachine::new(3);
        sm.record_outcome(false, 1).unwrap();
        sm.record_outcome(true, 0).unwrap();
        let summary = sm.summary();
        assert!(summary.contains("Succeeded"));
        assert!(summary.contains("2 transitions"));
        assert!(summary.contains("Attempting(2)"));
    }

    #[test]
    fn test_transition_record_serde_roundtrip() {
        let record = TransitionRecord {
            from: RunState::Attempting(2),
            to: RunState::ExhaustedWithErrors,
            elapsed_ms: 420,
            reason: Some("budget exhausted".into()),
        };
        let json = serde_json::to_string(&record).unwrap();
        let restored: TransitionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, record);
    }
}
