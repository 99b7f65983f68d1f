//! Bounded generate-validate-repair loop.
//!
//! Each attempt:
//! 1. Builds the prompt (generation, correction or edit)
//! 2. Calls the completion provider
//! 3. Validates the returned artifact
//! 4. Stops on a clean artifact, otherwise feeds the errors into the next
//!    attempt until the budget is spent
//!
//! Every attempt is kept in the result, valid or not.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ArchitectError, ArchitectResult};
use crate::feedback::state_machine::{RunState, RunStateMachine, TransitionRecord};
use crate::prompts::{GenerationRequest, PromptMode, PROMPT_VERSION};
use crate::provider::{CompletionProvider, CompletionRequest, SamplingParams};
use crate::tokens::DesignSystem;
use crate::validator::{CheckResult, ValidationReport, Validator, ValidatorConfig};

/// Default attempt budget per run.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Configuration for the correction loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionConfig {
    /// Maximum attempts per run, including the first
    pub max_attempts: u32,
    /// Sampling parameters sent with every completion request
    pub sampling: SamplingParams,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            sampling: SamplingParams::default(),
        }
    }
}

impl CorrectionConfig {
    pub fn validate(&self) -> ArchitectResult<()> {
        if self.max_attempts == 0 {
            return Err(ArchitectError::InvalidConfig {
                message: "max_attempts must be at least 1".into(),
            });
        }
        if !(0.0..=2.0).contains(&self.sampling.temperature) {
            return Err(ArchitectError::InvalidConfig {
                message: format!(
                    "temperature {} is outside 0.0..=2.0",
                    self.sampling.temperature
                ),
            });
        }
        if !(self.sampling.top_p > 0.0 && self.sampling.top_p <= 1.0) {
            return Err(ArchitectError::InvalidConfig {
                message: format!("top_p {} is outside (0.0, 1.0]", self.sampling.top_p),
            });
        }
        Ok(())
    }
}

/// One attempt: prompt family, artifact and its validation outcome.
/// Never mutated after it is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Attempt number (1-indexed)
    pub index: u32,
    pub timestamp: DateTime<Utc>,
    pub mode: PromptMode,
    pub artifact: String,
    pub valid: bool,
    pub errors: Vec<String>,
    /// Per-check breakdown of the validation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<CheckResult>,
}

impl AttemptRecord {
    fn new(index: u32, mode: PromptMode, artifact: String, report: ValidationReport) -> Self {
        Self {
            index,
            timestamp: Utc::now(),
            mode,
            artifact,
            valid: report.valid,
            errors: report.errors,
            checks: report.checks,
        }
    }
}

/// Terminal value of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Every attempt, in order
    pub attempts: Vec<AttemptRecord>,
    /// The accepted artifact, or the last attempt's when the budget ran out
    pub final_artifact: String,
    pub valid: bool,
    /// Errors of the final artifact (empty when valid)
    pub remaining_errors: Vec<String>,
    pub final_state: RunState,
    pub duration_ms: u64,
    #[serde(default)]
    pub transitions: Vec<TransitionRecord>,
}

impl GenerationResult {
    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }
}

/// Builder for run results
pub struct GenerationResultBuilder {
    start_time: Instant,
    attempts: Vec<AttemptRecord>,
}

impl GenerationResultBuilder {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            attempts: Vec::new(),
        }
    }

    pub fn add_attempt(&mut self, attempt: AttemptRecord) {
        self.attempts.push(attempt);
    }

    pub fn last(&self) -> Option<&AttemptRecord> {
        self.attempts.last()
    }

    /// Attempts recorded so far, for error reporting on abort.
    pub fn into_attempts(self) -> Vec<AttemptRecord> {
        self.attempts
    }

    /// Freeze the result from the last attempt. `None` if no attempt ran.
    pub fn build(self, machine: RunStateMachine) -> Option<GenerationResult> {
        let duration_ms = self.start_time.elapsed().as_millis() as u64;
        let last = self.attempts.last()?;
        let final_artifact = last.artifact.clone();
        let valid = last.valid;
        let remaining_errors = last.errors.clone();

        Some(GenerationResult {
            attempts: self.attempts,
            final_artifact,
            valid,
            remaining_errors,
            final_state: machine.current(),
            duration_ms,
            transitions: machine.into_transitions(),
        })
    }
}

impl Default for GenerationResultBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// What a run starts from.
#[derive(Debug, Clone, Copy)]
pub enum RunInput<'a> {
    /// Create a component from a description.
    Create { topic: &'a str },
    /// Change an existing component.
    Edit {
        instruction: &'a str,
        current: &'a str,
    },
}

impl RunInput<'_> {
    /// Prompt inputs for the next attempt, given the previous one (if any).
    pub fn request_for(&self, previous: Option<&AttemptRecord>) -> GenerationRequest {
        match (self, previous) {
            (Self::Create { topic }, None) => GenerationRequest::initial(*topic),
            (Self::Create { topic }, Some(prev)) => {
                GenerationRequest::correction(*topic, &prev.artifact, &prev.errors)
            }
            (
                Self::Edit {
                    instruction,
                    current,
                },
                None,
            ) => GenerationRequest::edit(*instruction, current, &[]),
            (Self::Edit { instruction, .. }, Some(prev)) => {
                GenerationRequest::edit(*instruction, &prev.artifact, &prev.errors)
            }
        }
    }
}

/// The correction loop controller.
///
/// Holds the provider, the validator and the budget. It keeps no per-run
/// state, so one loop can serve any number of sessions by reference.
pub struct CorrectionLoop<P> {
    provider: P,
    validator: Validator,
    config: CorrectionConfig,
}

impl<P: CompletionProvider> CorrectionLoop<P> {
    pub fn new(
        provider: P,
        design: Arc<DesignSystem>,
        validator_config: ValidatorConfig,
        config: CorrectionConfig,
    ) -> ArchitectResult<Self> {
        config.validate()?;
        Ok(Self {
            provider,
            validator: Validator::new(design, validator_config),
            config,
        })
    }

    pub fn config(&self) -> &CorrectionConfig {
        &self.config
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Create a component from a description.
    pub async fn generate(&self, topic: &str) -> ArchitectResult<GenerationResult> {
        self.run(RunInput::Create { topic }).await
    }

    /// Apply an edit instruction to an existing component.
    pub async fn edit(&self, current: &str, instruction: &str) -> ArchitectResult<GenerationResult> {
        self.run(RunInput::Edit {
            instruction,
            current,
        })
        .await
    }

    /// Drive one run to a terminal state.
    pub async fn run(&self, input: RunInput<'_>) -> ArchitectResult<GenerationResult> {
        let max_attempts = self.config.max_attempts;
        let mut machine = RunStateMachine::new(max_attempts);
        let mut builder = GenerationResultBuilder::new();

        info!(
            max_attempts,
            prompt_version = PROMPT_VERSION,
            edit = matches!(input, RunInput::Edit { .. }),
            "Starting generation run"
        );

        while let Some(attempt) = machine.attempt() {
            let request = input.request_for(builder.last());
            if attempt > 1 {
                info!(
                    attempt,
                    max_attempts,
                    errors = request.prior_errors.len(),
                    "Self-correction triggered"
                );
            }

            let completion = CompletionRequest {
                system: request.system_instruction(),
                prompt: request.render(self.validator.design()),
                sampling: self.config.sampling,
            };

            info!(attempt, max_attempts, mode = %request.mode, "Calling completion provider");
            let artifact = match self.provider.complete(completion).await {
                Ok(text) => text,
                Err(source) => {
                    warn!(attempt, error = %source, "Completion provider failed, aborting run");
                    machine.abort(&source.to_string())?;
                    return Err(ArchitectError::Provider {
                        attempt,
                        completed: builder.into_attempts(),
                        source,
                    });
                }
            };

            let report = self.validator.validate(&artifact);
            if report.valid {
                info!(attempt, "Validation passed");
            } else {
                warn!(
                    attempt,
                    errors = report.errors.len(),
                    summary = %report.summary(),
                    "Validation failed"
                );
                for error in &report.errors {
                    warn!(attempt, "  • {error}");
                }
            }

            let error_count = report.errors.len();
            let valid = report.valid;
            builder.add_attempt(AttemptRecord::new(attempt, request.mode, artifact, report));
            machine.record_outcome(valid, error_count)?;
        }

        if machine.current() == RunState::ExhaustedWithErrors {
            warn!(
                max_attempts,
                "Max attempts reached, returning best-effort artifact with unresolved errors"
            );
        }
        info!(summary = %machine.summary(), "Generation run finished");

        builder
            .build(machine)
            .ok_or_else(|| ArchitectError::InvalidConfig {
                message: "run finished without any attempt".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use async_trait::async_trait;
    use mockall::mock;

    mock! {
        pub Provider {}

        #[async_trait]
        impl CompletionProvider for Provider {
            async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError>;
        }
    }

    const VALID: &str = "import { Component } from '@angular/core';\n\
                         @Component({ selector: 'app-x', template: `<p class=\"text-[#6366f1]\">x</p>` })\n\
                         export class XComponent {}";

    const BROKEN: &str = "Sure! Here it is:\nexport class XComponent {";

    fn design() -> Arc<DesignSystem> {
        Arc::new(
            DesignSystem::from_json(
                r##"{"tokens": {"colors": {"primary": "#6366f1"}, "effects": {}}}"##,
            )
            .unwrap(),
        )
    }

    fn engine(provider: MockProvider) -> CorrectionLoop<MockProvider> {
        CorrectionLoop::new(
            provider,
            design(),
            ValidatorConfig::default(),
            CorrectionConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_correction_config_default() {
        let config = CorrectionConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.sampling.temperature, 0.6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_zero_attempts_and_bad_top_p() {
        let mut config = CorrectionConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        config.max_attempts = 3;
        config.sampling.top_p = 0.0;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_always_invalid_exhausts_budget() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .times(3)
            .returning(|_| Ok(BROKEN.to_string()));

        let result = engine(provider).generate("A card").await.unwrap();
        assert_eq!(result.attempt_count(), 3);
        assert!(!result.valid);
        assert_eq!(result.final_artifact, BROKEN);
        assert_eq!(result.remaining_errors, result.attempts[2].errors);
        assert_eq!(result.final_state, RunState::ExhaustedWithErrors);
    }

    #[tokio::test]
    async fn test_valid_first_attempt_stops_immediately() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .times(1)
            .withf(|req| !req.prompt.contains("PREVIOUS ATTEMPT"))
            .returning(|_| Ok(VALID.to_string()));

        let result = engine(provider).generate("A card").await.unwrap();
        assert_eq!(result.attempt_count(), 1);
        assert!(result.valid);
        assert!(result.remaining_errors.is_empty());
        assert_eq!(result.final_state, RunState::Succeeded);
    }

    #[tokio::test]
    async fn test_empty_reply_is_repaired_on_next_attempt() {
        let mut provider = MockProvider::new();
        let mut seq = mockall::Sequence::new();
        provider
            .expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(String::new()));
        provider
            .expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(VALID.to_string()));

        let result = engine(provider).generate("A card").await.unwrap();
        assert_eq!(result.attempt_count(), 2);
        assert!(result.valid);
        assert!(!result.attempts[0].errors.is_empty());
        assert_eq!(result.final_artifact, VALID);
        assert_eq!(result.final_state, RunState::Succeeded);
    }

    #[tokio::test]
    async fn test_provider_failure_aborts_and_keeps_trail() {
        let mut provider = MockProvider::new();
        let mut seq = mockall::Sequence::new();
        provider
            .expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(BROKEN.to_string()));
        provider
            .expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(ProviderError::Transport("connection reset".into())));

        let err = engine(provider).generate("A card").await.unwrap_err();
        match err {
            ArchitectError::Provider {
                attempt, completed, ..
            } => {
                assert_eq!(attempt, 2);
                assert_eq!(completed.len(), 1);
                assert_eq!(completed[0].artifact, BROKEN);
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[test]
    fn test_create_input_builds_correction_from_previous_attempt() {
        let input = RunInput::Create { topic: "A card" };
        assert_eq!(input.request_for(None).mode, PromptMode::Initial);

        let prev = AttemptRecord::new(
            1,
            PromptMode::Initial,
            BROKEN.to_string(),
            crate::validator::validate(BROKEN, &design()),
        );
        let next = input.request_for(Some(&prev));
        assert_eq!(next.mode, PromptMode::Correction);
        assert_eq!(next.prior_artifact.as_deref(), Some(BROKEN));
        assert_eq!(next.prior_errors, prev.errors);
    }

    #[test]
    fn test_edit_input_starts_from_current_artifact() {
        let input = RunInput::Edit {
            instruction: "make it blue",
            current: VALID,
        };
        let first = input.request_for(None);
        assert_eq!(first.mode, PromptMode::Edit);
        assert_eq!(first.prior_artifact.as_deref(), Some(VALID));
        assert!(first.prior_errors.is_empty());
    }
}
