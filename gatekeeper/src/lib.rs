//! Gatekeeper: deterministic core of the component architect.
//!
//! This library provides:
//! - Design-token loading and the allowed color set
//! - Prompt-injection sanitizing of free-text user input
//! - Generation, correction and edit prompt builders
//! - A static validator (syntax balance, design-token conformance, Angular structure)
//! - The bounded generate-validate-repair loop and its run state machine
//! - Create-then-edit sessions with JSON history export
//!
//! The completion model sits behind the [`CompletionProvider`] trait; this
//! crate performs no network I/O.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use gatekeeper::{CorrectionConfig, CorrectionLoop, DesignSystem, Session, ValidatorConfig};
//! # async fn run(provider: impl gatekeeper::CompletionProvider) -> gatekeeper::ArchitectResult<()> {
//! let design = Arc::new(DesignSystem::from_file(std::path::Path::new("design-system.json"))?);
//! let engine = CorrectionLoop::new(
//!     provider,
//!     design,
//!     ValidatorConfig::default(),
//!     CorrectionConfig::default(),
//! )?;
//!
//! let mut session = Session::new();
//! let created = session.create(&engine, "A login card with glassmorphism").await?;
//! if !created.valid {
//!     eprintln!("unresolved: {:?}", created.remaining_errors);
//! }
//! session.edit(&engine, "Make the button rounded").await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod feedback;
pub mod output;
pub mod prompts;
pub mod provider;
pub mod sanitizer;
pub mod session;
pub mod tokens;
pub mod validator;

pub use error::{ArchitectError, ArchitectResult};
pub use feedback::{
    AttemptRecord, CorrectionConfig, CorrectionLoop, GenerationResult, RunState,
    DEFAULT_MAX_ATTEMPTS,
};
pub use prompts::{GenerationRequest, PromptMode, PROMPT_VERSION};
pub use provider::{CompletionProvider, CompletionRequest, ProviderError, SamplingParams};
pub use sanitizer::sanitize;
pub use session::{HistoryRecord, Session, SessionState, SessionTurn, TurnKind};
pub use tokens::DesignSystem;
pub use validator::{validate, ValidationReport, Validator, ValidatorConfig};
