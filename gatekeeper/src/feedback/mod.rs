//! Generation Feedback Module
//!
//! Provides the bounded repair loop around the completion provider:
//! - Prompt the model (generation, correction or edit)
//! - Validate the artifact against syntax, design-token and structure rules
//! - Feed the errors back until the artifact is clean or the budget is spent
//!
//! # Architecture
//!
//! ```text
//! Request → Prompt Builder → Provider → Validator → RunStateMachine ─→ GenerationResult
//!              ↑                                          │
//!              └──────────── errors + broken artifact ────┘
//! ```

pub mod correction_loop;
pub mod state_machine;

pub use correction_loop::{
    AttemptRecord, CorrectionConfig, CorrectionLoop, GenerationResult, GenerationResultBuilder,
    RunInput, DEFAULT_MAX_ATTEMPTS,
};
pub use state_machine::{IllegalTransition, RunState, RunStateMachine, TransitionRecord};
