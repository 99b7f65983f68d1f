//! Completion provider boundary.
//!
//! The engine treats the code-generation model as an opaque async function
//! from a [`CompletionRequest`] to fully assembled text. Streaming, timeouts
//! and transport-level backoff belong to implementations of
//! [`CompletionProvider`], never to the engine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sampling parameters fixed by the engine for every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_completion_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.6,
            top_p: 1.0,
            max_completion_tokens: 4096,
        }
    }
}

/// One completion call: system instruction, user prompt, sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub sampling: SamplingParams,
}

/// Failure at the provider boundary.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network or connection failure
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Non-success HTTP status after any provider-side retries
    #[error("Provider returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response stream could not be parsed
    #[error("Malformed stream: {0}")]
    MalformedStream(String),

    /// The provider finished without producing any text
    #[error("Provider returned an empty completion")]
    EmptyCompletion,
}

/// A text-completion service.
///
/// Implementations must return the complete generated text; partial output is
/// never observed by the caller.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError>;
}
