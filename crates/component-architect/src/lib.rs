//! Component architect: the I/O shell around the `gatekeeper` core.
//!
//! - [`config`]: environment and TOML configuration
//! - [`provider`]: streaming OpenAI-compatible chat-completions client
//! - [`repl`]: interactive create-then-edit session
//! - [`summary`]: user-facing run reports

pub mod config;
pub mod provider;
pub mod repl;
pub mod summary;

use std::sync::Arc;

use anyhow::{Context, Result};
use gatekeeper::{CorrectionLoop, DesignSystem};
use tracing::info;

use crate::config::ArchitectConfig;
use crate::provider::ChatCompletionsProvider;

/// Load the design system and wire the HTTP provider into a correction loop.
pub fn build_engine(config: &ArchitectConfig) -> Result<CorrectionLoop<ChatCompletionsProvider>> {
    let api_key = config.require_api_key()?;
    let design = DesignSystem::from_file(&config.design_system).with_context(|| {
        format!(
            "Failed to load design system {}",
            config.design_system.display()
        )
    })?;
    let provider = ChatCompletionsProvider::new(&config.provider, api_key)
        .context("Failed to build HTTP client")?;

    info!(
        model = %config.provider.model,
        base_url = %config.provider.base_url,
        max_attempts = config.max_attempts,
        "Component architect ready"
    );

    Ok(CorrectionLoop::new(
        provider,
        Arc::new(design),
        config.validator_config(),
        config.correction_config(),
    )?)
}
