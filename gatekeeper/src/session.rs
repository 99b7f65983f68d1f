//! Create-then-edit sessions.
//!
//! A [`Session`] owns the current artifact and an append-only history of
//! turns. It holds no provider: each operation borrows a [`CorrectionLoop`],
//! so any number of independent sessions can share one loop.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ArchitectError, ArchitectResult};
use crate::feedback::{CorrectionLoop, GenerationResult};
use crate::output::{write_artifact, write_json};
use crate::provider::CompletionProvider;

/// Kind of session turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    Create,
    Edit,
}

impl std::fmt::Display for TurnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Edit => write!(f, "edit"),
        }
    }
}

/// One completed turn with its full run result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTurn {
    pub kind: TurnKind,
    /// The description or edit instruction as the user typed it
    pub input: String,
    pub result: GenerationResult,
}

/// Exported summary of one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(rename = "type")]
    pub kind: TurnKind,
    pub prompt: String,
    pub attempts: usize,
    pub valid: bool,
    pub errors: Vec<String>,
}

impl From<&SessionTurn> for HistoryRecord {
    fn from(turn: &SessionTurn) -> Self {
        Self {
            kind: turn.kind,
            prompt: turn.input.clone(),
            attempts: turn.result.attempt_count(),
            valid: turn.result.valid,
            errors: turn.result.remaining_errors.clone(),
        }
    }
}

/// Session data: the current artifact and the turns that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub current_artifact: Option<String>,
    pub history: Vec<SessionTurn>,
}

/// A create/edit session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: SessionState,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current_artifact(&self) -> Option<&str> {
        self.state.current_artifact.as_deref()
    }

    pub fn history(&self) -> &[SessionTurn] {
        &self.state.history
    }

    /// Discard the current artifact and history.
    pub fn reset(&mut self) {
        self.state = SessionState::default();
    }

    /// Generate a new component. Replaces any current artifact.
    ///
    /// On a provider failure the session is left unchanged.
    pub async fn create<P: CompletionProvider>(
        &mut self,
        engine: &CorrectionLoop<P>,
        topic: &str,
    ) -> ArchitectResult<GenerationResult> {
        if self.state.current_artifact.is_some() {
            info!("Replacing the current component with a new one");
        }
        let result = engine.generate(topic).await?;
        self.commit(TurnKind::Create, topic, &result);
        Ok(result)
    }

    /// Apply an edit to the current component.
    ///
    /// Fails with [`ArchitectError::NoArtifact`] before any provider call when
    /// nothing has been created yet. The final artifact becomes the new
    /// baseline even if it is still invalid.
    pub async fn edit<P: CompletionProvider>(
        &mut self,
        engine: &CorrectionLoop<P>,
        instruction: &str,
    ) -> ArchitectResult<GenerationResult> {
        let current = self
            .state
            .current_artifact
            .as_deref()
            .ok_or(ArchitectError::NoArtifact)?;
        let result = engine.edit(current, instruction).await?;
        self.commit(TurnKind::Edit, instruction, &result);
        Ok(result)
    }

    fn commit(&mut self, kind: TurnKind, input: &str, result: &GenerationResult) {
        self.state.current_artifact = Some(result.final_artifact.clone());
        self.state.history.push(SessionTurn {
            kind,
            input: input.to_string(),
            result: result.clone(),
        });
        info!(
            kind = %kind,
            turns = self.state.history.len(),
            attempts = result.attempt_count(),
            valid = result.valid,
            "Session turn recorded"
        );
    }

    /// One summary record per turn, in order.
    pub fn history_records(&self) -> Vec<HistoryRecord> {
        self.state.history.iter().map(HistoryRecord::from).collect()
    }

    /// Write the history export as a JSON array.
    pub fn save_history(&self, path: &Path) -> ArchitectResult<()> {
        write_json(path, &self.history_records())?;
        info!(path = %path.display(), turns = self.state.history.len(), "History saved");
        Ok(())
    }

    /// Write the current artifact. Returns `false` if there is none yet.
    pub fn save_artifact(&self, path: &Path) -> ArchitectResult<bool> {
        match self.current_artifact() {
            Some(artifact) => {
                write_artifact(path, artifact)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
