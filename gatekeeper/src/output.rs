//! Writing artifacts and history exports to disk.

use std::path::Path;

use serde::Serialize;

use crate::error::{ArchitectError, ArchitectResult};

fn ensure_parent(path: &Path) -> ArchitectResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ArchitectError::io(parent, e))?;
    }
    Ok(())
}

/// Write artifact text verbatim, creating parent directories.
pub fn write_artifact(path: &Path, artifact: &str) -> ArchitectResult<()> {
    ensure_parent(path)?;
    std::fs::write(path, artifact).map_err(|e| ArchitectError::io(path, e))?;
    tracing::info!(path = %path.display(), bytes = artifact.len(), "Component saved");
    Ok(())
}

/// Write any serializable value as pretty JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> ArchitectResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    ensure_parent(path)?;
    std::fs::write(path, json).map_err(|e| ArchitectError::io(path, e))?;
    Ok(())
}
