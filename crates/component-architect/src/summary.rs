use std::io::Write;
use std::path::Path;

use gatekeeper::GenerationResult;

/// Print the user-facing outcome of one run.
///
/// A valid artifact is reported as a success; an exhausted run is a warning
/// that lists every remaining error. Neither is an error for the caller.
pub fn write_outcome<W: Write>(
    out: &mut W,
    result: &GenerationResult,
    saved_to: Option<&Path>,
) -> std::io::Result<()> {
    if result.valid {
        writeln!(
            out,
            "\nComponent generated successfully in {} attempt(s)",
            result.attempt_count()
        )?;
    } else {
        writeln!(
            out,
            "\nWarning: component has {} unresolved error(s) after {} attempt(s):",
            result.remaining_errors.len(),
            result.attempt_count()
        )?;
        for error in &result.remaining_errors {
            writeln!(out, "   • {error}")?;
        }
    }
    if let Some(path) = saved_to {
        writeln!(out, "Output: {}", path.display())?;
    }
    Ok(())
}
