//! Interactive multi-turn session.
//!
//! The first description creates the component; every later line is an edit
//! instruction unless it is one of the commands below. The current artifact
//! is mirrored to disk after each turn and the history is written on exit.
//!
//! ```text
//! save <path>        write the current component to <path>
//! history            list the turns so far
//! new <description>  replace the component with a freshly generated one
//! quit | exit        end the session
//! ```

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use gatekeeper::{ArchitectError, CompletionProvider, CorrectionLoop, Session};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;

use crate::summary::write_outcome;

/// History entries are shown cut to this many characters.
const HISTORY_PREVIEW_CHARS: usize = 60;

/// Where the session mirrors its artifact and history.
#[derive(Debug, Clone)]
pub struct ReplPaths {
    pub artifact: PathBuf,
    pub history: PathBuf,
}

impl Default for ReplPaths {
    fn default() -> Self {
        Self {
            artifact: PathBuf::from("output/session.component.ts"),
            history: PathBuf::from("output/session-history.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    History,
    Save(PathBuf),
    New(String),
    /// A keyword given without its argument; holds the expected form
    Usage(&'static str),
    /// Free text: a description before anything exists, an edit afterwards
    Text(String),
    Empty,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            return Self::Quit;
        }
        if line.eq_ignore_ascii_case("history") {
            return Self::History;
        }
        if line.eq_ignore_ascii_case("save") {
            return Self::Usage("save <path>");
        }
        if line.eq_ignore_ascii_case("new") {
            return Self::Usage("new <description>");
        }
        if let Some(path) = strip_keyword(line, "save ") {
            return Self::Save(PathBuf::from(path));
        }
        if let Some(topic) = strip_keyword(line, "new ") {
            return Self::New(topic.to_string());
        }
        Self::Text(line.to_string())
    }
}

fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let head = line.get(..keyword.len())?;
    head.eq_ignore_ascii_case(keyword)
        .then(|| line[keyword.len()..].trim())
}

/// Run the session until `quit` or end of input. Returns the final session.
pub async fn run<P, R, W>(
    engine: &CorrectionLoop<P>,
    input: R,
    out: &mut W,
    paths: &ReplPaths,
) -> Result<Session>
where
    P: CompletionProvider,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut session = Session::new();
    let mut lines = input.lines();

    writeln!(out, "Guided Component Architect: multi-turn session")?;
    writeln!(out, "Commands: 'save <path>' | 'history' | 'new <description>' | 'quit'")?;

    loop {
        if session.current_artifact().is_none() {
            writeln!(out, "\nDescribe the component to create:")?;
        } else {
            writeln!(out, "\nFollow-up edit (or 'quit'):")?;
        }
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match Command::parse(&line) {
            Command::Empty => continue,
            Command::Usage(form) => writeln!(out, "Usage: {form}")?,
            Command::Quit => break,
            Command::History => {
                if session.history().is_empty() {
                    writeln!(out, "  (no turns yet)")?;
                }
                for (i, turn) in session.history().iter().enumerate() {
                    let preview: String = turn.input.chars().take(HISTORY_PREVIEW_CHARS).collect();
                    writeln!(out, "  {}. [{}] {}", i + 1, turn.kind, preview)?;
                }
            }
            Command::Save(path) => match session.save_artifact(&path) {
                Ok(true) => writeln!(out, "Saved to {}", path.display())?,
                Ok(false) => writeln!(out, "Nothing to save yet.")?,
                Err(e) => writeln!(out, "Could not save: {e}")?,
            },
            Command::New(topic) => {
                let outcome = session.create(engine, &topic).await;
                report_turn(&session, outcome, out, paths)?;
            }
            Command::Text(text) => {
                let outcome = if session.current_artifact().is_none() {
                    session.create(engine, &text).await
                } else {
                    session.edit(engine, &text).await
                };
                report_turn(&session, outcome, out, paths)?;
            }
        }
    }

    writeln!(out, "\nSession ended.")?;
    if !session.history().is_empty() {
        match session.save_history(&paths.history) {
            Ok(()) => writeln!(out, "History saved to {}", paths.history.display())?,
            Err(e) => {
                warn!(path = %paths.history.display(), error = %e, "Could not write session history");
                writeln!(out, "Could not save history to {}: {e}", paths.history.display())?;
            }
        }
    }
    Ok(session)
}

/// Mirror the artifact and print the outcome. Mirror failures, provider errors
/// and input errors are shown to the user and the session carries on.
fn report_turn<W: Write>(
    session: &Session,
    outcome: gatekeeper::ArchitectResult<gatekeeper::GenerationResult>,
    out: &mut W,
    paths: &ReplPaths,
) -> Result<()> {
    match outcome {
        Ok(result) => {
            let mirrored = match session.save_artifact(&paths.artifact) {
                Ok(saved) => saved,
                Err(e) => {
                    warn!(path = %paths.artifact.display(), error = %e, "Could not mirror artifact");
                    writeln!(out, "Could not update {}: {e}", paths.artifact.display())?;
                    false
                }
            };
            write_outcome(out, &result, mirrored.then_some(paths.artifact.as_path()))?;
        }
        Err(ArchitectError::Provider {
            attempt,
            completed,
            source,
        }) => {
            warn!(attempt, completed = completed.len(), "Turn aborted by provider failure");
            writeln!(
                out,
                "Generation failed on attempt {attempt}: {source}. The component is unchanged."
            )?;
        }
        Err(e) if e.is_input_error() => writeln!(out, "{e}")?,
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("  "), Command::Empty);
        assert_eq!(Command::parse("QUIT"), Command::Quit);
        assert_eq!(Command::parse("exit"), Command::Quit);
        assert_eq!(Command::parse("history"), Command::History);
        assert_eq!(
            Command::parse("save out/card.ts"),
            Command::Save(PathBuf::from("out/card.ts"))
        );
        assert_eq!(
            Command::parse("New a pricing table"),
            Command::New("a pricing table".into())
        );
        assert_eq!(
            Command::parse("make the button rounded"),
            Command::Text("make the button rounded".into())
        );
    }

    #[test]
    fn test_save_prefix_needs_argument() {
        assert_eq!(Command::parse("saved"), Command::Text("saved".into()));
        assert_eq!(Command::parse("save "), Command::Usage("save <path>"));
        assert_eq!(Command::parse("  SAVE\t"), Command::Usage("save <path>"));
        assert_eq!(Command::parse("new"), Command::Usage("new <description>"));
        assert_eq!(
            Command::parse("newer layout"),
            Command::Text("newer layout".into())
        );
    }
}
