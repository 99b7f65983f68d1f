use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use component_architect::build_engine;
use component_architect::config::ArchitectConfig;
use component_architect::repl::{self, ReplPaths};
use component_architect::summary::write_outcome;
use gatekeeper::output::write_artifact;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{error, info};

/// Generate a design-system-compliant Angular component from a description.
#[derive(Debug, Parser)]
#[command(name = "component-architect", version, about)]
struct Cli {
    /// Component description (prompted for on stdin when omitted)
    prompt: Option<String>,

    /// Output file path
    #[arg(short, long, default_value = "output/generated.component.ts")]
    output: PathBuf,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Start a multi-turn create-then-edit session
    #[arg(short, long)]
    interactive: bool,

    /// TOML config file overriding environment settings
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let default_level = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = ArchitectConfig::load(cli.config.as_deref())?;
    let engine = build_engine(&config)?;

    let mut out = std::io::stdout();

    if cli.interactive {
        let input = tokio::io::BufReader::new(tokio::io::stdin());
        repl::run(&engine, input, &mut out, &ReplPaths::default()).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let prompt = match cli.prompt {
        Some(prompt) => prompt.trim().to_string(),
        None => {
            let input = tokio::io::BufReader::new(tokio::io::stdin());
            read_prompt(input, &mut out).await?
        }
    };
    if prompt.is_empty() {
        eprintln!("No prompt provided. Exiting.");
        return Ok(ExitCode::FAILURE);
    }

    let result = engine.generate(&prompt).await?;
    write_artifact(&cli.output, &result.final_artifact)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;
    info!(
        attempts = result.attempt_count(),
        valid = result.valid,
        duration_ms = result.duration_ms,
        "Generation finished"
    );
    write_outcome(&mut out, &result, Some(cli.output.as_path()))?;
    Ok(ExitCode::SUCCESS)
}

async fn read_prompt<R, W>(input: R, out: &mut W) -> Result<String>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(out, "Guided Component Architect")?;
    writeln!(out, "{}", "-".repeat(40))?;
    write!(out, "Describe the component you want to build:\n> ")?;
    out.flush()?;

    let line = input
        .lines()
        .next_line()
        .await
        .context("Failed to read prompt from stdin")?;
    Ok(line.unwrap_or_default().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_prompt_takes_first_line_trimmed() {
        let mut out = Vec::new();
        let prompt = read_prompt("  A login card  \nignored\n".as_bytes(), &mut out)
            .await
            .unwrap();
        assert_eq!(prompt, "A login card");
        assert!(String::from_utf8(out).unwrap().ends_with("> "));
    }

    #[tokio::test]
    async fn test_read_prompt_at_end_of_input_is_empty() {
        let mut out = Vec::new();
        let prompt = read_prompt("".as_bytes(), &mut out).await.unwrap();
        assert!(prompt.is_empty());
    }
}
