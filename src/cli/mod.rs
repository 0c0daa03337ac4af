//! CLI command handling
//!
//! Runs the subcommands against the library and formats their output.

use std::path::{Path, PathBuf};
use std::time::Duration;

use colored::Colorize;

use crate::backend::{Backend, BackendKind};
use crate::breakpoint::{BreakpointClient, QueryError, UdpProxy};
use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::location::PathPolicy;
use crate::session::{DebugSession, Terminal};
use crate::sink::JsonLinesSink;
use crate::testing;

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Replay {
            backend,
            transcript,
            chunk_size,
            base_dir,
            addr_file,
        } => replay(backend, &transcript, chunk_size, base_dir, addr_file).await,

        Commands::Translate {
            backend,
            command,
            args,
        } => {
            let config = Config::load()?;
            let backend = Backend::new(backend, &config.backend_options(backend)?)?;
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            println!("{}", backend.format_command(&command, &args)?);
            Ok(())
        }

        Commands::Breakpoints {
            addr_file,
            file,
            timeout_ms,
        } => {
            let config = Config::load()?;
            let timeout = timeout_ms.map_or_else(|| config.proxy.timeout(), Duration::from_millis);
            let mut client = BreakpointClient::new(UdpProxy::new(addr_file, timeout));

            match client.query(&file).await {
                Ok(breaks) if breaks.is_empty() => {
                    println!("No breakpoints in {}", file.display());
                }
                Ok(breaks) => {
                    println!("Breakpoints in {}:", file.display());
                    for (line, ids) in &breaks {
                        println!("  {:>5}  {}", line, ids.join(", "));
                    }
                }
                Err(QueryError::Reported(message)) => {
                    println!(
                        "{} {}: {}",
                        "Debugger refused to list breakpoints in".yellow(),
                        file.display(),
                        message
                    );
                }
                Err(e) => return Err(Error::SideChannel(e.to_string())),
            }
            Ok(())
        }

        Commands::Test { files, show_events } => {
            let mut failed = Vec::new();
            for path in &files {
                let result = testing::run_scenario(path, show_events).await?;
                if !result.passed {
                    failed.push(result.name);
                }
            }

            println!(
                "{} passed, {} failed",
                (files.len() - failed.len()).to_string().green(),
                failed.len().to_string().red()
            );
            if failed.is_empty() {
                Ok(())
            } else {
                Err(Error::TestAssertion(format!(
                    "{} scenario(s) failed: {}",
                    failed.len(),
                    failed.join(", ")
                )))
            }
        }
    }
}

/// A transcript has nobody to type into
struct ReadOnlyTerminal;

impl Terminal for ReadOnlyTerminal {
    fn send_line(&mut self, line: &str) -> Result<()> {
        Err(Error::Terminal(format!("cannot send '{}' while replaying", line)))
    }

    fn interrupt(&mut self) -> Result<()> {
        Err(Error::Terminal("cannot interrupt while replaying".to_string()))
    }
}

async fn replay(
    kind: BackendKind,
    transcript: &Path,
    chunk_size: Option<usize>,
    base_dir: Option<PathBuf>,
    addr_file: Option<PathBuf>,
) -> Result<()> {
    let config = Config::load()?;
    let mut options = config.backend_options(kind)?;
    if let Some(base) = base_dir {
        options.path_policy = PathPolicy::Absolute { base };
    }

    let output = tokio::fs::read(transcript)
        .await
        .map_err(|e| Error::file_read(transcript, e))?;

    let channel = addr_file.map(|file| UdpProxy::new(file, config.proxy.timeout()));
    let backend = Backend::new(kind, &options)?;
    let mut session = DebugSession::new(
        backend,
        ReadOnlyTerminal,
        channel,
        JsonLinesSink::new(std::io::stdout()),
    )?;

    let chunk_size = chunk_size.filter(|&n| n > 0).unwrap_or(output.len().max(1));
    tracing::debug!(bytes = output.len(), chunk_size, "Replaying transcript");
    for chunk in output.chunks(chunk_size) {
        session.feed(chunk).await;
    }

    tracing::info!(state = %session.state(), "Replay finished");
    session.end();
    Ok(())
}
