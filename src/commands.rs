//! CLI command definitions
//!
//! Defines the clap commands for the dbgscrape CLI.

use clap::Subcommand;
use std::path::PathBuf;

use crate::backend::BackendKind;

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a recorded terminal transcript and print the events as JSON lines
    Replay {
        /// Debugger that produced the transcript
        #[arg(long, short, value_enum)]
        backend: BackendKind,

        /// Transcript file (raw terminal output)
        transcript: PathBuf,

        /// Feed the transcript in chunks of this many bytes
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Resolve relative jump locations against this directory
        #[arg(long)]
        base_dir: Option<PathBuf>,

        /// File where the breakpoint proxy published its address
        #[arg(long)]
        addr_file: Option<PathBuf>,
    },

    /// Show how a logical command is spelled for a backend
    Translate {
        #[arg(long, short, value_enum)]
        backend: BackendKind,

        /// Logical command name (e.g., "breakpoint", "until {}")
        command: String,

        /// Arguments substituted for `{}` placeholders, in order
        args: Vec<String>,
    },

    /// Ask a running breakpoint proxy for the breakpoints of a file
    Breakpoints {
        /// File where the proxy published its address
        #[arg(long)]
        addr_file: PathBuf,

        /// Source file to query
        file: PathBuf,

        /// How long to wait for the proxy (overrides the config file)
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Run YAML test scenarios
    Test {
        /// Scenario files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print every event as it is produced
        #[arg(long)]
        show_events: bool,
    },
}
