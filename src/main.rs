//! dbgscrape - structured events from interactive debugger output
//!
//! Replays debugger transcripts, translates editor commands for a backend and
//! queries the in-debugger breakpoint proxy.

use clap::Parser;
use dbgscrape::common::logging;
use dbgscrape::{cli, commands::Commands};

#[derive(Parser)]
#[command(name = "dbgscrape", about = "Turn debugger terminal output into editor events")]
#[command(version, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Also write logs to the log directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.log_file {
        if let Some(path) = logging::init_with_file(cli.verbose) {
            tracing::debug!(path = %path.display(), "Logging to file");
        }
    } else {
        logging::init_cli(cli.verbose);
    }

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
