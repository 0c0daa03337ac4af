//! Logging and tracing configuration
//!
//! Logs go to stderr so that stdout stays reserved for event output
//! (JSON lines from `replay`, scenario results from `test`).

use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::paths;

/// Initialize tracing for the CLI
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate (DEBUG with `verbose`), WARN for
/// dependencies.
pub fn init_cli(verbose: bool) {
    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Initialize tracing with an additional log file in the data directory
///
/// Transcript parsing problems are easier to diagnose with the per-transition
/// DEBUG records, so the file layer always records everything the filter
/// lets through. Falls back to stderr-only logging if the file can't be
/// opened.
pub fn init_with_file(verbose: bool) -> Option<PathBuf> {
    let log_file = paths::log_dir().and_then(|dir| {
        std::fs::create_dir_all(&dir).ok()?;
        Some(dir.join("dbgscrape.log"))
    });

    let file = log_file.as_ref().and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| eprintln!("Warning: Could not open log file: {}", e))
            .ok()
    });

    let Some(file) = file else {
        init_cli(verbose);
        return None;
    };

    let file_layer = fmt::layer()
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact();

    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(file_layer)
        .with(stderr_layer)
        .init();

    log_file
}

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("dbgscrape=debug,warn")
        } else {
            EnvFilter::new("dbgscrape=info,warn")
        }
    })
}
