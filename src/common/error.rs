//! Error types for dbgscrape
//!
//! Parsing and query problems degrade gracefully inside a session; the
//! variants here cover the failures that are reported to callers.

use std::io;
use thiserror::Error;

use crate::parser::State;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dbgscrape
#[derive(Error, Debug)]
pub enum Error {
    // === Backend Errors ===
    #[error("Unknown debugger backend '{0}'. Expected one of: gdb, lldb, pdb, bashdb")]
    UnknownBackend(String),

    #[error("Invalid output pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Transition table has no rules for reachable state '{state}'")]
    InvariantViolation { state: State },

    // === Parsing Errors ===
    #[error("Cannot decode source location: {0}")]
    LocationParse(String),

    // === Command Errors ===
    #[error("Command '{command}' expects at least {expected} argument(s), got {got}")]
    MissingCommandArgument {
        command: String,
        expected: usize,
        got: usize,
    },

    #[error("Terminal error: {0}")]
    Terminal(String),

    // === Side Channel Errors ===
    #[error("Side channel error: {0}")]
    SideChannel(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Test Errors ===
    #[error("Test assertion failed: {0}")]
    TestAssertion(String),
}

impl Error {
    /// Create a missing command argument error
    pub fn missing_argument(command: &str, expected: usize, got: usize) -> Self {
        Self::MissingCommandArgument {
            command: command.to_string(),
            expected,
            got,
        }
    }

    /// Create a file read error for the given path
    pub fn file_read(path: &std::path::Path, error: impl std::fmt::Display) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}
