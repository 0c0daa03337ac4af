//! Test scenario configuration types
//!
//! Defines the data structures for deserializing YAML test scenarios.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::backend::BackendKind;
use crate::parser::State;

/// A complete test scenario loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct TestScenario {
    /// Name of the test scenario
    pub name: String,
    /// Optional description of what the test verifies
    pub description: Option<String>,
    /// Debugger whose output is replayed
    pub backend: BackendKind,
    /// Resolve jump locations against this directory instead of verbatim
    pub base_dir: Option<PathBuf>,
    /// The sequence of test steps to execute
    pub steps: Vec<TestStep>,
}

/// A single test step in the execution flow
#[derive(Deserialize, Debug)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Feed debugger output to the session
    Feed {
        /// Raw terminal output
        output: String,
        /// Expected session reaction
        expect: Option<FeedExpectation>,
    },
    /// Queue the proxy's answer to the next side-channel request
    ///
    /// Without a queued answer the proxy stays silent.
    Respond {
        response: Option<String>,
    },
    /// Toggle the breakpoint at a line, as the editor would
    Toggle {
        file: PathBuf,
        line: u32,
        expect: Option<CommandExpectation>,
    },
    /// Send a logical command
    Send {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        expect: Option<CommandExpectation>,
    },
}

/// Expectations after feeding output
#[derive(Deserialize, Debug)]
pub struct FeedExpectation {
    /// Exact sequence of notifications; an empty list means none
    pub events: Option<Vec<EventExpectation>>,
    /// Parser state afterwards
    pub state: Option<State>,
}

/// Assertion for one notification
#[derive(Deserialize, Debug)]
pub struct EventExpectation {
    /// Notification name (e.g., "jump", "breakpoints_updated")
    pub event: String,
    /// Expected file (exact match)
    pub file: Option<String>,
    /// Expected line number
    pub line: Option<u32>,
    /// Expected breakpoint ids per line
    pub breakpoints: Option<BTreeMap<String, Vec<String>>>,
    /// Expected error message substring
    pub message_contains: Option<String>,
}

/// Expectations for a command step
#[derive(Deserialize, Debug)]
pub struct CommandExpectation {
    /// Exact line typed into the debugger
    pub sent: Option<String>,
    /// Whether the program was interrupted first
    pub interrupted: Option<bool>,
}
