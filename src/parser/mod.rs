//! Output-driven debugger state machine
//!
//! A [`TransitionTable`] maps each [`State`] to an ordered list of rules.
//! A [`ParserSession`] accumulates raw terminal output and applies the first
//! matching rule of the current state, producing [`Event`]s.

mod engine;
mod table;

pub use engine::{BufferLimits, ParserSession};
pub use table::{Handler, Rule, TransitionTable, TAIL_GROUP};

use serde::{Deserialize, Serialize};

use crate::location::Location;

/// Execution state inferred from debugger output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// The debugged program is executing
    Running,
    /// The debugger is waiting for input with the program stopped
    Paused,
    /// The program exited; the debugger itself is still interactive
    Terminated,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

/// Structured event emitted by the parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// The program stopped at a known source location
    JumpTo(Location),
    /// The debugger printed its prompt; breakpoints should be re-queried
    ReadyForQuery,
    /// The program resumed execution
    ResumedRunning,
    /// The program exited
    Terminated,
    /// No rule matched for too long and buffered output was discarded
    Stalled { discarded: usize },
}

impl Event {
    /// Stable name used in JSON output and scenario files
    pub fn name(&self) -> &'static str {
        match self {
            Self::JumpTo(_) => "jump_to",
            Self::ReadyForQuery => "ready_for_query",
            Self::ResumedRunning => "resumed_running",
            Self::Terminated => "terminated",
            Self::Stalled { .. } => "stalled",
        }
    }
}

/// Outcome of a rule handler: the next state and an optional event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: State,
    pub event: Option<Event>,
}

impl Transition {
    /// Move to `next` without emitting anything
    pub fn to(next: State) -> Self {
        Self { next, event: None }
    }

    /// Move to `next` and emit `event`
    pub fn emit(next: State, event: Event) -> Self {
        Self {
            next,
            event: Some(event),
        }
    }
}
