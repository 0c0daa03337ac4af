//! Debugger backends
//!
//! Each supported debugger contributes a transition table, an initial state
//! and a command translation map. The set of backends is closed and chosen
//! at runtime through [`BackendKind`].

mod bashdb;
mod gdb;
mod lldb;
mod pdb;

use std::str::FromStr;
use std::sync::Arc;

use regex::Captures;
use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};
use crate::location::{LocationResolver, PathPolicy};
use crate::parser::{BufferLimits, Event, ParserSession, State, Transition, TransitionTable};

/// Supported debuggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Gdb,
    Lldb,
    Pdb,
    Bashdb,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [Self::Gdb, Self::Lldb, Self::Pdb, Self::Bashdb];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Gdb => "gdb",
            Self::Lldb => "lldb",
            Self::Pdb => "pdb",
            Self::Bashdb => "bashdb",
        }
    }

    /// Whether jump locations must be normalized to absolute paths by default
    ///
    /// lldb only reports breakpoints against full paths, and bashdb prints
    /// script names relative to where it was started.
    pub fn requires_absolute_paths(&self) -> bool {
        matches!(self, Self::Lldb | Self::Bashdb)
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| Error::UnknownBackend(s.to_string()))
    }
}

/// Construction-time parameters for a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendOptions {
    pub path_policy: PathPolicy,
    pub limits: BufferLimits,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            path_policy: PathPolicy::Verbatim,
            limits: BufferLimits::default(),
        }
    }
}

/// A fully constructed backend
#[derive(Debug, Clone)]
pub struct Backend {
    kind: BackendKind,
    table: Arc<TransitionTable>,
    initial: State,
    commands: &'static [(&'static str, &'static str)],
    limits: BufferLimits,
}

impl Backend {
    /// Build the backend's transition table and command map
    pub fn new(kind: BackendKind, options: &BackendOptions) -> Result<Self> {
        let resolver = LocationResolver::new(options.path_policy.clone());

        let (table, initial, states, commands) = match kind {
            BackendKind::Gdb => (gdb::table(&resolver)?, gdb::INITIAL_STATE, gdb::STATES, gdb::COMMANDS),
            BackendKind::Lldb => (
                lldb::table(&resolver)?,
                lldb::INITIAL_STATE,
                lldb::STATES,
                lldb::COMMANDS,
            ),
            BackendKind::Pdb => (pdb::table(&resolver)?, pdb::INITIAL_STATE, pdb::STATES, pdb::COMMANDS),
            BackendKind::Bashdb => (
                bashdb::table(&resolver)?,
                bashdb::INITIAL_STATE,
                bashdb::STATES,
                bashdb::COMMANDS,
            ),
        };

        if let Some(state) = table.states_without_rules(states).into_iter().next() {
            return Err(Error::InvariantViolation { state });
        }

        tracing::debug!(backend = %kind, initial = %initial, "Backend constructed");

        Ok(Self {
            kind,
            table: Arc::new(table),
            initial,
            commands,
            limits: options.limits,
        })
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn initial_state(&self) -> State {
        self.initial
    }

    /// Start a fresh parser for a new debugging session
    pub fn parser(&self) -> Result<ParserSession> {
        ParserSession::new(Arc::clone(&self.table), self.initial, self.limits)
    }

    /// Map a logical command name to the backend's syntax
    ///
    /// Names without a backend-specific spelling are returned unchanged.
    pub fn translate_command<'a>(&self, logical: &'a str) -> &'a str {
        self.commands
            .iter()
            .find(|(name, _)| *name == logical)
            .map_or(logical, |(_, concrete)| concrete)
    }

    /// Translate a logical command and fill its `{}` placeholders in order
    pub fn format_command(&self, logical: &str, args: &[&str]) -> Result<String> {
        let template = self.translate_command(logical);
        substitute(template, args)
            .ok_or_else(|| Error::missing_argument(logical, placeholders(template), args.len()))
    }
}

fn placeholders(template: &str) -> usize {
    template.matches("{}").count()
}

/// Replace each `{}` in `template` with the next argument; extra arguments
/// are ignored, missing ones yield `None`
fn substitute(template: &str, args: &[&str]) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut rest = template;
    while let Some(pos) = rest.find("{}") {
        out.push_str(&rest[..pos]);
        out.push_str(args.next()?);
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    Some(out)
}

// Shared handlers. Each is a pure function of the match; the parser engine
// applies the returned transition.

/// Program stopped at a location printed in capture groups 1 and 2
///
/// An undecodable location drops the jump and keeps the parser in `from`.
fn jump(resolver: &LocationResolver, from: State) -> impl Fn(&Captures<'_>) -> Transition + Send + Sync + 'static {
    let resolver = resolver.clone();
    move |captures: &Captures<'_>| match resolver.from_captures(captures) {
        Ok(location) => Transition::emit(State::Paused, Event::JumpTo(location)),
        Err(e) => {
            tracing::warn!(error = %e, matched = ?captures.get(0).map(|m| m.as_str()), "Dropping jump");
            Transition::to(from)
        }
    }
}

/// Debugger is waiting for input: refresh breakpoints
fn query(_: &Captures<'_>) -> Transition {
    Transition::emit(State::Paused, Event::ReadyForQuery)
}

/// Program stopped without a location of its own
fn pause(_: &Captures<'_>) -> Transition {
    Transition::to(State::Paused)
}

fn resume(_: &Captures<'_>) -> Transition {
    Transition::emit(State::Running, Event::ResumedRunning)
}

fn terminate(_: &Captures<'_>) -> Transition {
    Transition::emit(State::Terminated, Event::Terminated)
}
