//! LLDB specifics

use super::{jump, pause, query, resume, terminate};
use crate::common::Result;
use crate::location::LocationResolver;
use crate::parser::{State, TransitionTable};

pub(super) const INITIAL_STATE: State = State::Running;

pub(super) const STATES: &[State] = &[State::Running, State::Paused, State::Terminated];

/// Breakpoint listing goes through a custom command only the side-channel
/// proxy implements.
pub(super) const COMMANDS: &[(&str, &str)] = &[
    ("delete_breakpoints", "breakpoint delete"),
    ("breakpoint", "b"),
    ("until {}", "thread until {}"),
    ("info breakpoints", "nvim-gdb-info-breakpoints"),
];

const RESUMING: &str = r"Process \d+ resuming";
const LAUNCHED: &str = r"Process \d+ launched";
const STOPPED: &str = r"Process \d+ stopped";
const EXITED: &str = r"Process \d+ exited with status";
// The line number is only complete once a non-digit follows it
const JUMP: &str = r" at ([^:\r\n]+):(\d+)(?P<tail>\D)";
// lldb echoes its prompt twice when driven through the terminal
const PROMPT: &str = r"\s\(lldb\) \(lldb\) $";

/// Rule order per state:
/// - resumption and exit notices before frame locations, since stop reports
///   and backtraces are full of ` at file:line` fragments
/// - the prompt last
pub(super) fn table(resolver: &LocationResolver) -> Result<TransitionTable> {
    let mut table = TransitionTable::new();

    table
        .add_rule(State::Paused, RESUMING, resume)?
        .add_rule(State::Paused, LAUNCHED, resume)?
        .add_rule(State::Paused, EXITED, terminate)?
        .add_rule(State::Paused, JUMP, jump(resolver, State::Paused))?
        .add_rule(State::Paused, PROMPT, query)?;

    table
        .add_rule(State::Running, STOPPED, pause)?
        .add_rule(State::Running, EXITED, terminate)?
        .add_rule(State::Running, PROMPT, query)?;

    table
        .add_rule(State::Terminated, RESUMING, resume)?
        .add_rule(State::Terminated, LAUNCHED, resume)?
        .add_rule(State::Terminated, JUMP, jump(resolver, State::Terminated))?
        .add_rule(State::Terminated, PROMPT, query)?;

    Ok(table)
}
