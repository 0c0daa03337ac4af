//! BashDB specifics

use super::{jump, query, terminate};
use crate::common::Result;
use crate::location::LocationResolver;
use crate::parser::{State, TransitionTable};

pub(super) const INITIAL_STATE: State = State::Paused;

pub(super) const STATES: &[State] = &[State::Paused, State::Terminated];

pub(super) const COMMANDS: &[(&str, &str)] = &[
    ("delete_breakpoints", "delete"),
    ("breakpoint", "break"),
    ("frame", "frame 0"),
];

const TERMINATED: &str = r"[\r\n]Debugged program terminated ";
// The location line must be complete; its line break stays buffered
const JUMP: &str = r"[\r\n]\(([^:\r\n]+):(\d+)\):(?P<tail>[\r\n])";
const PROMPT: &str = r"[\r\n]bashdb<\(?\d+\)?> $";

/// The termination notice outranks everything: once the script is gone, an
/// older location in the same output is stale, and a prompt match would
/// consume the notice.
pub(super) fn table(resolver: &LocationResolver) -> Result<TransitionTable> {
    let mut table = TransitionTable::new();

    table
        .add_rule(State::Paused, TERMINATED, terminate)?
        .add_rule(State::Paused, JUMP, jump(resolver, State::Paused))?
        .add_rule(State::Paused, PROMPT, query)?;

    table
        .add_rule(State::Terminated, JUMP, jump(resolver, State::Terminated))?
        .add_rule(State::Terminated, PROMPT, query)?;

    Ok(table)
}
