//! GDB specifics
//!
//! gdb is expected to run with source annotations (`-f`), which mark every
//! stop with `\x1a\x1a<file>:<line>:<column>:...`, and with its prompt set
//! to `\x1a\x1a\x1a`.

use super::{jump, query, resume, terminate};
use crate::common::Result;
use crate::location::LocationResolver;
use crate::parser::{State, TransitionTable};

/// gdb starts executing the target as soon as it is spawned with a program
pub(super) const INITIAL_STATE: State = State::Running;

pub(super) const STATES: &[State] = &[State::Running, State::Paused, State::Terminated];

pub(super) const COMMANDS: &[(&str, &str)] = &[("delete_breakpoints", "delete"), ("breakpoint", "break")];

const CONTINUE: &str = r"[\r\n]Continuing\.";
const START: &str = r"[\r\n]Starting program: ";
const EXITED: &str = r"[\r\n]\[Inferior \d+ \(process \d+\) exited";
const BREAKPOINT: &str = r"[\r\n]Breakpoint \d+";
const JUMP: &str = r"[\r\n]\x1a\x1a([^:\r\n]+):(\d+):\d+";
const PROMPT: &str = r"\x1a\x1a\x1a$";

/// Rule order per state:
/// - resumption notices before the exit notice and the location marker, so a
///   `continue` echoed together with a stale marker still reports running
/// - the exit notice before the location marker, so a stop printed before
///   the program finished doesn't hide the exit
/// - the location marker before the prompt, which always comes last
pub(super) fn table(resolver: &LocationResolver) -> Result<TransitionTable> {
    let mut table = TransitionTable::new();

    table
        .add_rule(State::Paused, CONTINUE, resume)?
        .add_rule(State::Paused, START, resume)?
        .add_rule(State::Paused, EXITED, terminate)?
        .add_rule(State::Paused, JUMP, jump(resolver, State::Paused))?
        .add_rule(State::Paused, PROMPT, query)?;

    table
        .add_rule(State::Running, EXITED, terminate)?
        .add_rule(State::Running, JUMP, jump(resolver, State::Running))?
        .add_rule(State::Running, BREAKPOINT, query)?
        .add_rule(State::Running, PROMPT, query)?;

    table
        .add_rule(State::Terminated, CONTINUE, resume)?
        .add_rule(State::Terminated, START, resume)?
        .add_rule(State::Terminated, JUMP, jump(resolver, State::Terminated))?
        .add_rule(State::Terminated, PROMPT, query)?;

    Ok(table)
}
