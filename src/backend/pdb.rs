//! PDB specifics
//!
//! pdb drives the target synchronously in its own process, so it never
//! reports a running program: every command ends with a location and a
//! prompt.

use super::{jump, query, terminate};
use crate::common::Result;
use crate::location::LocationResolver;
use crate::parser::{State, TransitionTable};

pub(super) const INITIAL_STATE: State = State::Paused;

pub(super) const STATES: &[State] = &[State::Paused, State::Terminated];

pub(super) const COMMANDS: &[(&str, &str)] = &[
    ("delete_breakpoints", "clear"),
    ("breakpoint", "break"),
    ("finish", "return"),
    ("until {}", "until {}"),
    ("eval {}", "print({})"),
];

const FINISHED: &str = r"[\r\n]The program finished and will be restarted";
const JUMP: &str = r"[\r\n]> ([^(\r\n]+)\((\d+)\)[^(\r\n]*\(\)";
const PROMPT: &str = r"[\r\n]\(Pdb\) $";

/// The restart notice goes first: pdb prints the new entry location right
/// after it, and that location must not swallow the notice.
pub(super) fn table(resolver: &LocationResolver) -> Result<TransitionTable> {
    let mut table = TransitionTable::new();

    table
        .add_rule(State::Paused, FINISHED, terminate)?
        .add_rule(State::Paused, JUMP, jump(resolver, State::Paused))?
        .add_rule(State::Paused, PROMPT, query)?;

    table
        .add_rule(State::Terminated, JUMP, jump(resolver, State::Terminated))?
        .add_rule(State::Terminated, PROMPT, query)?;

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::super::tests::{feed_all, jump_to};
    use super::super::{Backend, BackendKind, BackendOptions};
    use crate::parser::{Event, ParserSession};

    fn parser() -> ParserSession {
        Backend::new(BackendKind::Pdb, &BackendOptions::default())
            .unwrap()
            .parser()
            .unwrap()
    }

    #[test]
    fn test_startup_location_and_prompt() {
        let mut parser = parser();
        assert!(parser.is_paused());

        let events = feed_all(
            &mut parser,
            &["> /src/app.py(1)<module>()\n-> import sys\n", "(Pdb) "],
        );
        assert_eq!(events, vec![jump_to("/src/app.py", 1), Event::ReadyForQuery]);
    }

    #[test]
    fn test_step_into_function() {
        let mut parser = parser();
        let events = parser.feed(b"step\n--Call--\n> /src/lib.py(10)helper()\n-> def helper():\n(Pdb) ");
        assert_eq!(events, vec![jump_to("/src/lib.py", 10), Event::ReadyForQuery]);
    }

    #[test]
    fn test_program_finished_and_restarted() {
        let mut parser = parser();
        let events = parser.feed(
            b"continue\nThe program finished and will be restarted\n\
              > /src/app.py(1)<module>()\n-> import sys\n(Pdb) ",
        );
        assert_eq!(
            events,
            vec![
                Event::Terminated,
                jump_to("/src/app.py", 1),
                Event::ReadyForQuery
            ]
        );
        assert!(parser.is_paused());
    }

    #[test]
    fn test_prompt_not_at_end_is_ignored() {
        let mut parser = parser();
        assert!(parser.feed(b"\n(Pdb) p x\n").is_empty());
    }
}
