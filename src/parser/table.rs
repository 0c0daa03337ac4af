//! Ordered (state, pattern, handler) rules

use std::collections::HashMap;
use std::fmt;

use regex::{Captures, Regex};

use super::{State, Transition};
use crate::common::Result;

/// Name of the optional capture group marking trailing context
///
/// Text matched by `(?P<tail>...)` must be present for the rule to fire but
/// is left in the buffer, so the next rule can still see it.
pub const TAIL_GROUP: &str = "tail";

/// Rule handler: a pure function from the match to the next transition
pub type Handler = Box<dyn Fn(&Captures<'_>) -> Transition + Send + Sync>;

/// A single rule of a transition table
pub struct Rule {
    pattern: Regex,
    handler: Handler,
}

impl Rule {
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Invoke the handler for a match of this rule's pattern
    pub fn apply(&self, captures: &Captures<'_>) -> Transition {
        (self.handler)(captures)
    }

    /// Byte offset up to which the buffer is consumed for this match
    pub fn consumed_end(&self, captures: &Captures<'_>) -> usize {
        match captures.name(TAIL_GROUP) {
            Some(tail) => tail.start(),
            None => captures.get(0).map_or(0, |m| m.end()),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

/// Mapping from state to its ordered rules
///
/// Rules are tried in the order they were added and the first match wins,
/// so construction order encodes precedence. Tables are built once and
/// shared read-only afterwards.
#[derive(Debug, Default)]
pub struct TransitionTable {
    rules: HashMap<State, Vec<Rule>>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule to `state`'s ordered list
    pub fn add_rule<F>(&mut self, state: State, pattern: &str, handler: F) -> Result<&mut Self>
    where
        F: Fn(&Captures<'_>) -> Transition + Send + Sync + 'static,
    {
        let pattern = Regex::new(pattern)?;
        self.rules.entry(state).or_default().push(Rule {
            pattern,
            handler: Box::new(handler),
        });
        Ok(self)
    }

    /// Rules for `state` in precedence order (empty if none)
    pub fn rules_for(&self, state: State) -> &[Rule] {
        self.rules.get(&state).map_or(&[], Vec::as_slice)
    }

    /// States from `states` that have no outgoing rule
    pub fn states_without_rules(&self, states: &[State]) -> Vec<State> {
        states
            .iter()
            .copied()
            .filter(|state| self.rules_for(*state).is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Event;

    #[test]
    fn test_rules_keep_declaration_order() {
        let mut table = TransitionTable::new();
        table
            .add_rule(State::Paused, "first", |_| Transition::to(State::Running))
            .unwrap()
            .add_rule(State::Paused, "second", |_| Transition::to(State::Paused))
            .unwrap();

        let patterns: Vec<&str> = table
            .rules_for(State::Paused)
            .iter()
            .map(|r| r.pattern().as_str())
            .collect();
        assert_eq!(patterns, vec!["first", "second"]);
        assert!(table.rules_for(State::Running).is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let mut table = TransitionTable::new();
        assert!(table
            .add_rule(State::Paused, "(unclosed", |_| Transition::to(State::Paused))
            .is_err());
    }

    #[test]
    fn test_tail_group_limits_consumption() {
        let mut table = TransitionTable::new();
        table
            .add_rule(State::Paused, r"line (\d+)(?P<tail>\D)", |_| {
                Transition::emit(State::Paused, Event::ReadyForQuery)
            })
            .unwrap();

        let rule = &table.rules_for(State::Paused)[0];
        let text = "line 42\nnext";
        let caps = rule.pattern().captures(text).unwrap();
        assert_eq!(rule.consumed_end(&caps), "line 42".len());
    }

    #[test]
    fn test_states_without_rules() {
        let mut table = TransitionTable::new();
        table
            .add_rule(State::Paused, "x", |_| Transition::to(State::Paused))
            .unwrap();
        assert_eq!(
            table.states_without_rules(&[State::Paused, State::Running]),
            vec![State::Running]
        );
    }
}
