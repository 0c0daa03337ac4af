//! Parser engine: feeds terminal output through the active transition table

use std::sync::Arc;

use super::{Event, State, TransitionTable};
use crate::common::{Error, Result};

/// Bounds on text buffered while no rule matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLimits {
    /// Trim once the unmatched buffer grows past this many bytes
    pub max_bytes: usize,
    /// Bytes kept from the end of the buffer after a trim
    pub keep_tail: usize,
}

impl Default for BufferLimits {
    fn default() -> Self {
        Self {
            max_bytes: 64 * 1024,
            keep_tail: 4 * 1024,
        }
    }
}

/// Parser state for one debugging session
///
/// Owns the current state and the text that hasn't been consumed by a rule
/// yet. Output may arrive split at arbitrary points, so unmatched text stays
/// buffered until a later chunk completes a pattern.
#[derive(Debug)]
pub struct ParserSession {
    table: Arc<TransitionTable>,
    state: State,
    buffer: String,
    /// Trailing bytes of an incomplete UTF-8 sequence
    pending: Vec<u8>,
    limits: BufferLimits,
}

impl ParserSession {
    /// Create a session starting in `initial`
    ///
    /// Fails if `initial` has no outgoing rule, since such a session could
    /// never react to any output.
    pub fn new(table: Arc<TransitionTable>, initial: State, limits: BufferLimits) -> Result<Self> {
        if table.rules_for(initial).is_empty() {
            return Err(Error::InvariantViolation { state: initial });
        }
        Ok(Self {
            table,
            state: initial,
            // Lets line-anchored patterns match the very first line
            buffer: String::from("\n"),
            pending: Vec::new(),
            limits,
        })
    }

    pub fn current_state(&self) -> State {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state == State::Paused
    }

    pub fn is_terminated(&self) -> bool {
        self.state == State::Terminated
    }

    /// Text received but not yet consumed by any rule
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Feed a chunk of raw terminal output, returning the events it produced
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Event> {
        self.decode(chunk);

        let mut events = Vec::new();
        let table = Arc::clone(&self.table);

        loop {
            let rules = table.rules_for(self.state);
            if rules.is_empty() {
                tracing::error!(state = %self.state, "No rules for current state, output is ignored");
                break;
            }

            let Some((index, end, transition)) = rules.iter().enumerate().find_map(|(i, rule)| {
                rule.pattern()
                    .captures(&self.buffer)
                    .map(|caps| (i, rule.consumed_end(&caps), rule.apply(&caps)))
            }) else {
                break;
            };

            tracing::debug!(
                from = %self.state,
                to = %transition.next,
                rule = index,
                event = transition.event.as_ref().map(Event::name),
                "Transition"
            );

            self.buffer.drain(..end);
            self.state = transition.next;
            events.extend(transition.event);

            if end == 0 {
                tracing::warn!(rule = index, "Rule matched without consuming output");
                break;
            }
        }

        if let Some(discarded) = self.trim() {
            events.push(Event::Stalled { discarded });
        }

        events
    }

    /// Append a chunk to the buffer, holding back an incomplete UTF-8 tail
    fn decode(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        let cut = incomplete_tail_start(&self.pending);
        let tail = self.pending.split_off(cut);
        self.buffer.push_str(&String::from_utf8_lossy(&self.pending));
        self.pending = tail;
    }

    /// Drop the front of an oversized buffer, returning the bytes discarded
    fn trim(&mut self) -> Option<usize> {
        if self.buffer.len() <= self.limits.max_bytes {
            return None;
        }

        let mut cut = self.buffer.len().saturating_sub(self.limits.keep_tail);
        while !self.buffer.is_char_boundary(cut) {
            cut += 1;
        }
        self.buffer.drain(..cut);

        tracing::warn!(
            state = %self.state,
            discarded = cut,
            "No recognizable debugger output, discarding buffered text"
        );
        Some(cut)
    }
}

/// Index where a trailing, not yet complete UTF-8 sequence starts
fn incomplete_tail_start(bytes: &[u8]) -> usize {
    let len = bytes.len();
    for back in 1..=len.min(3) {
        let i = len - back;
        let byte = bytes[i];
        if byte & 0xC0 == 0x80 {
            // continuation byte, keep looking for the lead byte
            continue;
        }
        let width = match byte {
            b if b & 0xE0 == 0xC0 => 2,
            b if b & 0xF0 == 0xE0 => 3,
            b if b & 0xF8 == 0xF0 => 4,
            _ => 1,
        };
        return if back < width { i } else { len };
    }
    len
}
