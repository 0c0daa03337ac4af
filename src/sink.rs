//! Event sink consumed by the editor integration layer

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::breakpoint::BreakpointsForFile;
use crate::location::Location;

/// Receiver of everything a debugging session observes
pub trait EventSink {
    /// The program stopped at `location`
    fn on_jump(&mut self, location: &Location);

    /// The program resumed execution
    fn on_resumed(&mut self);

    /// The program exited
    fn on_terminated(&mut self);

    /// Fresh breakpoints for `file` (replaces what was shown before)
    fn on_breakpoints_updated(&mut self, file: &Path, breakpoints: &BreakpointsForFile);

    /// The debugger refused to list breakpoints for `file`
    fn on_query_error(&mut self, file: &Path, message: &str);

    /// Unrecognized output was discarded
    fn on_stalled(&mut self, _discarded: usize) {}
}

/// Owned form of a sink notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SinkEvent {
    Jump(Location),
    Resumed,
    Terminated,
    BreakpointsUpdated {
        file: PathBuf,
        breakpoints: BreakpointsForFile,
    },
    QueryError {
        file: PathBuf,
        message: String,
    },
    Stalled {
        discarded: usize,
    },
}

/// Sinks that only need the owned [`SinkEvent`] form
///
/// Every `Record` implementor is an [`EventSink`].
pub trait Record {
    fn record(&mut self, event: SinkEvent);
}

impl<R: Record> EventSink for R {
    fn on_jump(&mut self, location: &Location) {
        self.record(SinkEvent::Jump(location.clone()));
    }

    fn on_resumed(&mut self) {
        self.record(SinkEvent::Resumed);
    }

    fn on_terminated(&mut self) {
        self.record(SinkEvent::Terminated);
    }

    fn on_breakpoints_updated(&mut self, file: &Path, breakpoints: &BreakpointsForFile) {
        self.record(SinkEvent::BreakpointsUpdated {
            file: file.to_path_buf(),
            breakpoints: breakpoints.clone(),
        });
    }

    fn on_query_error(&mut self, file: &Path, message: &str) {
        self.record(SinkEvent::QueryError {
            file: file.to_path_buf(),
            message: message.to_string(),
        });
    }

    fn on_stalled(&mut self, discarded: usize) {
        self.record(SinkEvent::Stalled { discarded });
    }
}

/// Keeps every notification in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<SinkEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the events recorded so far
    pub fn drain(&mut self) -> Vec<SinkEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Record for RecordingSink {
    fn record(&mut self, event: SinkEvent) {
        self.events.push(event);
    }
}

/// Writes one JSON object per notification
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Record for JsonLinesSink<W> {
    fn record(&mut self, event: SinkEvent) {
        let result = serde_json::to_writer(&mut self.writer, &event)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(self.writer))
            .and_then(|()| self.writer.flush());
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to write event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_order() {
        let mut sink = RecordingSink::new();
        sink.on_resumed();
        sink.on_terminated();
        sink.on_stalled(3);

        assert_eq!(
            sink.drain(),
            vec![
                SinkEvent::Resumed,
                SinkEvent::Terminated,
                SinkEvent::Stalled { discarded: 3 }
            ]
        );
        assert!(sink.events.is_empty());
    }

    #[test]
    fn test_json_lines_sink() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.on_jump(&Location {
            file: PathBuf::from("/src/a.c"),
            line: 4,
        });
        let mut breaks = BreakpointsForFile::new();
        breaks.insert("4".to_string(), vec!["1".to_string()]);
        sink.on_breakpoints_updated(Path::new("/src/a.c"), &breaks);
        sink.on_query_error(Path::new("/src/a.c"), "no symbol table");

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(
            lines,
            vec![
                serde_json::json!({"event": "jump", "file": "/src/a.c", "line": 4}),
                serde_json::json!({
                    "event": "breakpoints_updated",
                    "file": "/src/a.c",
                    "breakpoints": {"4": ["1"]}
                }),
                serde_json::json!({
                    "event": "query_error",
                    "file": "/src/a.c",
                    "message": "no symbol table"
                }),
            ]
        );
    }
}
