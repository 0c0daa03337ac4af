//! Debugging session: ties the parser, breakpoint queries and the editor
//!
//! One `DebugSession` exists per running debugger. It is fed the terminal
//! output in order, reacts to parser events and translates editor actions
//! into debugger commands.

use std::path::{Path, PathBuf};

use crate::backend::Backend;
use crate::breakpoint::{BreakpointClient, BreakpointsForFile, QueryError, SideChannel};
use crate::common::Result;
use crate::parser::{Event, ParserSession, State};
use crate::sink::EventSink;

/// The terminal the debugger runs in
pub trait Terminal {
    /// Type a line of input into the debugger
    fn send_line(&mut self, line: &str) -> Result<()>;

    /// Interrupt the debugged program (Ctrl-C)
    fn interrupt(&mut self) -> Result<()>;
}

/// State of one debugging session
pub struct DebugSession<T, C, S> {
    backend: Backend,
    parser: ParserSession,
    breakpoints: BreakpointClient<C>,
    terminal: T,
    sink: S,
    /// File whose breakpoints are displayed and re-queried at each prompt
    watched: Option<PathBuf>,
    last_command: Option<String>,
}

impl<T: Terminal, C: SideChannel, S: EventSink> DebugSession<T, C, S> {
    /// Start a session in the backend's initial state
    pub fn new(backend: Backend, terminal: T, channel: C, sink: S) -> Result<Self> {
        let parser = backend.parser()?;
        tracing::info!(backend = %backend.kind(), state = %parser.current_state(), "Debug session started");
        Ok(Self {
            backend,
            parser,
            breakpoints: BreakpointClient::new(channel),
            terminal,
            sink,
            watched: None,
            last_command: None,
        })
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn state(&self) -> State {
        self.parser.current_state()
    }

    pub fn is_running(&self) -> bool {
        self.parser.is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.parser.is_paused()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    /// The side channel used for breakpoint queries and custom commands
    pub fn channel_mut(&mut self) -> &mut C {
        self.breakpoints.channel_mut()
    }

    pub fn watched(&self) -> Option<&Path> {
        self.watched.as_deref()
    }

    /// The last command sent through [`send`](Self::send) or a breakpoint action
    pub fn last_command(&self) -> Option<&str> {
        self.last_command.as_deref()
    }

    /// Breakpoint ids at `line` of `file`
    pub fn breakpoints_at(&self, file: &Path, line: u32) -> &[String] {
        self.breakpoints.lookup(file, line)
    }

    pub fn breakpoints_for(&self, file: &Path) -> Option<&BreakpointsForFile> {
        self.breakpoints.for_file(file)
    }

    /// Feed terminal output, in the order the debugger produced it
    pub async fn feed(&mut self, chunk: &[u8]) {
        for event in self.parser.feed(chunk) {
            match event {
                Event::JumpTo(location) => {
                    self.sink.on_jump(&location);
                    self.watched = Some(location.file);
                }
                Event::ReadyForQuery => self.refresh_breakpoints().await,
                Event::ResumedRunning => self.sink.on_resumed(),
                Event::Terminated => self.sink.on_terminated(),
                Event::Stalled { discarded } => self.sink.on_stalled(discarded),
            }
        }
    }

    /// Show breakpoints of `file` from now on
    pub async fn watch(&mut self, file: impl Into<PathBuf>) {
        self.watched = Some(file.into());
        self.refresh_breakpoints().await;
    }

    /// Re-query the breakpoints of the watched file, if any
    pub async fn refresh_breakpoints(&mut self) {
        let Some(file) = self.watched.clone() else {
            return;
        };

        match self.breakpoints.query(&file).await {
            Ok(breaks) => self.sink.on_breakpoints_updated(&file, &breaks),
            Err(QueryError::Reported(message)) => {
                tracing::warn!(file = %file.display(), %message, "Debugger refused breakpoint query");
                self.sink.on_query_error(&file, &message);
            }
            Err(QueryError::Malformed(_)) => {
                self.sink
                    .on_breakpoints_updated(&file, &BreakpointsForFile::new());
            }
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "Breakpoint query failed, keeping previous breakpoints");
            }
        }
    }

    /// Send a logical command, translated for the backend
    #[tracing::instrument(skip(self))]
    pub fn send(&mut self, command: &str, args: &[&str]) -> Result<()> {
        let line = self.backend.format_command(command, args)?;
        self.send_line(line)
    }

    pub fn interrupt(&mut self) -> Result<()> {
        self.terminal.interrupt()
    }

    /// Toggle a breakpoint at `line` of `file`
    ///
    /// Deletes the most recently set breakpoint on that line if there is one,
    /// otherwise sets a new one. A running program is interrupted first.
    #[tracing::instrument(skip(self, file), fields(file = %file.display()))]
    pub fn toggle_breakpoint(&mut self, file: &Path, line: u32) -> Result<()> {
        if self.parser.is_running() {
            self.terminal.interrupt()?;
        }
        self.watched = Some(file.to_path_buf());

        let command = match self.breakpoints.lookup(file, line).last() {
            Some(id) => format!("{} {}", self.backend.translate_command("delete_breakpoints"), id),
            None => format!(
                "{} {}:{}",
                self.backend.translate_command("breakpoint"),
                file.display(),
                line
            ),
        };
        self.send_line(command)
    }

    /// Delete every breakpoint; the signs follow at the next prompt
    pub fn clear_all_breakpoints(&mut self) -> Result<()> {
        if self.parser.is_running() {
            self.terminal.interrupt()?;
        }
        self.send("delete_breakpoints", &[])
    }

    /// Run a debugger command through the side channel and return its output
    pub async fn custom_command(&mut self, command: &str) -> Result<Option<String>> {
        self.breakpoints
            .channel_mut()
            .request(&format!("handle-command {}", command))
            .await
    }

    /// Finish the session, forgetting all breakpoint state
    pub fn end(&mut self) {
        tracing::info!(backend = %self.backend.kind(), "Debug session ended");
        self.breakpoints.reset();
        self.watched = None;
    }

    fn send_line(&mut self, line: String) -> Result<()> {
        tracing::debug!(%line, "Sending command");
        self.terminal.send_line(&line)?;
        self.last_command = Some(line);
        Ok(())
    }
}
