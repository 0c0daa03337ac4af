//! dbgscrape - structured events from interactive debugger output
//!
//! Terminal output of gdb, lldb, pdb or bashdb is fed to a per-backend state
//! machine that reports where the program stopped, when it resumed or
//! exited, and when the debugger is ready to be asked for breakpoints.

pub mod backend;
pub mod breakpoint;
pub mod cli;
pub mod commands;
pub mod common;
pub mod location;
pub mod parser;
pub mod session;
pub mod sink;
pub mod testing;

// Re-export commonly used types for tests
pub use backend::{Backend, BackendKind, BackendOptions};
pub use common::{Error, Result};
pub use location::{Location, PathPolicy};
pub use parser::{Event, ParserSession, State};
pub use session::{DebugSession, Terminal};
