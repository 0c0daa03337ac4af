//! Scenario test runner
//!
//! Reads YAML scenarios of recorded debugger output and replays them through
//! a debugging session, asserting on the notifications it produces.

mod config;
mod runner;

pub use config::*;
pub use runner::{load_scenario, run_scenario, TestResult};
