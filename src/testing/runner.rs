//! Test runner implementation
//!
//! Replays a scenario against a real [`DebugSession`] wired to a scripted
//! terminal and proxy, and asserts on the structured notifications rather
//! than on rendered output.

use std::collections::VecDeque;
use std::path::Path;

use async_trait::async_trait;
use colored::Colorize;

use crate::backend::{Backend, BackendOptions};
use crate::breakpoint::SideChannel;
use crate::common::{Error, Result};
use crate::location::PathPolicy;
use crate::session::{DebugSession, Terminal};
use crate::sink::{RecordingSink, SinkEvent};

use super::config::{CommandExpectation, EventExpectation, FeedExpectation, TestScenario, TestStep};

/// Result of a test run
#[derive(Debug)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    pub error: Option<String>,
}

/// Terminal that records what the session types
#[derive(Debug, Default)]
struct ScriptedTerminal {
    sent: Vec<String>,
    interrupts: usize,
}

impl Terminal for ScriptedTerminal {
    fn send_line(&mut self, line: &str) -> Result<()> {
        self.sent.push(line.to_string());
        Ok(())
    }

    fn interrupt(&mut self) -> Result<()> {
        self.interrupts += 1;
        Ok(())
    }
}

/// Proxy answering from a queue filled by `respond` steps
#[derive(Debug, Default)]
struct ScriptedProxy {
    responses: VecDeque<Option<String>>,
}

#[async_trait]
impl SideChannel for ScriptedProxy {
    async fn request(&mut self, line: &str) -> Result<Option<String>> {
        tracing::trace!(request = line.trim_end(), "Scripted proxy request");
        Ok(self.responses.pop_front().flatten())
    }
}

type ScenarioSession = DebugSession<ScriptedTerminal, ScriptedProxy, RecordingSink>;

/// Load a scenario from a YAML file
pub fn load_scenario(path: &Path) -> Result<TestScenario> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Run a test scenario from a YAML file
pub async fn run_scenario(path: &Path, verbose: bool) -> Result<TestResult> {
    let scenario = load_scenario(path)?;
    let steps_total = scenario.steps.len();

    println!(
        "\n{} {}",
        "Running Test:".blue().bold(),
        scenario.name.white().bold()
    );
    if let Some(desc) = &scenario.description {
        println!("  {}", desc.dimmed());
    }

    let options = BackendOptions {
        path_policy: match &scenario.base_dir {
            Some(base) => PathPolicy::Absolute { base: base.clone() },
            None => PathPolicy::Verbatim,
        },
        ..BackendOptions::default()
    };
    let backend = Backend::new(scenario.backend, &options)?;
    let mut session = DebugSession::new(
        backend,
        ScriptedTerminal::default(),
        ScriptedProxy::default(),
        RecordingSink::new(),
    )?;

    println!("\n{}", "Steps:".cyan());

    for (i, step) in scenario.steps.iter().enumerate() {
        let step_num = i + 1;
        if let Err(e) = execute_step(&mut session, step, step_num, verbose).await {
            println!("  {} Step {}: {}", "✗".red(), step_num, e);
            return Ok(TestResult {
                name: scenario.name,
                passed: false,
                steps_run: step_num,
                steps_total,
                error: Some(e.to_string()),
            });
        }
    }

    session.end();

    println!(
        "\n{} {}\n",
        "✓".green().bold(),
        "Test Passed".green().bold()
    );

    Ok(TestResult {
        name: scenario.name,
        passed: true,
        steps_run: steps_total,
        steps_total,
        error: None,
    })
}

/// Execute a single test step
async fn execute_step(
    session: &mut ScenarioSession,
    step: &TestStep,
    step_num: usize,
    verbose: bool,
) -> Result<()> {
    match step {
        TestStep::Feed { output, expect } => {
            session.feed(output.as_bytes()).await;
            let events = session.sink_mut().drain();
            if verbose {
                for event in &events {
                    println!("      {}", serde_json::to_string(event)?.dimmed());
                }
            }
            if let Some(exp) = expect {
                check_feed(session, &events, exp)?;
            }
            println!(
                "  {} Step {}: feed ({} event(s), {})",
                "✓".green(),
                step_num,
                events.len(),
                session.state().to_string().dimmed()
            );
        }
        TestStep::Respond { response } => {
            session
                .channel_mut()
                .responses
                .push_back(response.clone());
            println!("  {} Step {}: respond", "✓".green(), step_num);
        }
        TestStep::Toggle { file, line, expect } => {
            let interrupts = session.terminal().interrupts;
            session.toggle_breakpoint(file, *line)?;
            check_command(session, interrupts, expect.as_ref())?;
            println!(
                "  {} Step {}: toggle {}:{}",
                "✓".green(),
                step_num,
                file.display(),
                line
            );
        }
        TestStep::Send {
            command,
            args,
            expect,
        } => {
            let interrupts = session.terminal().interrupts;
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            session.send(command, &args)?;
            check_command(session, interrupts, expect.as_ref())?;
            println!(
                "  {} Step {}: send {}",
                "✓".green(),
                step_num,
                session.last_command().unwrap_or_default().dimmed()
            );
        }
    }
    Ok(())
}

fn check_feed(session: &ScenarioSession, events: &[SinkEvent], exp: &FeedExpectation) -> Result<()> {
    if let Some(expected) = &exp.events {
        if expected.len() != events.len() {
            let names: Vec<String> = events.iter().map(event_name).collect();
            return Err(Error::TestAssertion(format!(
                "Expected {} event(s), got {}: [{}]",
                expected.len(),
                events.len(),
                names.join(", ")
            )));
        }
        for (i, (exp, actual)) in expected.iter().zip(events).enumerate() {
            check_event(exp, actual)
                .map_err(|e| Error::TestAssertion(format!("event {}: {}", i + 1, e)))?;
        }
    }

    if let Some(expected_state) = exp.state {
        if session.state() != expected_state {
            return Err(Error::TestAssertion(format!(
                "Expected state '{}', got '{}'",
                expected_state,
                session.state()
            )));
        }
    }

    Ok(())
}

fn event_name(event: &SinkEvent) -> String {
    serde_json::to_value(event)
        .ok()
        .and_then(|v| v.get("event").and_then(|n| n.as_str()).map(str::to_string))
        .unwrap_or_default()
}

/// Compare one notification through its JSON form, the same shape the
/// `replay` command prints
fn check_event(exp: &EventExpectation, actual: &SinkEvent) -> std::result::Result<(), String> {
    let value = serde_json::to_value(actual).map_err(|e| e.to_string())?;
    let name = value.get("event").and_then(|v| v.as_str()).unwrap_or("");
    if name != exp.event {
        return Err(format!("expected '{}', got '{}'", exp.event, name));
    }

    if let Some(expected_file) = &exp.file {
        let file = value.get("file").and_then(|v| v.as_str()).unwrap_or("");
        if file != expected_file {
            return Err(format!("expected file '{}', got '{}'", expected_file, file));
        }
    }

    if let Some(expected_line) = exp.line {
        let line = value.get("line").and_then(|v| v.as_u64());
        if line != Some(u64::from(expected_line)) {
            return Err(format!("expected line {}, got {:?}", expected_line, line));
        }
    }

    if let Some(expected_breaks) = &exp.breakpoints {
        let SinkEvent::BreakpointsUpdated { breakpoints, .. } = actual else {
            return Err("breakpoints expected on a non-breakpoint event".to_string());
        };
        if breakpoints != expected_breaks {
            return Err(format!(
                "expected breakpoints {:?}, got {:?}",
                expected_breaks, breakpoints
            ));
        }
    }

    if let Some(fragment) = &exp.message_contains {
        let message = value.get("message").and_then(|v| v.as_str()).unwrap_or("");
        if !message.contains(fragment.as_str()) {
            return Err(format!("expected message containing '{}', got '{}'", fragment, message));
        }
    }

    Ok(())
}

fn check_command(
    session: &ScenarioSession,
    interrupts_before: usize,
    expect: Option<&CommandExpectation>,
) -> Result<()> {
    let Some(exp) = expect else {
        return Ok(());
    };

    if let Some(expected) = &exp.sent {
        let sent = session.terminal().sent.last().map_or("", String::as_str);
        if sent != expected {
            return Err(Error::TestAssertion(format!(
                "Expected command '{}', sent '{}'",
                expected, sent
            )));
        }
    }

    if let Some(expected) = exp.interrupted {
        let interrupted = session.terminal().interrupts > interrupts_before;
        if interrupted != expected {
            return Err(Error::TestAssertion(format!(
                "Expected interrupted = {}, got {}",
                expected, interrupted
            )));
        }
    }

    Ok(())
}
