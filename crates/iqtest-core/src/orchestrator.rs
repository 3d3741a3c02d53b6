//! Sequential app → section → step driver.
//!
//! Exactly one child process is alive at a time. Console banners go to the
//! `console` writer; the child's own output is echoed by the runner.

use std::io::Write;

use anyhow::Result;
use iqtest_domain::Step;
use serde::Serialize;
use tracing::{debug, warn};

use crate::command::BenchCommand;
use crate::plan::Worklist;
use crate::report::{banner, RunSummary, TestResult};
use crate::runner::CommandRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    #[default]
    StopOnFirstError,
    ContinueOnError,
}

/// Results accumulated during one run.
#[derive(Debug, Default)]
pub struct RunState {
    passed: Vec<TestResult>,
    failed: Vec<TestResult>,
    aborted: bool,
}

impl RunState {
    /// Records `result`; returns whether it failed.
    pub fn record(&mut self, result: TestResult, policy: ErrorPolicy) -> bool {
        if result.failed() {
            self.failed.push(result);
            if policy == ErrorPolicy::StopOnFirstError {
                self.aborted = true;
            }
            true
        } else {
            self.passed.push(result);
            false
        }
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    #[must_use]
    pub fn executed(&self) -> usize {
        self.passed.len() + self.failed.len()
    }

    #[must_use]
    pub fn finish(self, worklist: &Worklist) -> RunSummary {
        RunSummary::new(
            self.passed,
            self.failed,
            self.aborted,
            worklist.declared_steps,
            worklist.step_count(),
        )
    }
}

pub struct SuiteRunner<'a> {
    runner: &'a dyn CommandRunner,
    bench: &'a BenchCommand,
    policy: ErrorPolicy,
    stream: bool,
}

impl<'a> SuiteRunner<'a> {
    pub fn new(runner: &'a dyn CommandRunner, bench: &'a BenchCommand, policy: ErrorPolicy) -> Self {
        Self {
            runner,
            bench,
            policy,
            stream: true,
        }
    }

    /// Capture child output without echoing it.
    #[must_use]
    pub fn capture_only(mut self) -> Self {
        self.stream = false;
        self
    }

    /// Executes every step of `worklist` in order, honoring the error policy.
    ///
    /// # Errors
    ///
    /// Returns an error only when writing to `console` fails; step failures
    /// are recorded in the summary.
    pub fn run(&self, worklist: &Worklist, console: &mut dyn Write) -> Result<RunSummary> {
        let mut state = RunState::default();

        for app in &worklist.apps {
            writeln!(
                console,
                "{}",
                banner('=', 80, &format!(" TESTS FOR APP: {} ", app.app.to_uppercase()))
            )?;

            for section in &app.sections {
                writeln!(
                    console,
                    "{}",
                    banner('-', 60, &format!(" SECTION: {} ", section.name))
                )?;

                for step in &section.steps {
                    let result = self.execute_step(&app.app, &section.name, step, console)?;
                    let descriptor = result.step.clone();
                    if state.record(result, self.policy) {
                        writeln!(console, "\n✖ FAILED: {descriptor}")?;
                    } else {
                        writeln!(console, "\n✔ PASSED: {descriptor}")?;
                    }
                    if state.is_aborted() {
                        writeln!(
                            console,
                            "\nStopping tests due to error. Use --continue-on-error to run all tests regardless of failures."
                        )?;
                        break;
                    }
                    writeln!(console, "\n{}", "-".repeat(40))?;
                }

                if state.is_aborted() {
                    break;
                }
            }

            if state.is_aborted() {
                break;
            }
        }

        debug!(
            executed = state.executed(),
            planned = worklist.step_count(),
            aborted = state.is_aborted(),
            "suite finished"
        );
        Ok(state.finish(worklist))
    }

    fn execute_step(
        &self,
        app: &str,
        section: &str,
        step: &Step,
        console: &mut dyn Write,
    ) -> Result<TestResult> {
        let request = self.bench.request(app, step);
        let command = request.display();
        writeln!(console, "\n> EXECUTING: {command}\n")?;
        console.flush()?;
        debug!(app, section, command = %command, "executing step");

        let outcome = if self.stream {
            self.runner
                .run_command_streaming(&request.program, &request.args, self.bench.cwd())
        } else {
            self.runner
                .run_command(&request.program, &request.args, self.bench.cwd())
        };
        let (return_code, output) = match outcome {
            Ok(output) => (output.code, output.combined()),
            Err(err) => {
                let message = format!("{err:#}");
                warn!(app, section, error = %message, "step could not be executed");
                writeln!(console, "{message}")?;
                (-1, message)
            }
        };

        Ok(TestResult {
            app: app.to_string(),
            section: section.to_string(),
            step: request.descriptor,
            command,
            return_code,
            output,
        })
    }
}
