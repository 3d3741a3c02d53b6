use std::fmt::{self, Write as _};

use serde::Serialize;

use crate::classify;

const MAX_FAILURE_LINES: usize = 5;

/// One executed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestResult {
    pub app: String,
    pub section: String,
    /// Step descriptor, e.g. `Module: acme.tests, Test: test_vat`.
    pub step: String,
    pub command: String,
    pub return_code: i32,
    /// Stdout followed by stderr.
    pub output: String,
}

impl TestResult {
    #[must_use]
    pub fn failed(&self) -> bool {
        classify::is_failure(self.return_code, &self.output)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Passed,
    Failed,
    /// Apps declared steps but the filters left none.
    NoTestsMatched,
    /// No installed app declares any step.
    NoTestsDeclared,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub status: RunStatus,
    pub aborted: bool,
    pub declared_steps: usize,
    pub planned_steps: usize,
    pub passed: Vec<TestResult>,
    pub failed: Vec<TestResult>,
}

impl RunSummary {
    pub(crate) fn new(
        passed: Vec<TestResult>,
        failed: Vec<TestResult>,
        aborted: bool,
        declared_steps: usize,
        planned_steps: usize,
    ) -> Self {
        let status = if !failed.is_empty() {
            RunStatus::Failed
        } else if !passed.is_empty() {
            RunStatus::Passed
        } else if declared_steps > 0 {
            RunStatus::NoTestsMatched
        } else {
            RunStatus::NoTestsDeclared
        };
        Self {
            status,
            aborted,
            declared_steps,
            planned_steps,
            passed,
            failed,
        }
    }

    #[must_use]
    pub fn executed(&self) -> usize {
        self.passed.len() + self.failed.len()
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.status {
            RunStatus::Failed => 1,
            RunStatus::Passed | RunStatus::NoTestsMatched | RunStatus::NoTestsDeclared => 0,
        }
    }

    /// Closing one-line verdict.
    #[must_use]
    pub fn verdict(&self) -> String {
        match self.status {
            RunStatus::Failed => "Some tests failed. See above for details.".to_string(),
            RunStatus::Passed => format!("All {} tests passed successfully!", self.passed.len()),
            RunStatus::NoTestsMatched => "No tests were run!".to_string(),
            RunStatus::NoTestsDeclared => "No installed application declares tests.".to_string(),
        }
    }
}

/// Title centered between two rulers of `fill`.
pub(crate) fn banner(fill: char, width: usize, title: &str) -> String {
    let ruler: String = std::iter::repeat(fill).take(width).collect();
    format!("\n{ruler}\n{title:^width$}\n{ruler}")
}

/// Renders the summary block printed at the end of a run, without the
/// closing verdict line.
#[must_use]
pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_summary(&mut out, summary);
    out
}

fn write_summary(out: &mut String, summary: &RunSummary) -> fmt::Result {
    writeln!(out, "{}", banner('=', 100, " TEST RESULTS SUMMARY "))?;

    if !summary.passed.is_empty() {
        writeln!(out, "\n✔ PASSED TEST UNITS: {}", summary.passed.len())?;
        for (index, result) in summary.passed.iter().enumerate() {
            writeln!(
                out,
                "  {}. App: {}, Section: {}, {}",
                index + 1,
                result.app,
                result.section,
                result.step
            )?;
        }
    }

    if !summary.failed.is_empty() {
        writeln!(out, "\n✖ FAILED TESTS: {}", summary.failed.len())?;
        for (index, result) in summary.failed.iter().enumerate() {
            writeln!(
                out,
                "  {}. App: {}, Section: {}, {}",
                index + 1,
                result.app,
                result.section,
                result.step
            )?;
            writeln!(out, "     Command: {}", result.command)?;
            writeln!(out, "     Return Code: {}", result.return_code)?;

            let lines = classify::failure_lines(&result.output);
            if !lines.is_empty() {
                writeln!(out, "\n     Failure details:")?;
                for line in lines.iter().take(MAX_FAILURE_LINES) {
                    writeln!(out, "       {}", line.trim())?;
                }
                if lines.len() > MAX_FAILURE_LINES {
                    writeln!(
                        out,
                        "       ... and {} more error lines",
                        lines.len() - MAX_FAILURE_LINES
                    )?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(step: &str, code: i32, output: &str) -> TestResult {
        TestResult {
            app: "acme".into(),
            section: "Core".into(),
            step: step.into(),
            command: format!("bench --site s run-tests --app acme --module {step} --skip-test-records"),
            return_code: code,
            output: output.into(),
        }
    }

    #[test]
    fn status_and_exit_code() {
        let passed = RunSummary::new(vec![result("m1", 0, "ok")], Vec::new(), false, 1, 1);
        assert_eq!(passed.status, RunStatus::Passed);
        assert_eq!(passed.exit_code(), 0);

        let failed = RunSummary::new(
            vec![result("m1", 0, "ok")],
            vec![result("m2", 1, "")],
            true,
            3,
            3,
        );
        assert_eq!(failed.status, RunStatus::Failed);
        assert_eq!(failed.exit_code(), 1);
        assert_eq!(failed.executed(), 2);

        let filtered = RunSummary::new(Vec::new(), Vec::new(), false, 4, 0);
        assert_eq!(filtered.status, RunStatus::NoTestsMatched);
        assert_eq!(filtered.exit_code(), 0);
        assert_eq!(filtered.verdict(), "No tests were run!");

        let none = RunSummary::new(Vec::new(), Vec::new(), false, 0, 0);
        assert_eq!(none.status, RunStatus::NoTestsDeclared);
        assert_eq!(none.exit_code(), 0);
    }

    #[test]
    fn failed_entries_show_at_most_five_marker_lines() {
        let output = (1..=7)
            .map(|i| format!("  FAIL: test_{i}"))
            .chain(std::iter::once("plain line".to_string()))
            .collect::<Vec<_>>()
            .join("\n");
        let summary = RunSummary::new(Vec::new(), vec![result("m1", 1, &output)], true, 1, 1);
        let text = render_summary(&summary);
        assert!(text.contains("TEST RESULTS SUMMARY"));
        assert!(text.contains("✖ FAILED TESTS: 1"));
        assert!(text.contains("  1. App: acme, Section: Core, m1"));
        assert!(text.contains("     Return Code: 1"));
        assert!(text.contains("       FAIL: test_5\n"));
        assert!(!text.contains("FAIL: test_6"));
        assert!(text.contains("       ... and 2 more error lines"));
        assert!(!text.contains("plain line"));
    }

    #[test]
    fn passed_entries_are_numbered_in_order() {
        let summary = RunSummary::new(
            vec![result("m1", 0, ""), result("m2", 0, "")],
            Vec::new(),
            false,
            2,
            2,
        );
        let text = render_summary(&summary);
        let first = text.find("1. App: acme, Section: Core, m1").unwrap();
        let second = text.find("2. App: acme, Section: Core, m2").unwrap();
        assert!(first < second);
        assert!(!text.contains("FAILED TESTS"));
    }

    #[test]
    fn banner_centers_title() {
        assert_eq!(banner('-', 10, "ab"), "\n----------\n    ab    \n----------");
    }
}
