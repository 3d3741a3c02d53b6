//! Builds the `bench run-tests` invocation for a step.

use std::path::{Path, PathBuf};

use iqtest_domain::Step;
use serde::Serialize;

/// Trailing flag that stops the runner from generating test-record fixtures.
pub const SKIP_TEST_RECORDS: &str = "--skip-test-records";

/// Program, site and working directory shared by every step of a run.
#[derive(Debug, Clone)]
pub struct BenchCommand {
    program: String,
    site: String,
    cwd: PathBuf,
}

impl BenchCommand {
    pub fn new(program: impl Into<String>, site: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            site: site.into(),
            cwd: cwd.into(),
        }
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn site(&self) -> &str {
        &self.site
    }

    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Builds the request for `step` of `app`.
    #[must_use]
    pub fn request(&self, app: &str, step: &Step) -> ExecutionRequest {
        let mut args = vec![
            "--site".to_string(),
            self.site.clone(),
            "run-tests".to_string(),
            "--app".to_string(),
            app.to_string(),
        ];
        let descriptor = match step {
            Step::RecordType { doctype } => {
                args.push("--doctype".to_string());
                args.push(doctype.clone());
                format!("DocType: {doctype}")
            }
            Step::Module { module, tests } => {
                args.push("--module".to_string());
                args.push(module.clone());
                let mut descriptor = format!("Module: {module}");
                for test in tests.iter().flatten() {
                    args.push("--test".to_string());
                    args.push(test.clone());
                    descriptor.push_str(", Test: ");
                    descriptor.push_str(test);
                }
                descriptor
            }
        };
        args.push(SKIP_TEST_RECORDS.to_string());

        ExecutionRequest {
            program: self.program.clone(),
            args,
            descriptor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionRequest {
    pub program: String,
    pub args: Vec<String>,
    /// Human-readable label used in reports only.
    pub descriptor: String,
}

impl ExecutionRequest {
    /// Shell-like rendering of the invocation for display.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote_arg)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote_arg(arg: &str) -> String {
    let needs_quotes =
        arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\' | '$' | '`'));
    if !needs_quotes {
        return arg.to_string();
    }
    let escaped = arg
        .chars()
        .fold(String::with_capacity(arg.len() + 2), |mut out, c| {
            if matches!(c, '"' | '\\' | '$' | '`') {
                out.push('\\');
            }
            out.push(c);
            out
        });
    format!("\"{escaped}\"")
}
