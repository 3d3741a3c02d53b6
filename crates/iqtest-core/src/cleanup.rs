//! Release-cleanup tasks declared by installed apps.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use iqtest_domain::{CleanupAction, CleanupTask};
use serde::Serialize;
use tracing::{debug, warn};

use crate::runner::CommandRunner;
use crate::source::HookSource;

/// A cleanup task together with the app that declared it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupEntry {
    pub app: String,
    pub task: CleanupTask,
}

/// Collects cleanup tasks from every installed app in enumeration order.
pub fn collect_cleanup_tasks(source: &dyn HookSource) -> Result<Vec<CleanupEntry>> {
    let mut entries = Vec::new();
    for app in source.installed_apps()? {
        match source.app_hooks(&app) {
            Ok(Some(hooks)) => entries.extend(hooks.cleanup.into_iter().map(|task| CleanupEntry {
                app: app.clone(),
                task,
            })),
            Ok(None) => {}
            Err(err) => warn!(app = %app, error = %format!("{err:#}"), "skipping app with unreadable hooks"),
        }
    }
    Ok(entries)
}

/// True when docker is unavailable, which is the case inside an image build.
#[must_use]
pub fn inside_image_build() -> bool {
    which::which("docker").is_err()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CleanupOutcome {
    Succeeded,
    Failed { return_code: i32, output: String },
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupRecord {
    pub app: String,
    pub task: CleanupTask,
    pub outcome: CleanupOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub records: Vec<CleanupRecord>,
}

impl CleanupReport {
    #[must_use]
    pub fn failed(&self) -> usize {
        self.records
            .iter()
            .filter(|record| matches!(record.outcome, CleanupOutcome::Failed { .. }))
            .count()
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(self.failed() > 0)
    }
}

pub struct ReleaseCleanup<'a> {
    runner: &'a dyn CommandRunner,
    bench_root: &'a Path,
    app_dirs: Vec<PathBuf>,
    python: String,
    in_build: bool,
    stream: bool,
}

impl<'a> ReleaseCleanup<'a> {
    /// `app_dirs` are searched in order when resolving `script` tasks.
    pub fn new(
        runner: &'a dyn CommandRunner,
        bench_root: &'a Path,
        app_dirs: Vec<PathBuf>,
        python: impl Into<String>,
        in_build: bool,
    ) -> Self {
        Self {
            runner,
            bench_root,
            app_dirs,
            python: python.into(),
            in_build,
            stream: true,
        }
    }

    #[must_use]
    pub fn capture_only(mut self) -> Self {
        self.stream = false;
        self
    }

    /// Runs every entry in order; a failed task never stops the ones after it.
    ///
    /// # Errors
    ///
    /// Returns an error only when writing to `console` fails.
    pub fn run(&self, entries: &[CleanupEntry], console: &mut dyn Write) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();
        for entry in entries {
            writeln!(console, "\n> CLEANUP [{}]: {}", entry.app, describe(&entry.task.action))?;
            console.flush()?;
            let outcome = self.run_task(&entry.task);
            match &outcome {
                CleanupOutcome::Succeeded => writeln!(console, "✔ done")?,
                CleanupOutcome::Failed { return_code, .. } => {
                    writeln!(console, "✖ failed (return code {return_code})")?;
                }
                CleanupOutcome::Skipped { reason } => writeln!(console, "- skipped: {reason}")?,
            }
            report.records.push(CleanupRecord {
                app: entry.app.clone(),
                task: entry.task.clone(),
                outcome,
            });
        }
        Ok(report)
    }

    fn run_task(&self, task: &CleanupTask) -> CleanupOutcome {
        if task.only_during_build && !self.in_build {
            return CleanupOutcome::Skipped {
                reason: "only runs during an image build".to_string(),
            };
        }
        let (program, args) = match &task.action {
            CleanupAction::Bash(command) => ("sh".to_string(), vec!["-c".to_string(), command.clone()]),
            CleanupAction::Script(relative) => {
                let Some(path) = self.resolve_script(relative) else {
                    warn!(script = %relative, "cleanup script not found in any app");
                    return CleanupOutcome::Failed {
                        return_code: -1,
                        output: format!("script {relative} not found in any installed app"),
                    };
                };
                let interpreter = if path.extension().is_some_and(|ext| ext == "py") {
                    self.python.clone()
                } else {
                    "bash".to_string()
                };
                (interpreter, vec![path.display().to_string()])
            }
            CleanupAction::Function(path) => {
                return CleanupOutcome::Skipped {
                    reason: format!("function {path} needs the host interpreter"),
                };
            }
        };

        debug!(program = %program, ?args, "running cleanup task");
        let outcome = if self.stream {
            self.runner.run_command_streaming(&program, &args, self.bench_root)
        } else {
            self.runner.run_command(&program, &args, self.bench_root)
        };
        match outcome {
            Ok(output) if output.code == 0 => CleanupOutcome::Succeeded,
            Ok(output) => CleanupOutcome::Failed {
                return_code: output.code,
                output: output.combined(),
            },
            Err(err) => CleanupOutcome::Failed {
                return_code: -1,
                output: format!("{err:#}"),
            },
        }
    }

    fn resolve_script(&self, relative: &str) -> Option<PathBuf> {
        self.app_dirs
            .iter()
            .map(|dir| dir.join(relative))
            .find(|candidate| candidate.is_file())
    }
}

fn describe(action: &CleanupAction) -> String {
    match action {
        CleanupAction::Bash(command) => format!("bash: {command}"),
        CleanupAction::Script(path) => format!("script: {path}"),
        CleanupAction::Function(path) => format!("function: {path}"),
    }
}
