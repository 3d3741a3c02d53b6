use std::path::Path;

use anyhow::Result;

use crate::process::{self, RunOutput};

/// Seam between the suite driver and the operating system.
pub trait CommandRunner {
    /// Runs `program` and captures its output without echoing it.
    fn run_command(&self, program: &str, args: &[String], cwd: &Path) -> Result<RunOutput>;

    /// Runs `program`, echoing each output line live while capturing it.
    fn run_command_streaming(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<RunOutput>;
}

/// Spawns real child processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostCommandRunner;

impl CommandRunner for HostCommandRunner {
    fn run_command(&self, program: &str, args: &[String], cwd: &Path) -> Result<RunOutput> {
        process::run_command(program, args, cwd)
    }

    fn run_command_streaming(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<RunOutput> {
        process::run_command_streaming(program, args, cwd)
    }
}
