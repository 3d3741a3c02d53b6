use std::{
    io::{self, BufRead, BufReader, Read, Write},
    path::Path,
    process::{Command, ExitStatus, Stdio},
    thread,
};

use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    /// Stdout followed by stderr, each in arrival order.
    #[must_use]
    pub fn combined(&self) -> String {
        let mut combined = String::with_capacity(self.stdout.len() + self.stderr.len());
        combined.push_str(&self.stdout);
        combined.push_str(&self.stderr);
        combined
    }
}

/// Execute a program and capture stdout/stderr without echoing them.
///
/// # Errors
///
/// Returns an error when the program cannot be spawned or the I/O streams cannot
/// be read entirely.
pub fn run_command(program: &str, args: &[String], cwd: &Path) -> Result<RunOutput> {
    run_piped(program, args, cwd, None)
}

/// Execute a program while echoing each stdout/stderr line to the parent
/// process as it arrives, keeping a copy of both streams.
///
/// # Errors
///
/// Returns an error when the program cannot be spawned or its output streams
/// cannot be read.
pub fn run_command_streaming(program: &str, args: &[String], cwd: &Path) -> Result<RunOutput> {
    run_piped(
        program,
        args,
        cwd,
        Some((Box::new(io::stdout()), Box::new(io::stderr()))),
    )
}

type EchoPair = (Box<dyn Write + Send>, Box<dyn Write + Send>);

fn run_piped(program: &str, args: &[String], cwd: &Path, echo: Option<EchoPair>) -> Result<RunOutput> {
    let mut command = Command::new(program);
    command.args(args);
    command.current_dir(cwd);
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .with_context(|| format!("failed to start {program}"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow::anyhow!("stdout missing for {program}"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow::anyhow!("stderr missing for {program}"))?;

    let (stdout_echo, stderr_echo) = match echo {
        Some((out, err)) => (Some(out), Some(err)),
        None => (None, None),
    };
    let stdout_handle = thread::spawn(move || tee_lines(stdout, stdout_echo));
    let stderr_handle = thread::spawn(move || tee_lines(stderr, stderr_echo));

    let status = child
        .wait()
        .with_context(|| format!("failed to wait for {program}"))?;
    let stdout = stdout_handle
        .join()
        .map_err(|_| anyhow::anyhow!("stdout thread panicked"))??;
    let stderr = stderr_handle
        .join()
        .map_err(|_| anyhow::anyhow!("stderr thread panicked"))??;

    Ok(RunOutput {
        code: exit_code(status),
        stdout,
        stderr,
    })
}

/// Shell-style exit code: `128 + signal` for signal deaths on Unix.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

/// Reads `reader` to the end line by line, optionally echoing every line.
///
/// The pipe is always drained to EOF: a failing echo target only stops the
/// echo, otherwise the child could block on a full pipe.
fn tee_lines(reader: impl Read, mut echo: Option<Box<dyn Write + Send>>) -> Result<String> {
    let mut reader = BufReader::new(reader);
    let mut captured = String::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        let read = reader.read_until(b'\n', &mut line)?;
        if read == 0 {
            break;
        }
        if let Some(writer) = echo.as_mut() {
            if let Err(err) = writer.write_all(&line).and_then(|()| writer.flush()) {
                tracing::debug!(%err, "console echo failed; continuing capture only");
                echo = None;
            }
        }
        captured.push_str(&String::from_utf8_lossy(&line));
    }
    Ok(captured)
}
