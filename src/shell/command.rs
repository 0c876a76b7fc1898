//! External command execution.

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{ReconError, Result};

/// How often to poll a running child while waiting on a deadline.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured result of executing an external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Standard output, split into lines.
    pub stdout: Vec<String>,

    /// Standard error, split into lines.
    pub stderr: Vec<String>,

    /// Execution duration.
    pub duration: Duration,
}

impl CommandOutput {
    /// Whether the command exited with status 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout joined back into a single newline-separated string.
    pub fn stdout_text(&self) -> String {
        self.stdout.join("\n")
    }
}

/// Uniform interface to the outside world for plugin bodies.
///
/// Plugins depend only on these primitives, never on process-spawning
/// details. A missing binary or file surfaces as
/// [`ReconError::CommandUnavailable`] so plugins can skip gracefully
/// instead of failing the run.
pub trait CommandRunner: Send + Sync {
    /// Spawn `command` (program plus whitespace-separated arguments),
    /// capture its output, and wait for it to finish. When `deadline` is
    /// given and passes before the child exits, the child is killed, its
    /// partial output is discarded, and the call fails with
    /// [`ReconError::CommandTimedOut`].
    fn execute(&self, command: &str, deadline: Option<Instant>) -> Result<CommandOutput>;

    /// Whether a file exists at `path`.
    fn file_exists(&self, path: &Path) -> bool;

    /// Read the lines of the file at `path`. A missing file fails with
    /// [`ReconError::CommandUnavailable`] — plugins treat missing files
    /// and missing binaries identically.
    fn read_lines(&self, path: &Path) -> Result<Vec<String>>;
}

/// The real [`CommandRunner`]: spawns subprocesses and reads the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Create a system runner.
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn execute(&self, command: &str, deadline: Option<Instant>) -> Result<CommandOutput> {
        let start = Instant::now();

        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or_else(|| ReconError::CommandUnavailable {
            command: command.to_string(),
        })?;

        let mut cmd = Command::new(program);
        cmd.args(parts);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ReconError::CommandUnavailable {
                    command: command.to_string(),
                }
            } else {
                ReconError::Io(e)
            }
        })?;

        // Drain both pipes on their own threads so a chatty child can't
        // deadlock against a full pipe buffer.
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let stdout_handle = thread::spawn(move || read_pipe_lines(stdout));
        let stderr_handle = thread::spawn(move || read_pipe_lines(stderr));

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = stdout_handle.join();
                    let _ = stderr_handle.join();
                    return Err(ReconError::CommandTimedOut {
                        command: command.to_string(),
                    });
                }
            }
            thread::sleep(WAIT_POLL_INTERVAL);
        };

        let stdout = stdout_handle.join().unwrap_or_default();
        let stderr = stderr_handle.join().unwrap_or_default();

        Ok(CommandOutput {
            exit_code: status.code(),
            stdout,
            stderr,
            duration: start.elapsed(),
        })
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_lines(&self, path: &Path) -> Result<Vec<String>> {
        let file = std::fs::File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ReconError::CommandUnavailable {
                    command: path.display().to_string(),
                }
            } else {
                ReconError::Io(e)
            }
        })?;

        let reader = BufReader::new(file);
        let mut lines = Vec::new();
        for line in reader.lines() {
            lines.push(line?);
        }
        Ok(lines)
    }
}

/// Collect the lines of a child pipe, tolerating a pipe that was never opened.
fn read_pipe_lines<R: std::io::Read>(pipe: Option<R>) -> Vec<String> {
    match pipe {
        Some(pipe) => BufReader::new(pipe)
            .lines()
            .map_while(std::result::Result::ok)
            .collect(),
        None => Vec::new(),
    }
}
