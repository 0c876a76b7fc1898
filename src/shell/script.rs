//! Scripted command runner for tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::{ReconError, Result};

use super::command::{CommandOutput, CommandRunner};

/// A canned command result.
#[derive(Debug, Clone)]
struct ScriptedCommand {
    exit_code: i32,
    stdout: Vec<String>,
    stderr: Vec<String>,
}

/// A [`CommandRunner`] that replays scripted outputs instead of touching
/// the host, and records every command it was asked to run.
///
/// Commands and files that were not scripted behave exactly like a missing
/// binary or file on a real host: `execute`/`read_lines` fail with
/// [`ReconError::CommandUnavailable`] and `file_exists` returns false.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    commands: HashMap<String, ScriptedCommand>,
    files: HashMap<PathBuf, Vec<String>>,
    invocations: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    /// Create a runner with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a command's exit code and stdout lines.
    pub fn with_command(mut self, command: &str, exit_code: i32, stdout: &[&str]) -> Self {
        self.commands.insert(
            command.to_string(),
            ScriptedCommand {
                exit_code,
                stdout: stdout.iter().map(|s| s.to_string()).collect(),
                stderr: Vec::new(),
            },
        );
        self
    }

    /// Script a command's stderr lines in addition to stdout.
    pub fn with_command_stderr(
        mut self,
        command: &str,
        exit_code: i32,
        stdout: &[&str],
        stderr: &[&str],
    ) -> Self {
        self.commands.insert(
            command.to_string(),
            ScriptedCommand {
                exit_code,
                stdout: stdout.iter().map(|s| s.to_string()).collect(),
                stderr: stderr.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    /// Script a file's contents.
    pub fn with_file(mut self, path: &str, lines: &[&str]) -> Self {
        self.files.insert(
            PathBuf::from(path),
            lines.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// Every command line passed to `execute`, in call order.
    pub fn invocations(&self) -> Vec<String> {
        self.invocations.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl CommandRunner for ScriptedRunner {
    fn execute(&self, command: &str, _deadline: Option<Instant>) -> Result<CommandOutput> {
        if let Ok(mut invocations) = self.invocations.lock() {
            invocations.push(command.to_string());
        }

        match self.commands.get(command) {
            Some(scripted) => Ok(CommandOutput {
                exit_code: Some(scripted.exit_code),
                stdout: scripted.stdout.clone(),
                stderr: scripted.stderr.clone(),
                duration: Duration::ZERO,
            }),
            None => Err(ReconError::CommandUnavailable {
                command: command.to_string(),
            }),
        }
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn read_lines(&self, path: &Path) -> Result<Vec<String>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| ReconError::CommandUnavailable {
                command: path.display().to_string(),
            })
    }
}
