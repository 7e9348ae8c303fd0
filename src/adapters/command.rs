// ABOUTME: Bounded execution of external commands via tokio::process.
// ABOUTME: Every invocation has a timeout; expiry kills the child and maps to AdapterError::TimedOut.

use snafu::ResultExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::error::{AdapterError, SpawnSnafu};

/// Default bound for commands that do not specify one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Output from a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code of the command.
    pub exit_code: i32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A single external command invocation.
#[derive(Debug, Clone)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    timeout: Duration,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The command line as it would be typed, for logs and errors.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run to completion and return the output whatever the exit code.
    pub async fn output(&self) -> Result<CommandOutput, AdapterError> {
        let command_line = self.display();
        tracing::debug!(command = %command_line, timeout_secs = self.timeout.as_secs(), "running command");

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref cwd) = self.cwd {
            command.current_dir(cwd);
        }

        let child = command.spawn().context(SpawnSnafu {
            program: self.program.clone(),
        })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.context(SpawnSnafu {
                program: self.program.clone(),
            })?,
            Err(_elapsed) => {
                return Err(AdapterError::TimedOut {
                    command: command_line,
                    timeout: self.timeout,
                });
            }
        };

        let Some(exit_code) = output.status.code() else {
            return Err(AdapterError::Killed {
                command: command_line,
            });
        };

        let result = CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::debug!(command = %command_line, exit_code, "command finished");
        Ok(result)
    }

    /// Run to completion; a non-zero exit is an error.
    pub async fn run(&self) -> Result<CommandOutput, AdapterError> {
        let output = self.output().await?;
        if output.success() {
            Ok(output)
        } else {
            Err(AdapterError::NonZeroExit {
                command: self.display(),
                code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}
