//! External command execution with deadlines.
//!
//! Every external binary the pipeline touches (the archive extraction
//! tool, the OpenPGP tool) is invoked through [`CommandExecutor`], so
//! tests can substitute a stub and production code gets a uniform
//! deadline and cancellation policy.

use crate::cancel::CancelToken;
use crate::error::{ManagerError, Result};
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::ToolUnavailable`] if the binary cannot be
    /// found, [`ManagerError::ToolTimeout`] if it exceeds the deadline,
    /// [`ManagerError::Cancelled`] if cancellation was requested, and
    /// any I/O errors encountered while spawning or collecting output.
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output>;
}

/// Executes commands on the host system with a deadline.
///
/// The child is spawned with piped stdout/stderr and killed if it does
/// not complete within the configured timeout.
#[derive(Debug, Clone)]
pub struct SystemCommandExecutor {
    timeout: Duration,
    cancel: CancelToken,
}

impl SystemCommandExecutor {
    /// Creates an executor with the given deadline and cancellation
    /// token.
    #[must_use]
    pub fn new(timeout: Duration, cancel: CancelToken) -> Self {
        Self { timeout, cancel }
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        self.cancel.ensure_active()?;

        let mut child = Command::new(cmd)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ManagerError::ToolUnavailable {
                        tool: cmd.to_owned(),
                    }
                } else {
                    ManagerError::Io(e)
                }
            })?;

        match child.wait_timeout(self.timeout)? {
            Some(status) => {
                let stdout = child
                    .stdout
                    .take()
                    .map(std::io::read_to_string)
                    .transpose()?
                    .unwrap_or_default();
                let stderr = child
                    .stderr
                    .take()
                    .map(std::io::read_to_string)
                    .transpose()?
                    .unwrap_or_default();
                Ok(Output {
                    status,
                    stdout: stdout.into_bytes(),
                    stderr: stderr.into_bytes(),
                })
            }
            None => {
                child.kill()?;
                child.wait()?;
                Err(ManagerError::ToolTimeout {
                    tool: cmd.to_owned(),
                    seconds: self.timeout.as_secs(),
                })
            }
        }
    }
}

/// Returns true if the given command executes successfully.
pub fn command_succeeds(executor: &dyn CommandExecutor, cmd: &str, args: &[&str]) -> bool {
    executor.run(cmd, args).is_ok_and(|o| o.status.success())
}

/// Extracts a human-readable diagnostic from a command's output:
/// trimmed stderr, falling back to trimmed stdout when stderr is empty.
pub(crate) fn diagnostic(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// Borrows a filesystem path as a UTF-8 command argument.
pub(crate) fn path_arg(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| {
        ManagerError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("path is not valid UTF-8: {}", path.display()),
        ))
    })
}
