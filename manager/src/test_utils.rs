//! Shared test utilities for the manager crate.

use crate::download::Downloader;
use crate::error::{ManagerError, Result};
use crate::executor::CommandExecutor;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};

/// Returns the hex-encoded SHA-256 digest of a byte slice.
pub fn sha256_hex(content: &[u8]) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Creates a command `Output` with the given exit code and stdout.
pub fn output_with_stdout(code: i32, stdout: &str) -> Output {
    Output {
        status: exit_status(code),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Wildcard argument for [`ExpectedCall::args`]: matches any single
/// argument. Useful for positions holding unpredictable temp paths.
pub const ANY_ARG: &str = "<any>";

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g., "gpg").
    pub cmd: &'static str,
    /// The arguments to pass to the command; [`ANY_ARG`] entries match
    /// any value.
    pub args: Vec<String>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

/// A stub implementation of [`CommandExecutor`] for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not
    /// invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        let mut expected = self.expected.borrow_mut();
        let call = expected.pop_front().expect("unexpected command invocation");

        assert_eq!(call.cmd, cmd);
        assert_eq!(
            call.args.len(),
            args.len(),
            "argument count mismatch for {cmd}: expected {:?}, got {args:?}",
            call.args
        );
        for (expected_arg, actual) in call.args.iter().zip(args) {
            if expected_arg != ANY_ARG {
                assert_eq!(expected_arg, actual, "argument mismatch for {cmd}");
            }
        }

        call.result
    }
}

/// A record of one [`Downloader::fetch`] invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    /// The URL that was requested.
    pub url: String,
    /// Where the content was written.
    pub dest: PathBuf,
    /// The expected checksum, if any.
    pub expected: Option<String>,
}

/// A stub implementation of [`Downloader`] serving canned responses.
///
/// `fetch` writes preconfigured bytes to the destination and records
/// the invocation; `fetch_text` returns a preconfigured body. Unknown
/// URLs produce a network error, mirroring an unreachable server.
#[derive(Debug, Default)]
pub struct StubDownloader {
    files: HashMap<String, Vec<u8>>,
    texts: HashMap<String, String>,
    calls: RefCell<Vec<FetchCall>>,
}

impl StubDownloader {
    /// Creates a stub with no configured responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `content` for `fetch` calls against `url`.
    #[must_use]
    pub fn with_file(mut self, url: &str, content: &[u8]) -> Self {
        self.files.insert(url.to_owned(), content.to_vec());
        self
    }

    /// Serves `body` for `fetch_text` calls against `url`.
    #[must_use]
    pub fn with_text(mut self, url: &str, body: &str) -> Self {
        self.texts.insert(url.to_owned(), body.to_owned());
        self
    }

    /// Returns the recorded `fetch` invocations in order.
    #[must_use]
    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.borrow().clone()
    }
}

impl Downloader for StubDownloader {
    fn fetch(&self, url: &str, dest: &Path, expected: Option<&str>) -> Result<()> {
        self.calls.borrow_mut().push(FetchCall {
            url: url.to_owned(),
            dest: dest.to_path_buf(),
            expected: expected.map(str::to_owned),
        });
        let content = self.files.get(url).ok_or_else(|| ManagerError::Network {
            url: url.to_owned(),
            reason: "no stub content configured".to_owned(),
        })?;
        std::fs::write(dest, content)?;
        Ok(())
    }

    fn fetch_text(&self, url: &str) -> Result<String> {
        self.texts
            .get(url)
            .cloned()
            .ok_or_else(|| ManagerError::Network {
                url: url.to_owned(),
                reason: "no stub body configured".to_owned(),
            })
    }
}
