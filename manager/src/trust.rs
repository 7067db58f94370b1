//! Ephemeral trust domains and the external OpenPGP tool.
//!
//! goblet never maintains a long-lived keyring. Every key import,
//! keyserver fetch, and signature check happens inside an
//! [`EphemeralTrustDomain`]: a freshly created, owner-only directory
//! passed to `gpg` as its home, deleted when the guard drops on every
//! exit path, success or failure.

use crate::error::{ManagerError, Result};
use crate::executor::{CommandExecutor, command_succeeds, diagnostic, path_arg};
use std::path::Path;

/// Name of the external OpenPGP binary.
pub const GPG_BIN: &str = "gpg";

/// Keyserver queried for `gpg:`/`keyserver:` key references.
pub const KEYSERVER: &str = "hkps://keys.openpgp.org";

/// A short-lived, isolated keyring directory.
///
/// The directory is created with owner-only permissions (`gpg` refuses
/// group- or world-readable homes) and removed when the value is
/// dropped. Its lifetime is exactly one import/verify/fetch operation.
#[derive(Debug)]
pub struct EphemeralTrustDomain {
    dir: tempfile::TempDir,
    home: String,
}

impl EphemeralTrustDomain {
    /// Creates a fresh trust domain.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Io`] if the directory cannot be created,
    /// restricted to owner-only permissions, or is not valid UTF-8.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("goblet-gnupg-").tempdir()?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o700))?;
        }
        let home = path_arg(dir.path())?.to_owned();
        Ok(Self { dir, home })
    }

    /// Returns the directory backing this trust domain.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the directory as the string passed to `--homedir`.
    #[must_use]
    pub fn home(&self) -> &str {
        &self.home
    }
}

/// Wrapper over the external OpenPGP command-line tool.
///
/// Owns no state beyond the executor; each method maps one tool
/// invocation to the crate's error taxonomy.
pub struct OpenPgpTool<'a> {
    executor: &'a dyn CommandExecutor,
}

impl<'a> OpenPgpTool<'a> {
    /// Creates a wrapper running `gpg` through the given executor.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self { executor }
    }

    /// Returns true if the tool is installed and runnable.
    #[must_use]
    pub fn is_available(&self) -> bool {
        command_succeeds(self.executor, GPG_BIN, &["--version"])
    }

    /// Errors unless the tool is installed and runnable.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::ToolUnavailable`] when it is not.
    pub fn ensure_available(&self) -> Result<()> {
        if !self.is_available() {
            return Err(ManagerError::ToolUnavailable {
                tool: GPG_BIN.to_owned(),
            });
        }
        Ok(())
    }

    /// Imports a public key file into the given trust domain.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::ToolInvocationFailed`] when the import
    /// exits non-zero.
    pub fn import_key(&self, domain: &EphemeralTrustDomain, key: &Path) -> Result<()> {
        let output = self.executor.run(
            GPG_BIN,
            &[
                "--batch",
                "--yes",
                "--homedir",
                domain.home(),
                "--import",
                path_arg(key)?,
            ],
        )?;
        if !output.status.success() {
            return Err(ManagerError::ToolInvocationFailed {
                tool: GPG_BIN.to_owned(),
                operation: "import",
                message: diagnostic(&output),
            });
        }
        Ok(())
    }

    /// Checks a detached signature against a file inside the given
    /// trust domain.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::VerificationFailed`] carrying the tool's
    /// diagnostic text when the signature is rejected.
    pub fn verify_detached(
        &self,
        domain: &EphemeralTrustDomain,
        signature: &Path,
        file: &Path,
    ) -> Result<()> {
        let output = self.executor.run(
            GPG_BIN,
            &[
                "--batch",
                "--homedir",
                domain.home(),
                "--verify",
                path_arg(signature)?,
                path_arg(file)?,
            ],
        )?;
        if !output.status.success() {
            return Err(ManagerError::VerificationFailed {
                message: diagnostic(&output),
            });
        }
        Ok(())
    }

    /// Fetches a key from the public keyserver into the given trust
    /// domain.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::ToolInvocationFailed`] when the fetch
    /// exits non-zero.
    pub fn recv_key(&self, domain: &EphemeralTrustDomain, key_id: &str) -> Result<()> {
        let output = self.executor.run(
            GPG_BIN,
            &[
                "--batch",
                "--homedir",
                domain.home(),
                "--keyserver",
                KEYSERVER,
                "--recv-keys",
                key_id,
            ],
        )?;
        if !output.status.success() {
            return Err(ManagerError::ToolInvocationFailed {
                tool: GPG_BIN.to_owned(),
                operation: "recv-keys",
                message: diagnostic(&output),
            });
        }
        Ok(())
    }

    /// Exports a key from the given trust domain in armored form.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::ToolInvocationFailed`] when the export
    /// exits non-zero.
    pub fn export_armored(&self, domain: &EphemeralTrustDomain, key_id: &str) -> Result<String> {
        let output = self.executor.run(
            GPG_BIN,
            &["--homedir", domain.home(), "--armor", "--export", key_id],
        )?;
        if !output.status.success() {
            return Err(ManagerError::ToolInvocationFailed {
                tool: GPG_BIN.to_owned(),
                operation: "export",
                message: diagnostic(&output),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        ANY_ARG, ExpectedCall, StubExecutor, failure_output, output_with_stdout, success_output,
    };

    fn domain() -> EphemeralTrustDomain {
        EphemeralTrustDomain::new().expect("trust domain")
    }

    #[test]
    fn trust_domain_is_deleted_on_drop() {
        let domain = domain();
        let path = domain.path().to_path_buf();
        assert!(path.is_dir());
        drop(domain);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn trust_domain_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let domain = domain();
        let mode = std::fs::metadata(domain.path())
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn import_failure_maps_to_tool_invocation_failed() {
        let executor = StubExecutor::new(vec![ExpectedCall {
            cmd: GPG_BIN,
            args: vec![
                "--batch".to_owned(),
                "--yes".to_owned(),
                "--homedir".to_owned(),
                ANY_ARG.to_owned(),
                "--import".to_owned(),
                "/keys/bad.asc".to_owned(),
            ],
            result: Ok(failure_output("gpg: no valid OpenPGP data found")),
        }]);
        let tool = OpenPgpTool::new(&executor);
        let result = tool.import_key(&domain(), Path::new("/keys/bad.asc"));
        assert!(matches!(
            result,
            Err(ManagerError::ToolInvocationFailed { operation: "import", message, .. })
                if message.contains("no valid OpenPGP data")
        ));
        executor.assert_finished();
    }

    #[test]
    fn rejected_signature_maps_to_verification_failed() {
        let executor = StubExecutor::new(vec![ExpectedCall {
            cmd: GPG_BIN,
            args: vec![
                "--batch".to_owned(),
                "--homedir".to_owned(),
                ANY_ARG.to_owned(),
                "--verify".to_owned(),
                "/tmp/sig".to_owned(),
                "/tmp/archive".to_owned(),
            ],
            result: Ok(failure_output("gpg: BAD signature")),
        }]);
        let tool = OpenPgpTool::new(&executor);
        let result = tool.verify_detached(&domain(), Path::new("/tmp/sig"), Path::new("/tmp/archive"));
        assert!(matches!(
            result,
            Err(ManagerError::VerificationFailed { message }) if message.contains("BAD signature")
        ));
        executor.assert_finished();
    }

    #[test]
    fn verification_diagnostic_falls_back_to_stdout() {
        let executor = StubExecutor::new(vec![ExpectedCall {
            cmd: GPG_BIN,
            args: vec![
                "--batch".to_owned(),
                "--homedir".to_owned(),
                ANY_ARG.to_owned(),
                "--verify".to_owned(),
                "/tmp/sig".to_owned(),
                "/tmp/archive".to_owned(),
            ],
            result: Ok(output_with_stdout(2, "gpg: Can't check signature")),
        }]);
        let tool = OpenPgpTool::new(&executor);
        let result = tool.verify_detached(&domain(), Path::new("/tmp/sig"), Path::new("/tmp/archive"));
        assert!(matches!(
            result,
            Err(ManagerError::VerificationFailed { message }) if message.contains("Can't check")
        ));
    }

    #[test]
    fn export_returns_captured_stdout() {
        let armor = "-----BEGIN PGP PUBLIC KEY BLOCK-----\n";
        let executor = StubExecutor::new(vec![ExpectedCall {
            cmd: GPG_BIN,
            args: vec![
                "--homedir".to_owned(),
                ANY_ARG.to_owned(),
                "--armor".to_owned(),
                "--export".to_owned(),
                "0xDEADBEEF".to_owned(),
            ],
            result: Ok(output_with_stdout(0, armor)),
        }]);
        let tool = OpenPgpTool::new(&executor);
        let exported = tool
            .export_armored(&domain(), "0xDEADBEEF")
            .expect("export");
        assert_eq!(exported, armor);
        executor.assert_finished();
    }

    #[test]
    fn recv_key_passes_the_fixed_keyserver() {
        let executor = StubExecutor::new(vec![ExpectedCall {
            cmd: GPG_BIN,
            args: vec![
                "--batch".to_owned(),
                "--homedir".to_owned(),
                ANY_ARG.to_owned(),
                "--keyserver".to_owned(),
                KEYSERVER.to_owned(),
                "--recv-keys".to_owned(),
                "0xDEADBEEF".to_owned(),
            ],
            result: Ok(success_output()),
        }]);
        let tool = OpenPgpTool::new(&executor);
        tool.recv_key(&domain(), "0xDEADBEEF").expect("recv");
        executor.assert_finished();
    }
}
