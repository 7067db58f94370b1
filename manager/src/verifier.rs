//! Detached-signature verification.
//!
//! The verifier owns the trust-establishment protocol only: which key
//! material to stage where, and how to run a one-shot check inside an
//! ephemeral trust domain. The OpenPGP cryptography itself belongs to
//! the external tool.

use crate::download::Downloader;
use crate::error::Result;
use crate::executor::CommandExecutor;
use crate::keysource::{PublicKeySource, is_http_url};
use crate::resolver::KeyResolver;
use crate::trust::{EphemeralTrustDomain, OpenPgpTool};
use std::path::Path;

/// Verifies detached signatures against downloaded archives.
pub struct SignatureVerifier<'a> {
    executor: &'a dyn CommandExecutor,
    downloader: &'a dyn Downloader,
    release_api_base: String,
}

impl<'a> SignatureVerifier<'a> {
    /// Creates a verifier; `release_api_base` serves key references in
    /// repository-release form.
    #[must_use]
    pub fn new(
        executor: &'a dyn CommandExecutor,
        downloader: &'a dyn Downloader,
        release_api_base: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            downloader,
            release_api_base: release_api_base.into(),
        }
    }

    /// Checks the detached signature at `signature` for `file` using
    /// the public key at `public_key`.
    ///
    /// The key is imported into a fresh [`EphemeralTrustDomain`] that
    /// is deleted when this call returns, success or failure.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::ToolUnavailable`] when the OpenPGP tool
    /// is missing, [`ManagerError::ToolInvocationFailed`] when the key
    /// import fails, and [`ManagerError::VerificationFailed`] when the
    /// signature is rejected.
    ///
    /// [`ManagerError::ToolUnavailable`]: crate::error::ManagerError::ToolUnavailable
    /// [`ManagerError::ToolInvocationFailed`]: crate::error::ManagerError::ToolInvocationFailed
    /// [`ManagerError::VerificationFailed`]: crate::error::ManagerError::VerificationFailed
    pub fn verify_detached(
        &self,
        signature: &Path,
        file: &Path,
        public_key: &Path,
    ) -> Result<()> {
        let gpg = OpenPgpTool::new(self.executor);
        gpg.ensure_available()?;

        let domain = EphemeralTrustDomain::new()?;
        gpg.import_key(&domain, public_key)?;
        gpg.verify_detached(&domain, signature, file)
    }

    /// Resolves a signature reference (URL or local path) and a public
    /// key reference (full resolver grammar) into a scratch directory,
    /// then verifies `file` against them.
    ///
    /// The scratch directory and everything resolved into it are
    /// removed on every exit path.
    ///
    /// # Errors
    ///
    /// Returns the resolution errors of
    /// [`KeyResolver::resolve`] and the verification errors of
    /// [`Self::verify_detached`].
    pub fn verify_from_sources(
        &self,
        file: &Path,
        signature_ref: &str,
        public_key_ref: &str,
    ) -> Result<()> {
        let scratch = tempfile::Builder::new().prefix("goblet-verify-").tempdir()?;

        let signature_dest = scratch.path().join("signature");
        if is_http_url(signature_ref) {
            self.downloader.fetch(signature_ref, &signature_dest, None)?;
        } else {
            std::fs::copy(signature_ref, &signature_dest)?;
        }

        let key_dest = scratch.path().join("pubkey.asc");
        let source = PublicKeySource::parse(public_key_ref)?;
        let resolver = KeyResolver::new(
            self.downloader,
            self.executor,
            self.release_api_base.clone(),
        );
        resolver.resolve(&source, &key_dest)?;

        self.verify_detached(&signature_dest, file, &key_dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ManagerError;
    use crate::test_utils::{
        ANY_ARG, ExpectedCall, StubDownloader, StubExecutor, failure_output, success_output,
    };

    fn gpg_version_ok() -> ExpectedCall {
        ExpectedCall {
            cmd: "gpg",
            args: vec!["--version".to_owned()],
            result: Ok(success_output()),
        }
    }

    fn gpg_import(result: crate::error::Result<std::process::Output>) -> ExpectedCall {
        ExpectedCall {
            cmd: "gpg",
            args: vec![
                "--batch".to_owned(),
                "--yes".to_owned(),
                "--homedir".to_owned(),
                ANY_ARG.to_owned(),
                "--import".to_owned(),
                ANY_ARG.to_owned(),
            ],
            result,
        }
    }

    fn gpg_verify(result: crate::error::Result<std::process::Output>) -> ExpectedCall {
        ExpectedCall {
            cmd: "gpg",
            args: vec![
                "--batch".to_owned(),
                "--homedir".to_owned(),
                ANY_ARG.to_owned(),
                "--verify".to_owned(),
                ANY_ARG.to_owned(),
                ANY_ARG.to_owned(),
            ],
            result,
        }
    }

    fn scratch_file(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).expect("write");
        path
    }

    #[test]
    fn verify_detached_imports_then_verifies() {
        let dir = tempfile::tempdir().expect("temp dir");
        let sig = scratch_file(&dir, "archive.sig", b"sig");
        let file = scratch_file(&dir, "archive", b"content");
        let key = scratch_file(&dir, "key.asc", b"key");

        let executor = StubExecutor::new(vec![
            gpg_version_ok(),
            gpg_import(Ok(success_output())),
            gpg_verify(Ok(success_output())),
        ]);
        let downloader = StubDownloader::new();
        let verifier = SignatureVerifier::new(&executor, &downloader, "http://api.test");

        verifier.verify_detached(&sig, &file, &key).expect("verify");
        executor.assert_finished();
    }

    #[test]
    fn failed_import_is_distinct_from_failed_verification() {
        let dir = tempfile::tempdir().expect("temp dir");
        let sig = scratch_file(&dir, "archive.sig", b"sig");
        let file = scratch_file(&dir, "archive", b"content");
        let key = scratch_file(&dir, "key.asc", b"key");

        let executor = StubExecutor::new(vec![
            gpg_version_ok(),
            gpg_import(Ok(failure_output("gpg: invalid armor"))),
        ]);
        let downloader = StubDownloader::new();
        let verifier = SignatureVerifier::new(&executor, &downloader, "http://api.test");

        let result = verifier.verify_detached(&sig, &file, &key);
        assert!(matches!(
            result,
            Err(ManagerError::ToolInvocationFailed { operation: "import", .. })
        ));
        executor.assert_finished();
    }

    #[test]
    fn verify_from_sources_with_local_references() {
        let dir = tempfile::tempdir().expect("temp dir");
        let sig = scratch_file(&dir, "archive.sig", b"sig");
        let file = scratch_file(&dir, "archive", b"content");
        let key = scratch_file(&dir, "key.asc", b"key");

        let executor = StubExecutor::new(vec![
            gpg_version_ok(),
            gpg_import(Ok(success_output())),
            gpg_verify(Ok(success_output())),
        ]);
        let downloader = StubDownloader::new();
        let verifier = SignatureVerifier::new(&executor, &downloader, "http://api.test");

        verifier
            .verify_from_sources(
                &file,
                sig.to_str().expect("utf-8"),
                key.to_str().expect("utf-8"),
            )
            .expect("verify");
        executor.assert_finished();
    }

    #[test]
    fn verify_from_sources_downloads_url_signatures() {
        let dir = tempfile::tempdir().expect("temp dir");
        let file = scratch_file(&dir, "archive", b"content");
        let key = scratch_file(&dir, "key.asc", b"key");

        let executor = StubExecutor::new(vec![
            gpg_version_ok(),
            gpg_import(Ok(success_output())),
            gpg_verify(Ok(success_output())),
        ]);
        let downloader =
            StubDownloader::new().with_file("https://dl.test/archive.sig", b"remote sig");
        let verifier = SignatureVerifier::new(&executor, &downloader, "http://api.test");

        verifier
            .verify_from_sources(
                &file,
                "https://dl.test/archive.sig",
                key.to_str().expect("utf-8"),
            )
            .expect("verify");

        let calls = downloader.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, "https://dl.test/archive.sig");
        executor.assert_finished();
    }

    #[test]
    fn rejected_signature_surfaces_verification_failed() {
        let dir = tempfile::tempdir().expect("temp dir");
        let sig = scratch_file(&dir, "archive.sig", b"sig");
        let file = scratch_file(&dir, "archive", b"tampered");
        let key = scratch_file(&dir, "key.asc", b"key");

        let executor = StubExecutor::new(vec![
            gpg_version_ok(),
            gpg_import(Ok(success_output())),
            gpg_verify(Ok(failure_output("gpg: BAD signature from signer"))),
        ]);
        let downloader = StubDownloader::new();
        let verifier = SignatureVerifier::new(&executor, &downloader, "http://api.test");

        let result = verifier.verify_from_sources(
            &file,
            sig.to_str().expect("utf-8"),
            key.to_str().expect("utf-8"),
        );
        assert!(matches!(
            result,
            Err(ManagerError::VerificationFailed { message }) if message.contains("BAD signature")
        ));
    }
}
