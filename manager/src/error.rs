//! Error types for the goblet runtime manager.
//!
//! This module defines the crate-wide error taxonomy. Every failure mode a
//! consuming façade needs to distinguish (HTTP status mapping, exit codes)
//! has its own variant with enough context to report the failure without
//! re-deriving it.

use thiserror::Error;

/// Errors that can occur while acquiring, verifying, or registering
/// runtime versions.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An HTTP transfer failed: connection error or non-success final
    /// status.
    #[error("download failed for {url}: {reason}")]
    Network {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// Redirect following exceeded the hop limit.
    #[error("too many redirects for {url} (limit {limit})")]
    RedirectLimit {
        /// The URL the chain started from.
        url: String,
        /// The maximum number of hops allowed.
        limit: u32,
    },

    /// The operation was cancelled via its [`CancelToken`].
    ///
    /// [`CancelToken`]: crate::cancel::CancelToken
    #[error("operation cancelled")]
    Cancelled,

    /// A downloaded file's SHA-256 digest did not match the expected
    /// value. The offending file has already been deleted.
    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Path the file was downloaded to.
        path: String,
        /// The caller-supplied expected digest.
        expected: String,
        /// The digest actually computed from the file.
        actual: String,
    },

    /// A public key reference matched none of the supported forms.
    #[error("unsupported public key source: {reference}")]
    UnsupportedKeySource {
        /// The reference as supplied by the caller.
        reference: String,
    },

    /// A release contained no asset that looks like a public key.
    #[error("no public key asset found in release {release}")]
    NoKeyAsset {
        /// The `owner/repo[@tag]` release that was searched.
        release: String,
    },

    /// A key reference used a supported form but was malformed.
    #[error("invalid key reference {reference}: {reason}")]
    InvalidReference {
        /// The reference as supplied by the caller.
        reference: String,
        /// Why it could not be parsed.
        reason: String,
    },

    /// A required external tool is not installed or not on `PATH`.
    #[error("required tool not available: {tool}")]
    ToolUnavailable {
        /// Name of the missing binary.
        tool: String,
    },

    /// An external tool ran but exited non-zero during a supporting
    /// operation (key import, export, keyserver fetch).
    #[error("{tool} {operation} failed: {message}")]
    ToolInvocationFailed {
        /// Name of the binary that failed.
        tool: String,
        /// The operation being performed (e.g. `import`).
        operation: &'static str,
        /// The tool's diagnostic output.
        message: String,
    },

    /// An external tool did not complete within its deadline and was
    /// killed.
    #[error("{tool} timed out after {seconds}s")]
    ToolTimeout {
        /// Name of the binary that was killed.
        tool: String,
        /// The deadline that expired, in seconds.
        seconds: u64,
    },

    /// A detached-signature check was explicitly rejected.
    #[error("signature verification failed: {message}")]
    VerificationFailed {
        /// The verification tool's diagnostic output.
        message: String,
    },

    /// The external extraction tool exited non-zero.
    #[error("archive extraction failed: {message}")]
    ExtractionFailed {
        /// The extraction tool's diagnostic output.
        message: String,
    },
}

/// Result type alias using [`ManagerError`].
pub type Result<T> = std::result::Result<T, ManagerError>;
