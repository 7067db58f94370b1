//! SHA-256 digest computation for downloaded archives.
//!
//! Hashing reads the file incrementally so large runtime archives never
//! need to fit in memory. The digest type is only ever produced by
//! hashing, so its hex form is valid by construction; caller-supplied
//! expectations stay plain strings and are compared case-insensitively.

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// A hex-encoded SHA-256 digest produced by [`compute_sha256`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Returns the digest as a lowercase hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compares this digest against a caller-supplied expectation,
    /// ignoring ASCII case.
    #[must_use]
    pub fn matches(&self, expected: &str) -> bool {
        self.0.eq_ignore_ascii_case(expected)
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Computes the SHA-256 digest of the file at `path`.
///
/// # Errors
///
/// Returns [`ManagerError::Io`](crate::error::ManagerError::Io) if the
/// file cannot be opened or read.
pub fn compute_sha256(path: &Path) -> Result<Sha256Digest> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(Sha256Digest(format!("{:x}", hasher.finalize())))
}
