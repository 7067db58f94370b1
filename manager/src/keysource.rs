//! Public key reference grammar.
//!
//! A key reference arrives as a single string and is parsed exactly once
//! at the boundary into [`PublicKeySource`]; all downstream code matches
//! on the variant, never on string prefixes.
//!
//! Supported forms:
//!
//! - `http://…` / `https://…` - direct download
//! - `github:<owner>/<repo>[@<tag>]` - pick a key-like asset from a
//!   release
//! - `gpg:<keyId>` / `keyserver:<keyId>` - fetch from the public
//!   keyserver
//! - anything else - treated as a local file path; existence is checked
//!   at resolution time

use crate::error::{ManagerError, Result};
use std::path::PathBuf;

/// Prefix selecting the repository-release shorthand.
const REPO_PREFIX: &str = "github:";

/// Prefixes selecting a keyserver lookup.
const KEYSERVER_PREFIXES: [&str; 2] = ["gpg:", "keyserver:"];

/// Returns true if `reference` is a plain HTTP(S) URL.
pub(crate) fn is_http_url(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// A parsed public key reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKeySource {
    /// A direct HTTP(S) URL to the key file.
    RawUrl(String),
    /// A repository release to scan for a key-like asset.
    RepoRelease {
        /// Repository owner.
        owner: String,
        /// Repository name.
        repo: String,
        /// Release tag; the latest release when absent.
        tag: Option<String>,
    },
    /// A key id to fetch from the public keyserver.
    KeyServer {
        /// The key id or fingerprint to fetch.
        key_id: String,
    },
    /// A path on the local filesystem.
    LocalPath(PathBuf),
}

impl PublicKeySource {
    /// Parses a key reference string into its tagged form.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::InvalidReference`] when a recognised
    /// prefix carries a malformed payload (missing owner or repo, empty
    /// tag, empty key id).
    ///
    /// # Examples
    ///
    /// ```
    /// use goblet_manager::keysource::PublicKeySource;
    ///
    /// let source = PublicKeySource::parse("github:sile/runtimes@v9.0").unwrap();
    /// assert!(matches!(source, PublicKeySource::RepoRelease { .. }));
    /// ```
    pub fn parse(reference: &str) -> Result<Self> {
        if is_http_url(reference) {
            return Ok(Self::RawUrl(reference.to_owned()));
        }

        if let Some(payload) = reference.strip_prefix(REPO_PREFIX) {
            return parse_repo_release(reference, payload);
        }

        for prefix in KEYSERVER_PREFIXES {
            if let Some(key_id) = reference.strip_prefix(prefix) {
                if key_id.is_empty() {
                    return Err(ManagerError::InvalidReference {
                        reference: reference.to_owned(),
                        reason: "empty key id".to_owned(),
                    });
                }
                return Ok(Self::KeyServer {
                    key_id: key_id.to_owned(),
                });
            }
        }

        Ok(Self::LocalPath(PathBuf::from(reference)))
    }
}

/// Parses the payload of a `github:` reference.
fn parse_repo_release(reference: &str, payload: &str) -> Result<PublicKeySource> {
    let invalid = |reason: &str| ManagerError::InvalidReference {
        reference: reference.to_owned(),
        reason: reason.to_owned(),
    };

    let (owner_repo, tag) = match payload.split_once('@') {
        Some((owner_repo, tag)) => {
            if tag.is_empty() {
                return Err(invalid("empty release tag"));
            }
            (owner_repo, Some(tag.to_owned()))
        }
        None => (payload, None),
    };

    let Some((owner, repo)) = owner_repo.split_once('/') else {
        return Err(invalid("expected github:owner/repo[@tag]"));
    };
    if owner.is_empty() || repo.is_empty() {
        return Err(invalid("expected github:owner/repo[@tag]"));
    }

    Ok(PublicKeySource::RepoRelease {
        owner: owner.to_owned(),
        repo: repo.to_owned(),
        tag,
    })
}
