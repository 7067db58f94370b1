//! Filesystem-backed registry of installed runtime versions.
//!
//! The install root holds one subdirectory per installed version plus a
//! `.default` record naming the active selection. A version exists iff
//! its directory exists; there is no other bookkeeping. The registry
//! takes no locks; concurrent mutation of the same version id from
//! independent callers is a documented race.

use crate::error::{ManagerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::io::ErrorKind;

/// Name of the provenance marker file inside an installed version.
pub const PROVENANCE_MARKER: &str = ".installed-by";

/// Name of the default-pointer record inside the install root.
pub const DEFAULT_POINTER: &str = ".default";

/// Candidate launcher locations inside an installed version, in probe
/// order.
const RUNTIME_BIN_CANDIDATES: [&str; 5] = [
    "dist/bin/wine",
    "dist/bin/wine64",
    "dist/bin/proton",
    "proton",
    "bin/wine",
];

/// The result of a version presence check.
///
/// `is_installed` collapses this to a boolean for compatibility with
/// the historical behaviour; callers that need to distinguish a missing
/// directory from an unreadable one inspect this instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    /// The version directory exists.
    Present,
    /// Nothing exists at the version's path (or a non-directory does).
    Absent,
    /// The path could not be inspected (permissions, I/O failure).
    Inaccessible {
        /// Description of the underlying error.
        reason: String,
    },
}

/// Filesystem-backed store of installed versions and the default
/// pointer.
#[derive(Debug, Clone)]
pub struct RuntimeStore {
    root: Utf8PathBuf,
}

impl RuntimeStore {
    /// Creates a store rooted at `root`. The directory is created
    /// lazily by the operations that need it.
    #[must_use]
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    /// Returns the install root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Creates the install root if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Io`] if the directory cannot be created.
    pub fn ensure_root(&self) -> Result<()> {
        std::fs::create_dir_all(self.root.as_std_path())?;
        Ok(())
    }

    /// Returns the directory a version occupies (whether or not it is
    /// installed).
    #[must_use]
    pub fn version_dir(&self, version: &str) -> Utf8PathBuf {
        self.root.join(version)
    }

    /// Lists the installed version ids, one per subdirectory of the
    /// install root. Order is filesystem-dependent.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Io`] if the root cannot be created or
    /// read.
    pub fn list_installed(&self) -> Result<Vec<String>> {
        self.ensure_root()?;
        let mut versions = Vec::new();
        for entry in std::fs::read_dir(self.root.as_std_path())? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                versions.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(versions)
    }

    /// Inspects whether a version is installed, distinguishing absence
    /// from inaccessibility.
    #[must_use]
    pub fn presence(&self, version: &str) -> Presence {
        match std::fs::metadata(self.version_dir(version).as_std_path()) {
            Ok(meta) if meta.is_dir() => Presence::Present,
            Ok(_) => Presence::Absent,
            Err(e) if e.kind() == ErrorKind::NotFound => Presence::Absent,
            Err(e) => Presence::Inaccessible {
                reason: e.to_string(),
            },
        }
    }

    /// Returns true if the version's directory exists.
    ///
    /// Any failure to inspect the path is reported as `false`; use
    /// [`Self::presence`] to tell the cases apart.
    #[must_use]
    pub fn is_installed(&self, version: &str) -> bool {
        match self.presence(version) {
            Presence::Present => true,
            Presence::Absent => false,
            Presence::Inaccessible { reason } => {
                log::debug!("treating version {version} as absent: {reason}");
                false
            }
        }
    }

    /// Overwrites the default pointer with `version`.
    ///
    /// No check is made that the version is installed; the record is a
    /// bare string.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Io`] if the record cannot be written.
    pub fn set_default(&self, version: &str) -> Result<()> {
        self.ensure_root()?;
        std::fs::write(self.root.join(DEFAULT_POINTER).as_std_path(), version)?;
        Ok(())
    }

    /// Reads the default pointer, trimmed of surrounding whitespace.
    ///
    /// Returns `Ok(None)` when no record exists; read failures surface
    /// as errors, unlike [`Self::get_default`].
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Io`] if the record exists but cannot be
    /// read.
    pub fn read_default(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(self.root.join(DEFAULT_POINTER).as_std_path()) {
            Ok(content) => Ok(Some(content.trim().to_owned())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ManagerError::Io(e)),
        }
    }

    /// Returns the default version id, or `None` when the record is
    /// missing or unreadable.
    #[must_use]
    pub fn get_default(&self) -> Option<String> {
        match self.read_default() {
            Ok(value) => value,
            Err(e) => {
                log::debug!("treating default pointer as unset: {e}");
                None
            }
        }
    }

    /// Recursively deletes a version's directory. Removing an absent
    /// version is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Io`] for failures other than the
    /// directory already being absent.
    pub fn remove(&self, version: &str) -> Result<()> {
        match std::fs::remove_dir_all(self.version_dir(version).as_std_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Locates the runtime launcher binary inside an installed version,
    /// probing the known layouts in order.
    #[must_use]
    pub fn find_runtime_bin(&self, version: &str) -> Option<Utf8PathBuf> {
        let base = self.version_dir(version);
        RUNTIME_BIN_CANDIDATES
            .iter()
            .map(|candidate| base.join(candidate))
            .find(|path| path.is_file())
    }
}
