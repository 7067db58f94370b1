//! Install orchestration: download, extract, register.
//!
//! An install attempt moves through download (with checksum
//! enforcement), extraction into a staging directory, and an atomic
//! rename into the version's final location. No state is persisted
//! between steps; a failed attempt leaves no version directory behind.

use crate::download::Downloader;
use crate::error::{ManagerError, Result};
use crate::extract::ArchiveExtractor;
use crate::registry::{PROVENANCE_MARKER, RuntimeStore};
use camino::{Utf8Path, Utf8PathBuf};
use std::path::Path;
use std::time::SystemTime;

/// Tool name recorded in the provenance marker.
pub const PROVENANCE_TOOL: &str = "goblet";

/// Prefix of staging directories under the install root.
const STAGING_PREFIX: &str = ".staging-";

/// Fallback archive filename when a URL path has no final segment.
const FALLBACK_ARCHIVE_NAME: &str = "archive";

/// Removes a staging directory on drop unless the install completed
/// and the guard was disarmed.
struct StagingGuard {
    path: Utf8PathBuf,
    armed: bool,
}

impl StagingGuard {
    fn new(path: Utf8PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if self.armed
            && let Err(e) = std::fs::remove_dir_all(self.path.as_std_path())
            && e.kind() != std::io::ErrorKind::NotFound
        {
            log::debug!("failed to remove staging directory {}: {e}", self.path);
        }
    }
}

/// Orchestrates archive acquisition and registration.
pub struct Installer<'a> {
    store: &'a RuntimeStore,
    downloader: &'a dyn Downloader,
    extractor: &'a dyn ArchiveExtractor,
}

impl<'a> Installer<'a> {
    /// Creates an installer over the given store, downloader, and
    /// extractor.
    #[must_use]
    pub fn new(
        store: &'a RuntimeStore,
        downloader: &'a dyn Downloader,
        extractor: &'a dyn ArchiveExtractor,
    ) -> Self {
        Self {
            store,
            downloader,
            extractor,
        }
    }

    /// Installs a local archive as `version` and returns the version's
    /// directory.
    ///
    /// The archive is extracted into a staging directory with its
    /// single top-level component stripped, a provenance marker is
    /// written, and the staging directory is renamed into place,
    /// replacing any previous install of the same version. On failure
    /// the staging directory is removed and no version directory
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::ExtractionFailed`] when the extraction
    /// tool exits non-zero, [`ManagerError::ToolUnavailable`] when it
    /// is missing, and [`ManagerError::Io`] for filesystem failures.
    pub fn install_from_archive(&self, archive: &Path, version: &str) -> Result<Utf8PathBuf> {
        self.store.ensure_root()?;

        let staging = self.store.root().join(format!("{STAGING_PREFIX}{version}"));
        remove_stale_dir(&staging)?;
        std::fs::create_dir_all(staging.as_std_path())?;
        let mut guard = StagingGuard::new(staging);

        self.extractor.extract(archive, guard.path())?;

        let marker = format!(
            "{PROVENANCE_TOOL} {}",
            humantime::format_rfc3339_seconds(SystemTime::now())
        );
        std::fs::write(
            guard.path().join(PROVENANCE_MARKER).as_std_path(),
            marker,
        )?;

        let dest = self.store.version_dir(version);
        remove_stale_dir(&dest)?;
        std::fs::rename(guard.path().as_std_path(), dest.as_std_path())?;
        guard.disarm();

        log::info!("installed runtime {version} at {dest}");
        Ok(dest)
    }

    /// Downloads an archive and installs it as `version`.
    ///
    /// The archive lands in a scratch directory that is removed when
    /// this call returns, success or failure. The download filename is
    /// derived from the URL's path. When `expected` is supplied the
    /// download is checksum-enforced.
    ///
    /// # Errors
    ///
    /// Returns the download errors of [`Downloader::fetch`] and the
    /// installation errors of [`Self::install_from_archive`].
    pub fn install_from_url(
        &self,
        version: &str,
        url: &str,
        expected: Option<&str>,
    ) -> Result<Utf8PathBuf> {
        let scratch = tempfile::Builder::new()
            .prefix("goblet-download-")
            .tempdir()?;
        let archive_path = scratch.path().join(archive_filename(url)?);

        self.downloader.fetch(url, &archive_path, expected)?;
        self.install_from_archive(&archive_path, version)
    }
}

/// Derives the download filename from a URL's final path segment.
fn archive_filename(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url).map_err(|e| ManagerError::Network {
        url: url.to_owned(),
        reason: format!("invalid URL: {e}"),
    })?;
    let name = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .unwrap_or(FALLBACK_ARCHIVE_NAME);
    Ok(name.to_owned())
}

/// Removes a directory tree if it exists.
fn remove_stale_dir(dir: &Utf8Path) -> Result<()> {
    match std::fs::remove_dir_all(dir.as_std_path()) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
