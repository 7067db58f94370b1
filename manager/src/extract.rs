//! Archive extraction via the external `tar` binary.
//!
//! Extraction is delegated to the system `tar`, which handles the
//! compression formats runtime archives ship in (`.tar.gz`, `.tar.xz`,
//! …) without this crate linking any codec. The archive's single
//! top-level directory component is stripped so the inner content
//! becomes the version root.

use crate::error::{ManagerError, Result};
use crate::executor::{CommandExecutor, diagnostic, path_arg};
use camino::Utf8Path;
use std::path::Path;

/// Name of the external extraction binary.
pub const TAR_BIN: &str = "tar";

/// Trait for extracting runtime archives, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor {
    /// Extracts the archive at `archive` into `dest`, stripping the
    /// first path component of every entry.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::ToolUnavailable`] when the extraction
    /// binary is missing and [`ManagerError::ExtractionFailed`] when it
    /// exits non-zero.
    fn extract(&self, archive: &Path, dest: &Utf8Path) -> Result<()>;
}

/// Extractor invoking the system `tar` binary.
pub struct TarExtractor<'a> {
    executor: &'a dyn CommandExecutor,
}

impl<'a> TarExtractor<'a> {
    /// Creates an extractor running `tar` through the given executor.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self { executor }
    }
}

impl ArchiveExtractor for TarExtractor<'_> {
    fn extract(&self, archive: &Path, dest: &Utf8Path) -> Result<()> {
        let output = self.executor.run(
            TAR_BIN,
            &[
                "-xf",
                path_arg(archive)?,
                "-C",
                dest.as_str(),
                "--strip-components=1",
            ],
        )?;
        if !output.status.success() {
            return Err(ManagerError::ExtractionFailed {
                message: diagnostic(&output),
            });
        }
        Ok(())
    }
}
