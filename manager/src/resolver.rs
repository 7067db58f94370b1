//! Public key resolution.
//!
//! Turns a parsed [`PublicKeySource`] into a local key file: a direct
//! download, a release-asset lookup against the configurable
//! release-metadata API, a keyserver fetch through an ephemeral trust
//! domain, or a local copy. Every successful branch leaves exactly one
//! key file at the destination the caller supplied.

use crate::download::Downloader;
use crate::error::{ManagerError, Result};
use crate::executor::CommandExecutor;
use crate::keysource::PublicKeySource;
use crate::trust::{EphemeralTrustDomain, OpenPgpTool};
use serde::Deserialize;
use std::path::Path;

/// A release as returned by the release-metadata API. Only the asset
/// list is of interest.
#[derive(Debug, Deserialize)]
struct Release {
    #[serde(default)]
    assets: Vec<ReleaseAsset>,
}

/// One downloadable asset attached to a release.
#[derive(Debug, Deserialize)]
struct ReleaseAsset {
    name: String,
    browser_download_url: String,
}

/// Resolves public key references into local key files.
pub struct KeyResolver<'a> {
    downloader: &'a dyn Downloader,
    executor: &'a dyn CommandExecutor,
    release_api_base: String,
}

impl<'a> KeyResolver<'a> {
    /// Creates a resolver querying releases against `release_api_base`.
    #[must_use]
    pub fn new(
        downloader: &'a dyn Downloader,
        executor: &'a dyn CommandExecutor,
        release_api_base: impl Into<String>,
    ) -> Self {
        Self {
            downloader,
            executor,
            release_api_base: release_api_base.into(),
        }
    }

    /// Resolves `source` into a key file at `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NoKeyAsset`] when a release holds no
    /// key-like asset, [`ManagerError::ToolUnavailable`] when a
    /// keyserver fetch needs a missing OpenPGP tool,
    /// [`ManagerError::UnsupportedKeySource`] when a local reference
    /// names no existing file, and network/tool errors from the
    /// underlying transfers.
    pub fn resolve(&self, source: &PublicKeySource, dest: &Path) -> Result<()> {
        match source {
            PublicKeySource::RawUrl(url) => self.downloader.fetch(url, dest, None),
            PublicKeySource::RepoRelease { owner, repo, tag } => {
                self.resolve_release_asset(owner, repo, tag.as_deref(), dest)
            }
            PublicKeySource::KeyServer { key_id } => self.resolve_from_keyserver(key_id, dest),
            PublicKeySource::LocalPath(path) => {
                if !path.exists() {
                    return Err(ManagerError::UnsupportedKeySource {
                        reference: path.display().to_string(),
                    });
                }
                std::fs::copy(path, dest)?;
                Ok(())
            }
        }
    }

    /// Queries the release-metadata API and downloads the first asset
    /// that looks like a public key.
    fn resolve_release_asset(
        &self,
        owner: &str,
        repo: &str,
        tag: Option<&str>,
        dest: &Path,
    ) -> Result<()> {
        let base = &self.release_api_base;
        let release_url = match tag {
            Some(tag) => format!("{base}/repos/{owner}/{repo}/releases/tags/{tag}"),
            None => format!("{base}/repos/{owner}/{repo}/releases/latest"),
        };

        let body = self.downloader.fetch_text(&release_url)?;
        let release: Release =
            serde_json::from_str(&body).map_err(|e| ManagerError::Network {
                url: release_url.clone(),
                reason: format!("invalid release metadata: {e}"),
            })?;

        let asset = release
            .assets
            .iter()
            .find(|asset| looks_like_public_key(&asset.name))
            .ok_or_else(|| ManagerError::NoKeyAsset {
                release: release_label(owner, repo, tag),
            })?;

        log::debug!("selected key asset {} from {release_url}", asset.name);
        self.downloader.fetch(&asset.browser_download_url, dest, None)
    }

    /// Fetches a key from the public keyserver and writes its armored
    /// export to `dest`. The trust domain used for the fetch is
    /// discarded on every exit path.
    fn resolve_from_keyserver(&self, key_id: &str, dest: &Path) -> Result<()> {
        let gpg = OpenPgpTool::new(self.executor);
        gpg.ensure_available()?;

        let domain = EphemeralTrustDomain::new()?;
        gpg.recv_key(&domain, key_id)?;
        let armor = gpg.export_armored(&domain, key_id)?;
        std::fs::write(dest, armor)?;
        Ok(())
    }
}

/// Heuristic for release assets that plausibly hold a public key:
/// an `.asc`/`.sig` extension, or a name containing `pub`
/// (case-insensitive, which also covers `public`).
fn looks_like_public_key(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.ends_with(".asc") || name.ends_with(".sig") || name.contains("pub")
}

/// Formats a release as `owner/repo[@tag]` for error reporting.
fn release_label(owner: &str, repo: &str, tag: Option<&str>) -> String {
    match tag {
        Some(tag) => format!("{owner}/{repo}@{tag}"),
        None => format!("{owner}/{repo}"),
    }
}
