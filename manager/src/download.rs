//! Fetch-to-file downloads with redirect following and checksum
//! enforcement.
//!
//! Provides a trait-based abstraction for HTTP retrieval, enabling
//! dependency injection for testing. The production implementation
//! follows redirects manually and iteratively, bounded by a hop cap, so
//! a misbehaving server can never drive unbounded recursion.
//!
//! The destination file invariant: after [`Downloader::fetch`] returns,
//! the file either exists with content matching the expected checksum
//! (when one was supplied), or does not exist at all. Partial or
//! mismatched content is always deleted before the error surfaces.

use crate::cancel::CancelToken;
use crate::digest::compute_sha256;
use crate::error::{ManagerError, Result};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

/// User agent sent with every request.
pub const USER_AGENT: &str = "goblet-manager/0.1";

/// Maximum number of redirect hops followed before giving up.
pub const MAX_REDIRECT_HOPS: u32 = 5;

/// Buffer size for streaming response bodies to disk.
const COPY_BUF_LEN: usize = 8192;

/// Trait for downloading remote resources.
///
/// Abstractions allow tests to substitute stub transfers without
/// network access.
pub trait Downloader {
    /// Downloads `url` to `dest`, following redirects.
    ///
    /// When `expected` is supplied, the file's SHA-256 hex digest is
    /// compared against it case-insensitively after the transfer; a
    /// mismatch deletes the file.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Network`] for connection failures and
    /// non-success final statuses, [`ManagerError::RedirectLimit`] when
    /// the hop cap is exceeded, and
    /// [`ManagerError::ChecksumMismatch`] when the downloaded content
    /// does not match `expected`. On any failure no file is left at
    /// `dest`.
    fn fetch(&self, url: &str, dest: &Path, expected: Option<&str>) -> Result<()>;

    /// Downloads `url` and returns the body as a string, following
    /// redirects.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Network`] for connection failures,
    /// non-success final statuses, and unreadable bodies.
    fn fetch_text(&self, url: &str) -> Result<String>;
}

/// HTTP-based downloader using a blocking `ureq` agent.
///
/// Redirects are disabled at the agent level and followed manually so
/// the hop count stays bounded and the same checksum policy applies to
/// the final response regardless of how many hops preceded it.
pub struct HttpDownloader {
    agent: ureq::Agent,
    cancel: CancelToken,
}

impl HttpDownloader {
    /// Creates a downloader with the given per-transfer deadline and
    /// cancellation token.
    #[must_use]
    pub fn new(timeout: Duration, cancel: CancelToken) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .max_redirects(0)
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            cancel,
        }
    }

    /// Issues GET requests until a non-redirect response is obtained or
    /// the hop cap is exceeded.
    fn follow_redirects(&self, start: &str) -> Result<ureq::http::Response<ureq::Body>> {
        let mut current = start.to_owned();
        for _ in 0..=MAX_REDIRECT_HOPS {
            self.cancel.ensure_active()?;
            let response = self
                .agent
                .get(&current)
                .header("user-agent", USER_AGENT)
                .call()
                .map_err(|e| ManagerError::Network {
                    url: current.clone(),
                    reason: e.to_string(),
                })?;

            let status = response.status();
            if status.is_redirection() {
                let next = redirect_target(&current, &response)?;
                log::debug!("following redirect {current} -> {next}");
                current = next;
                continue;
            }
            if !status.is_success() {
                return Err(ManagerError::Network {
                    url: current,
                    reason: format!("HTTP status {}", status.as_u16()),
                });
            }
            return Ok(response);
        }
        Err(ManagerError::RedirectLimit {
            url: start.to_owned(),
            limit: MAX_REDIRECT_HOPS,
        })
    }

    /// Streams a response body to `dest`, deleting the partial file on
    /// any failure.
    fn stream_to_file(
        &self,
        response: ureq::http::Response<ureq::Body>,
        dest: &Path,
    ) -> Result<()> {
        let mut file = std::fs::File::create(dest)?;
        let mut body = response.into_body();
        let mut reader = body.as_reader();
        let mut buffer = [0u8; COPY_BUF_LEN];
        loop {
            if self.cancel.is_cancelled() {
                drop(file);
                remove_partial(dest);
                return Err(ManagerError::Cancelled);
            }
            let bytes_read = match reader.read(&mut buffer) {
                Ok(n) => n,
                Err(e) => {
                    drop(file);
                    remove_partial(dest);
                    return Err(e.into());
                }
            };
            if bytes_read == 0 {
                break;
            }
            if let Err(e) = file.write_all(&buffer[..bytes_read]) {
                drop(file);
                remove_partial(dest);
                return Err(e.into());
            }
        }
        Ok(())
    }
}

impl Downloader for HttpDownloader {
    fn fetch(&self, url: &str, dest: &Path, expected: Option<&str>) -> Result<()> {
        let response = self.follow_redirects(url)?;
        self.stream_to_file(response, dest)?;

        if let Some(expected) = expected {
            let actual = match compute_sha256(dest) {
                Ok(digest) => digest,
                Err(e) => {
                    remove_partial(dest);
                    return Err(e);
                }
            };
            if !actual.matches(expected) {
                remove_partial(dest);
                log::warn!("checksum mismatch for {url}");
                return Err(ManagerError::ChecksumMismatch {
                    path: dest.display().to_string(),
                    expected: expected.to_owned(),
                    actual: actual.as_str().to_owned(),
                });
            }
        }
        Ok(())
    }

    fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.follow_redirects(url)?;
        response
            .into_body()
            .read_to_string()
            .map_err(|e| ManagerError::Network {
                url: url.to_owned(),
                reason: e.to_string(),
            })
    }
}

/// Resolves the target of a redirect response against the current URL.
fn redirect_target(
    current: &str,
    response: &ureq::http::Response<ureq::Body>,
) -> Result<String> {
    let network_error = |reason: String| ManagerError::Network {
        url: current.to_owned(),
        reason,
    };

    let location = response
        .headers()
        .get(ureq::http::header::LOCATION)
        .ok_or_else(|| network_error("redirect status without location header".to_owned()))?;
    let location = location
        .to_str()
        .map_err(|e| network_error(format!("invalid location header: {e}")))?;
    let base = url::Url::parse(current)
        .map_err(|e| network_error(format!("invalid redirect base: {e}")))?;
    let next = base
        .join(location)
        .map_err(|e| network_error(format!("invalid redirect target {location}: {e}")))?;
    Ok(next.into())
}

/// Best-effort removal of a partially written destination file.
fn remove_partial(dest: &Path) {
    if let Err(e) = std::fs::remove_file(dest)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        log::debug!("failed to remove partial download {}: {e}", dest.display());
    }
}
