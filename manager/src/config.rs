//! Explicit configuration for the runtime manager.
//!
//! Every knob is an explicit field injected into component
//! constructors rather than an environment read, so the core stays
//! testable without mutating shared process state.

use camino::{Utf8Path, Utf8PathBuf};
use directories_next::ProjectDirs;
use std::time::Duration;

/// Public release-metadata API used when no override is configured.
pub const DEFAULT_RELEASE_API_BASE: &str = "https://api.github.com";

/// Default deadline for a single HTTP transfer.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default deadline for a single external-tool invocation.
const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration for the runtime manager.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use goblet_manager::config::ManagerConfig;
///
/// let config = ManagerConfig::new(Utf8PathBuf::from("/tmp/runtimes"));
/// assert_eq!(config.install_root.as_str(), "/tmp/runtimes");
/// ```
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Root directory holding one subdirectory per installed version.
    pub install_root: Utf8PathBuf,
    /// Base URL of the release-metadata API, for private mirrors or
    /// tests.
    pub release_api_base: String,
    /// Deadline for a single HTTP transfer.
    pub http_timeout: Duration,
    /// Deadline for a single external-tool invocation.
    pub tool_timeout: Duration,
}

impl ManagerConfig {
    /// Creates a configuration with the given install root and default
    /// values for everything else.
    #[must_use]
    pub fn new(install_root: Utf8PathBuf) -> Self {
        Self {
            install_root,
            release_api_base: DEFAULT_RELEASE_API_BASE.to_owned(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// Replaces the release-metadata API base.
    #[must_use]
    pub fn with_release_api_base(mut self, base: impl Into<String>) -> Self {
        self.release_api_base = base.into();
        self
    }

    /// Replaces the HTTP transfer deadline.
    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Replaces the external-tool deadline.
    #[must_use]
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    /// Returns the install root as a path.
    #[must_use]
    pub fn install_root(&self) -> &Utf8Path {
        &self.install_root
    }
}

/// Returns the platform-specific default install root.
///
/// - Linux: `~/.local/share/goblet/runtimes`
/// - macOS: `~/Library/Application Support/goblet/runtimes`
/// - Windows: `%APPDATA%\goblet\data\runtimes`
///
/// Returns `None` if the platform's data directory cannot be determined
/// or is not valid UTF-8.
#[must_use]
pub fn default_install_root() -> Option<Utf8PathBuf> {
    ProjectDirs::from("", "", "goblet")
        .and_then(|dirs| Utf8PathBuf::try_from(dirs.data_dir().to_path_buf()).ok())
        .map(|dir| dir.join("runtimes"))
}
