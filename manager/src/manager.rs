//! Facade wiring the pipeline components together.
//!
//! [`Manager`] owns the production implementations (blocking HTTP
//! downloader, system command executor) configured from one
//! [`ManagerConfig`], and exposes the operation surface consumed by the
//! REST façade and CLI scripts that sit outside this crate. Components
//! remain individually constructible for callers that want to inject
//! their own.

use crate::cancel::CancelToken;
use crate::config::ManagerConfig;
use crate::download::HttpDownloader;
use crate::error::Result;
use crate::executor::SystemCommandExecutor;
use crate::extract::TarExtractor;
use crate::install::Installer;
use crate::registry::{Presence, RuntimeStore};
use crate::verifier::SignatureVerifier;
use camino::Utf8PathBuf;
use std::path::Path;

/// The assembled runtime manager.
pub struct Manager {
    config: ManagerConfig,
    store: RuntimeStore,
    downloader: HttpDownloader,
    executor: SystemCommandExecutor,
    cancel: CancelToken,
}

impl Manager {
    /// Assembles a manager from the given configuration.
    #[must_use]
    pub fn new(config: ManagerConfig) -> Self {
        let cancel = CancelToken::new();
        let store = RuntimeStore::new(config.install_root.clone());
        let downloader = HttpDownloader::new(config.http_timeout, cancel.clone());
        let executor = SystemCommandExecutor::new(config.tool_timeout, cancel.clone());
        Self {
            config,
            store,
            downloader,
            executor,
            cancel,
        }
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Returns the underlying version registry.
    #[must_use]
    pub fn store(&self) -> &RuntimeStore {
        &self.store
    }

    /// Returns a handle that cancels in-flight downloads and pending
    /// tool invocations when triggered.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Lists installed version ids.
    ///
    /// # Errors
    ///
    /// See [`RuntimeStore::list_installed`].
    pub fn list_installed(&self) -> Result<Vec<String>> {
        self.store.list_installed()
    }

    /// Returns true if the version's directory exists.
    #[must_use]
    pub fn is_installed(&self, version: &str) -> bool {
        self.store.is_installed(version)
    }

    /// Inspects a version's presence, distinguishing absence from
    /// inaccessibility.
    #[must_use]
    pub fn presence(&self, version: &str) -> Presence {
        self.store.presence(version)
    }

    /// Returns the default version id, if one is recorded.
    #[must_use]
    pub fn get_default(&self) -> Option<String> {
        self.store.get_default()
    }

    /// Overwrites the default pointer.
    ///
    /// # Errors
    ///
    /// See [`RuntimeStore::set_default`].
    pub fn set_default(&self, version: &str) -> Result<()> {
        self.store.set_default(version)
    }

    /// Removes an installed version. Idempotent.
    ///
    /// # Errors
    ///
    /// See [`RuntimeStore::remove`].
    pub fn remove(&self, version: &str) -> Result<()> {
        self.store.remove(version)
    }

    /// Locates the runtime launcher binary inside an installed version.
    #[must_use]
    pub fn find_runtime_bin(&self, version: &str) -> Option<Utf8PathBuf> {
        self.store.find_runtime_bin(version)
    }

    /// Installs a local archive as `version`.
    ///
    /// # Errors
    ///
    /// See [`Installer::install_from_archive`].
    pub fn install_from_archive(&self, archive: &Path, version: &str) -> Result<Utf8PathBuf> {
        let extractor = TarExtractor::new(&self.executor);
        Installer::new(&self.store, &self.downloader, &extractor)
            .install_from_archive(archive, version)
    }

    /// Downloads an archive and installs it as `version`, enforcing
    /// `expected` as the archive's SHA-256 checksum when supplied.
    ///
    /// # Errors
    ///
    /// See [`Installer::install_from_url`].
    pub fn install_from_url(
        &self,
        version: &str,
        url: &str,
        expected: Option<&str>,
    ) -> Result<Utf8PathBuf> {
        let extractor = TarExtractor::new(&self.executor);
        Installer::new(&self.store, &self.downloader, &extractor)
            .install_from_url(version, url, expected)
    }

    /// Verifies a file against a detached signature and public key,
    /// each given as a URL, shorthand, or local path.
    ///
    /// # Errors
    ///
    /// See [`SignatureVerifier::verify_from_sources`].
    pub fn verify_from_sources(
        &self,
        file: &Path,
        signature_ref: &str,
        public_key_ref: &str,
    ) -> Result<()> {
        SignatureVerifier::new(
            &self.executor,
            &self.downloader,
            self.config.release_api_base.clone(),
        )
        .verify_from_sources(file, signature_ref, public_key_ref)
    }
}
