//! Cooperative cancellation for blocking pipeline operations.
//!
//! All network and subprocess work in this crate is synchronous, so
//! cancellation is a shared flag that long-running loops poll between
//! units of work: the downloader checks it per copied buffer, and the
//! executor checks it before spawning a process.

use crate::error::{ManagerError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cloneable cancellation flag shared between a caller and the
/// pipeline components it drives.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a fresh, un-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on
    /// any clone of this token.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(ManagerError::Cancelled)` if cancellation has been
    /// requested.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Cancelled`] once the token is cancelled.
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(ManagerError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_active() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.ensure_active().is_ok());
    }

    #[test]
    fn cancellation_is_visible_through_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
        assert!(matches!(
            clone.ensure_active(),
            Err(ManagerError::Cancelled)
        ));
    }
}
