//! Cooperative cancellation
//!
//! A `CancellationToken` is shared by the remote client and the executor and
//! polled before every blocking call. Installing the interrupt handler wires
//! SIGINT/SIGTERM to the token; the handler only flips an atomic flag.

use crate::error::SparseError;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Shared flag signalling that the current run should stop
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Fail with [`SparseError::Cancelled`] once cancellation was requested
    ///
    /// # Errors
    ///
    /// Returns `SparseError::Cancelled` if the token has been cancelled
    pub fn check(&self) -> Result<(), SparseError> {
        if self.is_cancelled() {
            return Err(SparseError::Cancelled);
        }
        Ok(())
    }

    /// Cancel this token when the process receives SIGINT or SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if a signal handler cannot be registered
    pub fn install_interrupt_handler(&self) -> io::Result<()> {
        for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
            signal_hook::flag::register(signal, Arc::clone(&self.flag))?;
        }
        debug!("Interrupt handler installed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancellationToken::new();
        let observer = token.clone();
        assert!(observer.check().is_ok());

        token.cancel();
        assert!(observer.is_cancelled());
        assert!(matches!(observer.check(), Err(SparseError::Cancelled)));
    }
}
