// Cooperative cancellation shared between a job and whoever may stop it

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::error::ChecksumError;

/// Cloneable cancellation signal
///
/// Digesting code polls the flag at chunk and file boundaries; an in-flight
/// read is never interrupted
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; every clone observes it
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Checkpoint: `Err(Cancelled)` once cancellation was requested
    pub fn check(&self) -> Result<(), ChecksumError> {
        if self.is_cancelled() {
            Err(ChecksumError::Cancelled)
        } else {
            Ok(())
        }
    }
}
