use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the job controller itself, as opposed to job failures
/// which are reported through `JobOutcome`
#[derive(Debug, Error)]
pub enum JobError {
    /// A job is still outstanding; wait for its outcome first
    #[error("A job is already running")]
    Busy,

    /// The worker channel is closed
    #[error("Worker is not running")]
    Disconnected,

    #[error("Failed to start worker {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Worker process has no {0} pipe")]
    MissingPipe(&'static str),
}
