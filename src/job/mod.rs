// Job control
// Drives generate/validate jobs on a worker with streamed progress and cancellation

pub mod controller;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod worker;

pub use controller::{JobController, JobHandle, JobState};
pub use error::JobError;
pub use protocol::{FailureKind, JobFailure, JobOutcome, Operation, Request, Response};
pub use transport::{InProcessLauncher, ProcessLauncher, WorkerChannel, WorkerLauncher};
