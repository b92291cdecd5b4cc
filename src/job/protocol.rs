// Job protocol
// Messages between a coordinator and a digesting worker, one JSON object per line across processes

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::hash::{Algorithm, ChecksumError, ValidationResult};

/// Work a job performs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    /// Digest `files` and write `checksum.<ext>` into `output_directory`
    Generate {
        files: Vec<PathBuf>,
        algorithm: Algorithm,
        output_directory: PathBuf,
    },
    /// Digest `files` and compare against the manifest at `manifest_path`
    Validate {
        files: Vec<PathBuf>,
        manifest_path: PathBuf,
    },
}

/// Message sent to the worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Run { operation: Operation },
    CancelAll,
}

/// Message sent back by the worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Overall fraction complete for the running job
    Progress { fraction: f64 },
    /// Terminal message; exactly one per job
    Finished { outcome: JobOutcome },
}

/// Terminal result of a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Generated { output_path: PathBuf },
    Validated { result: ValidationResult },
    Failed { failure: JobFailure },
    Cancelled,
}

impl JobOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobOutcome::Cancelled)
    }
}

impl From<ChecksumError> for JobOutcome {
    fn from(err: ChecksumError) -> Self {
        if err.is_cancelled() {
            JobOutcome::Cancelled
        } else {
            JobOutcome::Failed {
                failure: JobFailure::from(&err),
            }
        }
    }
}

/// Failure category carried across the process boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Io,
    NotFound,
    InvalidRow,
    InvalidChecksum,
    InvalidEncoding,
    UnsupportedExtension,
    UnsupportedAlgorithm,
    NoCommonPath,
    /// The worker went away or spoke garbage
    Worker,
}

/// Tagged failure with a one-line description naming the file or condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl JobFailure {
    pub fn worker(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Worker,
            message: message.into(),
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<&ChecksumError> for JobFailure {
    fn from(err: &ChecksumError) -> Self {
        let kind = match err {
            ChecksumError::Io { .. } => FailureKind::Io,
            ChecksumError::NotFound { .. } => FailureKind::NotFound,
            ChecksumError::InvalidRow { .. } => FailureKind::InvalidRow,
            ChecksumError::InvalidChecksum { .. } => FailureKind::InvalidChecksum,
            ChecksumError::InvalidEncoding => FailureKind::InvalidEncoding,
            ChecksumError::UnsupportedExtension { .. } => FailureKind::UnsupportedExtension,
            ChecksumError::UnsupportedAlgorithm { .. } => FailureKind::UnsupportedAlgorithm,
            ChecksumError::NoCommonPath => FailureKind::NoCommonPath,
            // Callers map cancellation to JobOutcome::Cancelled first
            ChecksumError::Cancelled => FailureKind::Worker,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// Serialize a message as one protocol line (without the newline)
pub fn encode_line<T: Serialize>(message: &T) -> serde_json::Result<String> {
    serde_json::to_string(message)
}

/// Parse one protocol line
pub fn decode_line<T: for<'de> Deserialize<'de>>(line: &str) -> serde_json::Result<T> {
    serde_json::from_str(line.trim())
}
