// Centralized error handling module
// Every failure names the file, line or condition that caused it

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the checksum engine
#[derive(Debug, Error)]
pub enum ChecksumError {
    /// Open, read, write or stat failure
    #[error("I/O error while {operation}{}: {source}", display_path(.path))]
    Io {
        path: Option<PathBuf>,
        operation: String,
        #[source]
        source: io::Error,
    },

    /// An input path does not exist
    #[error("File not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// A manifest line does not have the `<hex>  <path>` shape
    #[error("Invalid manifest row at line {line}: {content:?}")]
    InvalidRow { line: usize, content: String },

    /// The digest column of a manifest line is not valid hex
    #[error("Invalid checksum at line {line}: {value:?}")]
    InvalidChecksum { line: usize, value: String },

    /// Manifest bytes are not UTF-8 text
    #[error("Manifest is not valid UTF-8 text")]
    InvalidEncoding,

    /// No algorithm is associated with a manifest file extension
    #[error("Unsupported checksum type for .{extension}")]
    UnsupportedExtension { extension: String },

    /// Unknown algorithm name
    #[error("Unsupported hash algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    /// The input set has no shared ancestor directory
    #[error("Failed to find a common path for the input files")]
    NoCommonPath,

    /// The operation was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" {}", p.display()),
        None => String::new(),
    }
}

impl ChecksumError {
    /// Create an error with context about the operation and optional path
    pub fn from_io_error(err: io::Error, operation: &str, path: Option<PathBuf>) -> Self {
        match (err.kind(), path) {
            (io::ErrorKind::NotFound, Some(path)) => ChecksumError::NotFound { path },
            (_, path) => ChecksumError::Io {
                path,
                operation: operation.to_string(),
                source: err,
            },
        }
    }

    /// True for user-initiated cancellation, which callers report silently
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ChecksumError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, ChecksumError>;
