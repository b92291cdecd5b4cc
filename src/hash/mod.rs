// Checksum engine
// Digest computation, tree enumeration, manifest encoding and validation

pub mod cancel;
pub mod database;
pub mod enumerate;
pub mod error;
pub mod hash;
pub mod path_utils;
pub mod scan;
pub mod verify;

// Re-export commonly used types for convenience
pub use cancel::CancelFlag;
pub use database::Manifest;
pub use error::ChecksumError;
pub use hash::{Algorithm, Digest, FileDigester, HashContext, DEFAULT_CHUNK_SIZE};
pub use scan::ChecksumEngine;
pub use verify::{compare, Discrepancy, ValidationResult, Validator};
