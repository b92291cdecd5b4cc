// Verification module
// Recomputes a manifest for a file set and compares it against an expected one

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::cancel::CancelFlag;
use super::database::Manifest;
use super::error::Result;
use super::hash::{Algorithm, Digest};
use super::scan::ChecksumEngine;

/// First difference found between the expected and the regenerated manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discrepancy {
    CountMismatch { expected: usize, actual: usize },
    MissingFile { path: String },
    ChecksumMismatch { path: String, expected: Digest, actual: Digest },
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::CountMismatch { expected, actual } => write!(
                f,
                "Number of files does not match: expected {}, found {}",
                expected, actual
            ),
            Discrepancy::MissingFile { path } => write!(f, "File {} is missing", path),
            Discrepancy::ChecksumMismatch { path, expected, actual } => write!(
                f,
                "Checksum for {} does not match: expected {}, found {}",
                path, expected, actual
            ),
        }
    }
}

/// Verdict of a validation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ValidationResult {
    /// Every expected entry was regenerated with the same digest
    Match { files: usize },
    Mismatch { discrepancy: Discrepancy },
}

impl ValidationResult {
    pub fn is_match(&self) -> bool {
        matches!(self, ValidationResult::Match { .. })
    }

    pub fn discrepancy(&self) -> Option<&Discrepancy> {
        match self {
            ValidationResult::Match { .. } => None,
            ValidationResult::Mismatch { discrepancy } => Some(discrepancy),
        }
    }
}

/// Compare two manifests, stopping at the first difference
///
/// Counts are checked first, then expected entries in path order. Equal
/// counts plus every expected key present with an equal digest implies the
/// manifests are identical, so no difference goes unreported
pub fn compare(expected: &Manifest, actual: &Manifest) -> ValidationResult {
    if expected.len() != actual.len() {
        return ValidationResult::Mismatch {
            discrepancy: Discrepancy::CountMismatch {
                expected: expected.len(),
                actual: actual.len(),
            },
        };
    }

    for (path, expected_digest) in expected.iter() {
        match actual.get(path) {
            None => {
                return ValidationResult::Mismatch {
                    discrepancy: Discrepancy::MissingFile {
                        path: path.to_string(),
                    },
                };
            }
            Some(actual_digest) if actual_digest != expected_digest => {
                return ValidationResult::Mismatch {
                    discrepancy: Discrepancy::ChecksumMismatch {
                        path: path.to_string(),
                        expected: expected_digest.clone(),
                        actual: actual_digest.clone(),
                    },
                };
            }
            Some(_) => {}
        }
    }

    ValidationResult::Match {
        files: expected.len(),
    }
}

/// Engine for verifying a file set against a manifest
#[derive(Debug, Clone, Default)]
pub struct Validator {
    engine: ChecksumEngine,
}

impl Validator {
    pub fn new(engine: ChecksumEngine) -> Self {
        Self { engine }
    }

    /// Regenerate digests for `inputs` with `algorithm` and compare them to `expected`
    ///
    /// Discrepancies come back as the verdict; I/O failures, cancellation
    /// and invalid inputs are errors
    pub fn validate<P, F>(
        &self,
        inputs: &[P],
        expected: &Manifest,
        algorithm: Algorithm,
        cancel: &CancelFlag,
        on_progress: F,
    ) -> Result<ValidationResult>
    where
        P: AsRef<Path>,
        F: FnMut(f64) + Send,
    {
        let actual = self.engine.generate(inputs, algorithm, cancel, on_progress)?;
        let result = compare(expected, &actual);

        match result.discrepancy() {
            None => tracing::info!("Validation passed for {} files", expected.len()),
            Some(discrepancy) => tracing::info!("Validation failed: {}", discrepancy),
        }

        Ok(result)
    }

    /// Validate against a manifest file; its extension selects the algorithm
    pub fn validate_manifest_file<P, F>(
        &self,
        inputs: &[P],
        manifest_path: &Path,
        cancel: &CancelFlag,
        on_progress: F,
    ) -> Result<ValidationResult>
    where
        P: AsRef<Path>,
        F: FnMut(f64) + Send,
    {
        let algorithm = Algorithm::from_manifest_path(manifest_path)?;
        let expected = Manifest::read_from(manifest_path)?;
        self.validate(inputs, &expected, algorithm, cancel, on_progress)
    }
}

// Tests live in tests/hash/verify_tests.rs
