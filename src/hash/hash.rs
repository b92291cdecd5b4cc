// Hash computation module
// Algorithm selection, incremental digest contexts and chunked file digesting

use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use super::cancel::CancelFlag;
use super::error::{ChecksumError, Result};

/// Default read size for file digesting (1 MiB)
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Legacy and fast, 128-bit
    Md5,
    /// Cryptographically strong, 256-bit
    Sha256,
}

impl Algorithm {
    pub const ALL: [Algorithm; 2] = [Algorithm::Md5, Algorithm::Sha256];

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Md5 => "md5",
            Algorithm::Sha256 => "sha256",
        }
    }

    /// Digest length in bytes
    pub fn output_len(self) -> usize {
        match self {
            Algorithm::Md5 => 16,
            Algorithm::Sha256 => 32,
        }
    }

    /// Extension of manifest files written with this algorithm
    pub fn file_extension(self) -> &'static str {
        self.name()
    }

    /// Select the algorithm for a manifest extension (without the dot)
    ///
    /// Unknown extensions are an error; there is no fallback algorithm
    pub fn from_extension(extension: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.file_extension() == extension)
            .ok_or_else(|| ChecksumError::UnsupportedExtension {
                extension: extension.to_string(),
            })
    }

    /// Select the algorithm from the extension of a manifest file path
    pub fn from_manifest_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_extension(&extension)
    }

    /// Fresh incremental context for this algorithm
    pub fn new_context(self) -> HashContext {
        HashContext::new(self)
    }

    /// One-shot digest of an in-memory buffer
    pub fn digest_bytes(self, data: &[u8]) -> Digest {
        let mut context = self.new_context();
        context.update(data);
        context.finalize()
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = ChecksumError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "md5" => Ok(Algorithm::Md5),
            "sha256" | "sha-256" => Ok(Algorithm::Sha256),
            _ => Err(ChecksumError::UnsupportedAlgorithm {
                algorithm: s.to_string(),
            }),
        }
    }
}

/// Immutable digest bytes; textual form is lowercase hex
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest(Vec<u8>);

impl Digest {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Parse hex text (either case). Empty, odd-length or non-hex input yields `None`
    pub fn from_hex(text: &str) -> Option<Self> {
        match hex::decode(text) {
            Ok(bytes) if !bytes.is_empty() => Some(Self(bytes)),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl TryFrom<String> for Digest {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Digest::from_hex(&value).ok_or_else(|| format!("invalid hex digest: {value:?}"))
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.to_hex()
    }
}

/// Running digest state for one algorithm
///
/// `finalize` consumes the context, so a finished context cannot be fed again
#[derive(Clone)]
pub enum HashContext {
    Md5(Md5),
    Sha256(Sha256),
}

impl HashContext {
    pub fn new(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Md5 => HashContext::Md5(Md5::new()),
            Algorithm::Sha256 => HashContext::Sha256(Sha256::new()),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            HashContext::Md5(_) => Algorithm::Md5,
            HashContext::Sha256(_) => Algorithm::Sha256,
        }
    }

    /// Fold the next chunk into the running digest
    pub fn update(&mut self, data: &[u8]) {
        match self {
            HashContext::Md5(inner) => inner.update(data),
            HashContext::Sha256(inner) => inner.update(data),
        }
    }

    pub fn finalize(self) -> Digest {
        let bytes = match self {
            HashContext::Md5(inner) => inner.finalize().to_vec(),
            HashContext::Sha256(inner) => inner.finalize().to_vec(),
        };
        Digest(bytes)
    }
}

/// Digests one file at a time with bounded chunked reads
#[derive(Debug, Clone)]
pub struct FileDigester {
    chunk_size: usize,
}

impl FileDigester {
    /// Create a new FileDigester with the default chunk size (1 MiB)
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Compute the digest of a file, reporting the fraction read so far
    ///
    /// `on_progress` sees 0.0 before the first read and 1.0 after the last,
    /// including for empty files. The cancel flag is polled before every
    /// read; on cancellation the file is closed and `Cancelled` returned
    pub fn digest<F>(
        &self,
        path: &Path,
        algorithm: Algorithm,
        cancel: &CancelFlag,
        mut on_progress: F,
    ) -> Result<Digest>
    where
        F: FnMut(f64),
    {
        let mut file = File::open(path).map_err(|e| {
            ChecksumError::from_io_error(e, "opening", Some(path.to_path_buf()))
        })?;

        let file_size = file
            .metadata()
            .map_err(|e| ChecksumError::from_io_error(e, "reading metadata of", Some(path.to_path_buf())))?
            .len();

        let mut context = algorithm.new_context();
        let mut buffer = vec![0u8; self.chunk_size];
        let mut bytes_processed = 0u64;

        on_progress(0.0);

        loop {
            cancel.check()?;

            let bytes_read = match file.read(&mut buffer) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(ChecksumError::from_io_error(e, "reading", Some(path.to_path_buf())));
                }
            };
            if bytes_read == 0 {
                break;
            }

            context.update(&buffer[..bytes_read]);
            bytes_processed += bytes_read as u64;
            on_progress(fraction(bytes_processed, file_size));
        }

        on_progress(1.0);

        Ok(context.finalize())
    }
}

impl Default for FileDigester {
    fn default() -> Self {
        Self::new()
    }
}

fn fraction(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    (done as f64 / total as f64).clamp(0.0, 1.0)
}
