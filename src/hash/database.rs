// Manifest module
// Reads and writes plain text manifest files: `<hex-digest>  <relative-path>` per line

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{ChecksumError, Result};
use super::hash::{Algorithm, Digest};

/// Field separator between the digest and the path
const SEPARATOR: &str = "  ";

/// Base name of manifest files written to an output directory
const MANIFEST_STEM: &str = "checksum";

/// Mapping from relative path (forward slashes) to digest
///
/// Entries are kept sorted by path, so encoding never depends on the order
/// in which they were inserted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeMap<String, Digest>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry, returning the previous digest for the path
    pub fn insert(&mut self, path: impl Into<String>, digest: Digest) -> Option<Digest> {
        self.entries.insert(path.into(), digest)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&Digest> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending path order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Digest)> {
        self.entries.iter().map(|(path, digest)| (path.as_str(), digest))
    }

    /// Canonical text form: one `<hex>  <path>\n` line per entry, sorted by path
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (path, digest) in &self.entries {
            out.push_str(&digest.to_hex());
            out.push_str(SEPARATOR);
            out.push_str(path);
            out.push('\n');
        }
        out
    }

    /// Parse manifest text
    ///
    /// Blank lines and `\r\n` endings are tolerated. Each line is split at
    /// the first double space, so paths may contain single spaces. A path
    /// that itself starts with a space cannot be told apart from a wider
    /// separator and is kept verbatim
    pub fn decode(text: &str) -> Result<Self> {
        let mut manifest = Manifest::new();

        for (index, line) in text.split('\n').enumerate() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let (path, digest) = parse_line(line, index + 1)?;
            manifest.insert(path, digest);
        }

        Ok(manifest)
    }

    /// Parse raw manifest bytes, which must be UTF-8
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|_| ChecksumError::InvalidEncoding)?;
        Self::decode(text)
    }

    /// Load and parse a manifest file
    pub fn read_from(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| {
            ChecksumError::from_io_error(e, "reading manifest", Some(path.to_path_buf()))
        })?;
        Self::from_bytes(&bytes)
    }

    /// File name used for manifests of the given algorithm
    pub fn file_name(algorithm: Algorithm) -> String {
        format!("{}.{}", MANIFEST_STEM, algorithm.file_extension())
    }

    /// Write the encoded manifest to `<directory>/checksum.<ext>`, creating
    /// the directory if needed, and return the written path
    pub fn write_to_directory(&self, directory: &Path, algorithm: Algorithm) -> Result<PathBuf> {
        fs::create_dir_all(directory).map_err(|e| {
            ChecksumError::from_io_error(e, "creating output directory", Some(directory.to_path_buf()))
        })?;

        let output = directory.join(Self::file_name(algorithm));
        fs::write(&output, self.encode()).map_err(|e| {
            ChecksumError::from_io_error(e, "writing manifest", Some(output.clone()))
        })?;

        Ok(output)
    }
}

impl FromIterator<(String, Digest)> for Manifest {
    fn from_iter<I: IntoIterator<Item = (String, Digest)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Parse a single manifest line into (path, digest)
/// Expected format: `<hex>  <path>`, the path being everything after the first double space
pub fn parse_line(line: &str, line_number: usize) -> Result<(String, Digest)> {
    let invalid_row = || ChecksumError::InvalidRow {
        line: line_number,
        content: line.to_string(),
    };

    let (checksum, path) = line.split_once(SEPARATOR).ok_or_else(invalid_row)?;

    if checksum.is_empty() || checksum.contains(char::is_whitespace) || path.is_empty() {
        return Err(invalid_row());
    }

    let digest = Digest::from_hex(checksum).ok_or_else(|| ChecksumError::InvalidChecksum {
        line: line_number,
        value: checksum.to_string(),
    })?;

    Ok((path.to_string(), digest))
}

// Tests live in tests/hash/database_tests.rs
