use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::hash::{Algorithm, ChecksumEngine, DEFAULT_CHUNK_SIZE};

/// Where jobs run: a task in this process or a `treesum worker` child
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerMode {
    #[default]
    InProcess,
    Process,
}

/// Settings loaded from `~/.config/treesum/config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Algorithm used by `generate` when none is given on the command line
    pub algorithm: Algorithm,
    /// Read buffer size in bytes
    pub chunk_size: usize,
    /// Digest files on the rayon pool instead of one at a time
    pub parallel: bool,
    pub worker: WorkerMode,
    /// `tracing` filter directive; `TREESUM_LOG` takes precedence
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Sha256,
            chunk_size: DEFAULT_CHUNK_SIZE,
            parallel: false,
            worker: WorkerMode::InProcess,
            log_filter: None,
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `None`
    /// A missing file yields the defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&data).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn parse(data: &str) -> Result<Self> {
        let config: Config = toml::from_str(data)?;
        if config.chunk_size == 0 {
            bail!("chunk_size must be greater than zero");
        }
        Ok(config)
    }

    pub fn engine(&self) -> ChecksumEngine {
        ChecksumEngine::new()
            .with_chunk_size(self.chunk_size)
            .with_parallel(self.parallel)
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("treesum").join("config.toml"))
}
