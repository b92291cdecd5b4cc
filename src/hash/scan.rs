// Manifest generation module
// Enumerates a file set, relativizes every path and digests each file into a Manifest

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use rayon::prelude::*;

use super::cancel::CancelFlag;
use super::database::Manifest;
use super::enumerate;
use super::error::{ChecksumError, Result};
use super::hash::{Algorithm, FileDigester};
use super::path_utils;

/// Tracks overall progress and only ever reports increasing values
struct ProgressMeter<F> {
    callback: F,
    last: f64,
}

impl<F: FnMut(f64)> ProgressMeter<F> {
    fn new(callback: F) -> Self {
        Self { callback, last: 0.0 }
    }

    fn report(&mut self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        if fraction >= self.last {
            self.last = fraction;
            (self.callback)(fraction);
        }
    }
}

/// One file scheduled for digesting
#[derive(Debug, Clone)]
struct PlannedFile {
    key: String,
    path: PathBuf,
}

/// Engine for building manifests from a set of files and directories
#[derive(Debug, Clone)]
pub struct ChecksumEngine {
    digester: FileDigester,
    parallel: bool,
}

impl ChecksumEngine {
    /// Create a new ChecksumEngine with default settings
    pub fn new() -> Self {
        Self {
            digester: FileDigester::new(),
            parallel: false,
        }
    }

    /// Digest independent files on the rayon pool
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.digester = FileDigester::with_chunk_size(chunk_size);
        self
    }

    /// Build a manifest for `inputs`
    ///
    /// Keys are relative to the closest common directory containing all
    /// inputs. When two files map to the same key the first one wins and
    /// the rest are skipped. Progress is `(done + current_fraction) / total`
    /// and never decreases. Cancellation is observed between files and
    /// between chunks; a cancelled run returns `Cancelled` and no manifest
    pub fn generate<P, F>(
        &self,
        inputs: &[P],
        algorithm: Algorithm,
        cancel: &CancelFlag,
        on_progress: F,
    ) -> Result<Manifest>
    where
        P: AsRef<Path>,
        F: FnMut(f64) + Send,
    {
        let start_time = Instant::now();

        let containing: Vec<PathBuf> = inputs
            .iter()
            .map(|input| path_utils::containing_directory(input.as_ref()))
            .collect();
        let root = path_utils::common_directory(&containing).ok_or(ChecksumError::NoCommonPath)?;

        let files = enumerate::enumerate(inputs)?;
        let plan = plan_files(&root, files);

        tracing::info!(
            "Digesting {} files under {} with {}",
            plan.len(),
            root.display(),
            algorithm
        );

        let mut meter = ProgressMeter::new(on_progress);
        meter.report(0.0);

        let manifest = if self.parallel {
            self.digest_parallel(&plan, algorithm, cancel, &mut meter)?
        } else {
            self.digest_sequential(&plan, algorithm, cancel, &mut meter)?
        };

        meter.report(1.0);

        tracing::info!(
            "Generated {} entries in {:.2}s",
            manifest.len(),
            start_time.elapsed().as_secs_f64()
        );

        Ok(manifest)
    }

    /// Sequential implementation with per-chunk progress
    fn digest_sequential<F: FnMut(f64)>(
        &self,
        plan: &[PlannedFile],
        algorithm: Algorithm,
        cancel: &CancelFlag,
        meter: &mut ProgressMeter<F>,
    ) -> Result<Manifest> {
        let total = plan.len() as f64;
        let mut manifest = Manifest::new();

        for (done, file) in plan.iter().enumerate() {
            cancel.check()?;

            tracing::debug!("Digesting {}", file.path.display());
            let digest = self.digester.digest(&file.path, algorithm, cancel, |fraction| {
                meter.report((done as f64 + fraction) / total);
            })?;

            manifest.insert(file.key.clone(), digest);
            meter.report((done + 1) as f64 / total);
        }

        Ok(manifest)
    }

    /// Parallel implementation; progress advances per completed file
    fn digest_parallel<F: FnMut(f64) + Send>(
        &self,
        plan: &[PlannedFile],
        algorithm: Algorithm,
        cancel: &CancelFlag,
        meter: &mut ProgressMeter<F>,
    ) -> Result<Manifest> {
        let total = plan.len() as f64;
        let manifest = Mutex::new(Manifest::new());
        let completed = Mutex::new((0usize, meter));

        plan.par_iter().try_for_each(|file| -> Result<()> {
            cancel.check()?;

            tracing::debug!("Digesting {}", file.path.display());
            let digest = self.digester.digest(&file.path, algorithm, cancel, |_| {})?;

            manifest
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .insert(file.key.clone(), digest);

            let mut guard = completed.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.0 += 1;
            let done = guard.0;
            guard.1.report(done as f64 / total);
            Ok(())
        })?;

        Ok(manifest.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }
}

impl Default for ChecksumEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Assign manifest keys; the first file mapped to a key wins
fn plan_files(root: &Path, files: Vec<PathBuf>) -> Vec<PlannedFile> {
    let mut plan: Vec<PlannedFile> = Vec::with_capacity(files.len());
    let mut seen = std::collections::HashSet::new();

    for path in files {
        let key = path_utils::lexical_relative_path(root, &path);
        if !seen.insert(key.clone()) {
            tracing::info!("Skipping file {} because it has already been processed", key);
            continue;
        }
        plan.push(PlannedFile { key, path });
    }

    plan
}
