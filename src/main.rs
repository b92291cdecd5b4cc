use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::sync::mpsc;

use treesum::config::{Config, WorkerMode};
use treesum::hash::path_utils;
use treesum::hash::{Algorithm, Manifest, ValidationResult};
use treesum::job::{
    worker, InProcessLauncher, JobController, JobOutcome, Operation, ProcessLauncher,
};
use treesum::logging;

/// Exit status after Ctrl-C
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser)]
#[command(name = "treesum", version, about = "Generate and validate checksum manifests for file trees")]
struct Cli {
    /// Config file (defaults to ~/.config/treesum/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Digest files and directories into a manifest
    Generate {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// md5 or sha256
        #[arg(short, long)]
        algorithm: Option<Algorithm>,
        /// Directory receiving checksum.<ext> (defaults to the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check files and directories against a manifest
    Validate {
        manifest: PathBuf,
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print the entries of a manifest
    View { manifest: PathBuf },
    /// Serve jobs over stdin/stdout
    #[command(hide = true)]
    Worker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref())?;
    logging::init_logging(config.log_filter.as_deref());

    match cli.command {
        Command::Generate {
            paths,
            algorithm,
            output,
        } => {
            let output_directory = match output {
                Some(dir) => absolute(&dir)?,
                None => std::env::current_dir().context("Failed to read current directory")?,
            };
            let operation = Operation::Generate {
                files: absolute_all(&paths)?,
                algorithm: algorithm.unwrap_or(config.algorithm),
                output_directory,
            };
            run_job(&config, cli.config.as_deref(), operation).await
        }
        Command::Validate { manifest, paths } => {
            let operation = Operation::Validate {
                files: absolute_all(&paths)?,
                manifest_path: absolute(&manifest)?,
            };
            run_job(&config, cli.config.as_deref(), operation).await
        }
        Command::View { manifest } => {
            view(&manifest)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Worker => {
            // Ctrl-C reaches the whole process group; the parent answers it with CancelAll
            tokio::spawn(async {
                while tokio::signal::ctrl_c().await.is_ok() {
                    tracing::debug!("Ignoring interrupt in worker");
                }
            });
            worker::serve_stdio(config.engine())
                .await
                .context("Worker I/O failed")?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_job(config: &Config, config_path: Option<&Path>, operation: Operation) -> Result<ExitCode> {
    let controller = match config.worker {
        WorkerMode::InProcess => JobController::connect(&InProcessLauncher::new(config.engine())).await?,
        WorkerMode::Process => {
            let launcher = match config_path {
                Some(path) => {
                    let program = std::env::current_exe().context("Failed to locate treesum executable")?;
                    ProcessLauncher::new(
                        program,
                        vec![
                            "--config".to_string(),
                            path.display().to_string(),
                            "worker".to_string(),
                        ],
                    )
                }
                None => ProcessLauncher::current_exe()?,
            };
            JobController::connect(&launcher).await?
        }
    };

    let pb = ProgressBar::new(1000);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {percent}%")?
            .progress_chars("=>-"),
    );

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<f64>();
    let bar = pb.clone();
    let progress_task = tokio::spawn(async move {
        while let Some(fraction) = progress_rx.recv().await {
            bar.set_position((fraction * 1000.0).round() as u64);
        }
    });

    let handle = controller.submit(operation, progress_tx)?;
    let wait = handle.wait();
    tokio::pin!(wait);

    let outcome = tokio::select! {
        outcome = &mut wait => outcome,
        _ = tokio::signal::ctrl_c() => {
            controller.cancel_all();
            wait.await
        }
    };

    let _ = progress_task.await;
    pb.finish_and_clear();

    match outcome {
        JobOutcome::Generated { output_path } => {
            println!("{}", output_path.display());
            Ok(ExitCode::SUCCESS)
        }
        JobOutcome::Validated { result } => Ok(report(&result)),
        JobOutcome::Failed { failure } => bail!("{}", failure),
        JobOutcome::Cancelled => Ok(ExitCode::from(EXIT_CANCELLED)),
    }
}

fn report(result: &ValidationResult) -> ExitCode {
    match result {
        ValidationResult::Match { files } => {
            println!("{} {} files match", "OK".green().bold(), files);
            ExitCode::SUCCESS
        }
        ValidationResult::Mismatch { discrepancy } => {
            println!("{} {}", "FAILED".red().bold(), discrepancy);
            ExitCode::FAILURE
        }
    }
}

fn view(manifest_path: &Path) -> Result<()> {
    let algorithm = Algorithm::from_manifest_path(manifest_path)?;
    let manifest = Manifest::read_from(manifest_path)
        .with_context(|| format!("Failed to load manifest {}", manifest_path.display()))?;

    let width = algorithm.output_len() * 2;
    println!(
        "{:<width$}  {}",
        algorithm.name().to_uppercase().bold(),
        "PATH".bold(),
        width = width
    );
    for (path, digest) in manifest.iter() {
        println!("{:<width$}  {}", digest.to_hex().dimmed(), path, width = width);
    }
    println!("{} entries", manifest.len());

    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(path_utils::normalize(&cwd.join(path)))
}

fn absolute_all(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    paths.iter().map(|path| absolute(path)).collect()
}
