// Worker transport
// Launchers that hand back channel pairs to an in-process task or a child process

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::error::JobError;
use super::protocol::{decode_line, encode_line, Request, Response};
use super::worker;
use crate::hash::ChecksumEngine;

/// Coordinator's ends of a worker connection
pub struct WorkerChannel {
    pub requests: UnboundedSender<Request>,
    pub responses: UnboundedReceiver<Response>,
}

/// Starts a worker and connects to it
#[async_trait]
pub trait WorkerLauncher: Send + Sync {
    async fn launch(&self) -> Result<WorkerChannel, JobError>;
}

/// Runs the worker loop as a task on the current tokio runtime
#[derive(Debug, Clone, Default)]
pub struct InProcessLauncher {
    engine: ChecksumEngine,
}

impl InProcessLauncher {
    pub fn new(engine: ChecksumEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl WorkerLauncher for InProcessLauncher {
    async fn launch(&self) -> Result<WorkerChannel, JobError> {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();

        tokio::spawn(worker::serve(request_rx, response_tx, self.engine.clone()));

        Ok(WorkerChannel {
            requests: request_tx,
            responses: response_rx,
        })
    }
}

/// Spawns a worker process and talks to it over its stdin/stdout
///
/// The child is killed if the connection is torn down while it still runs;
/// closing the request channel lets it cancel its jobs and exit on its own
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Re-run the current executable as `<exe> worker`
    pub fn current_exe() -> Result<Self, JobError> {
        let program = std::env::current_exe().map_err(|source| JobError::Spawn {
            program: PathBuf::from("<current executable>"),
            source,
        })?;
        Ok(Self::new(program, vec!["worker".to_string()]))
    }
}

#[async_trait]
impl WorkerLauncher for ProcessLauncher {
    async fn launch(&self) -> Result<WorkerChannel, JobError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| JobError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let mut stdin = child.stdin.take().ok_or(JobError::MissingPipe("stdin"))?;
        let stdout = child.stdout.take().ok_or(JobError::MissingPipe("stdout"))?;

        tracing::info!("Started worker process {} (pid {:?})", self.program.display(), child.id());

        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<Request>();
        let (response_tx, response_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(request) = request_rx.recv().await {
                let line = match encode_line(&request) {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!("Failed to encode request: {}", e);
                        continue;
                    }
                };
                let written = async {
                    stdin.write_all(line.as_bytes()).await?;
                    stdin.write_all(b"\n").await?;
                    stdin.flush().await
                };
                if let Err(e) = written.await {
                    tracing::warn!("Worker stdin closed: {}", e);
                    break;
                }
            }
            // Dropping stdin signals end of input to the worker
        });

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match decode_line::<Response>(&line) {
                            Ok(response) => {
                                if response_tx.send(response).is_err() {
                                    break;
                                }
                            }
                            Err(e) => tracing::warn!("Ignoring malformed worker output {:?}: {}", line, e),
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("Failed to read from worker: {}", e);
                        break;
                    }
                }
            }

            match child.try_wait() {
                Ok(Some(status)) => tracing::info!("Worker process exited with {}", status),
                Ok(None) => tracing::info!("Disconnecting from worker process"),
                Err(e) => tracing::warn!("Failed to query worker status: {}", e),
            }
        });

        Ok(WorkerChannel {
            requests: request_tx,
            responses: response_rx,
        })
    }
}
