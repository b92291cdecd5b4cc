// Job worker
// Runs jobs on blocking tasks and streams their progress, in process or over stdin/stdout

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use super::protocol::{decode_line, encode_line, JobOutcome, Operation, Request, Response};
use crate::hash::{CancelFlag, ChecksumEngine, Validator};

/// Execute one operation to completion on the current thread
pub fn run_operation<F>(
    engine: &ChecksumEngine,
    operation: Operation,
    cancel: &CancelFlag,
    on_progress: F,
) -> JobOutcome
where
    F: FnMut(f64) + Send,
{
    let outcome = match operation {
        Operation::Generate {
            files,
            algorithm,
            output_directory,
        } => engine
            .generate(&files, algorithm, cancel, on_progress)
            .and_then(|manifest| manifest.write_to_directory(&output_directory, algorithm))
            .map(|output_path| JobOutcome::Generated { output_path }),
        Operation::Validate {
            files,
            manifest_path,
        } => Validator::new(engine.clone())
            .validate_manifest_file(&files, &manifest_path, cancel, on_progress)
            .map(|result| JobOutcome::Validated { result }),
    };

    match outcome {
        Ok(outcome) => outcome,
        Err(err) if err.is_cancelled() => {
            tracing::info!("Job cancelled");
            JobOutcome::Cancelled
        }
        Err(err) => {
            tracing::warn!("Job failed: {}", err);
            JobOutcome::from(err)
        }
    }
}

/// Serve requests until the request channel closes
///
/// Every job gets its own cancel flag; `CancelAll` trips all of them. Each
/// job sends its progress followed by exactly one `Finished`. When the
/// channel closes, running jobs are cancelled and awaited
pub async fn serve(
    mut requests: UnboundedReceiver<Request>,
    responses: UnboundedSender<Response>,
    engine: ChecksumEngine,
) {
    let mut tasks: Vec<(CancelFlag, JoinHandle<()>)> = Vec::new();

    while let Some(request) = requests.recv().await {
        tasks.retain(|(_, handle)| !handle.is_finished());

        match request {
            Request::Run { operation } => {
                tracing::info!("Starting job: {:?}", operation);
                let cancel = CancelFlag::new();
                let handle = spawn_job(engine.clone(), operation, cancel.clone(), responses.clone());
                tasks.push((cancel, handle));
            }
            Request::CancelAll => {
                tracing::info!("Cancelling {} running jobs", tasks.len());
                for (cancel, _) in tasks.drain(..) {
                    cancel.cancel();
                }
            }
        }
    }

    for (cancel, handle) in tasks {
        cancel.cancel();
        if let Err(e) = handle.await {
            tracing::warn!("Job task panicked: {}", e);
        }
    }
}

fn spawn_job(
    engine: ChecksumEngine,
    operation: Operation,
    cancel: CancelFlag,
    responses: UnboundedSender<Response>,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let outcome = run_operation(&engine, operation, &cancel, |fraction| {
            let _ = responses.send(Response::Progress { fraction });
        });
        let _ = responses.send(Response::Finished { outcome });
    })
}

/// Worker process entry point: JSON-lines requests on stdin, responses on stdout
pub async fn serve_stdio(engine: ChecksumEngine) -> io::Result<()> {
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (response_tx, mut response_rx) = mpsc::unbounded_channel();

    let server = tokio::spawn(serve(request_rx, response_tx, engine));

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(response) = response_rx.recv().await {
            let line = encode_line(&response).map_err(io::Error::other)?;
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<(), io::Error>(())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match decode_line::<Request>(&line) {
            Ok(request) => {
                if request_tx.send(request).is_err() {
                    break;
                }
            }
            Err(e) => tracing::warn!("Ignoring malformed request {:?}: {}", line, e),
        }
    }

    // Closing the request channel cancels whatever is still running
    drop(request_tx);
    server.await.map_err(io::Error::other)?;
    writer.await.map_err(io::Error::other)?
}
