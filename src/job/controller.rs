// Job controller
// Owns the worker connection and at most one outstanding job; a driver task
// forwards progress to the caller and resolves the job handle exactly once

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::error::JobError;
use super::protocol::{JobFailure, JobOutcome, Operation, Request, Response};
use super::transport::{WorkerChannel, WorkerLauncher};

/// Lifecycle of a job
///
/// A job is `Created` when submitted and `Running` once the worker first
/// reports on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    fn for_outcome(outcome: &JobOutcome) -> Self {
        match outcome {
            JobOutcome::Generated { .. } | JobOutcome::Validated { .. } => JobState::Completed,
            JobOutcome::Failed { .. } => JobState::Failed,
            JobOutcome::Cancelled => JobState::Cancelled,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed | JobState::Cancelled)
    }
}

/// Caller's view of a submitted job
#[derive(Debug)]
pub struct JobHandle {
    outcome: oneshot::Receiver<JobOutcome>,
    state: Arc<Mutex<JobState>>,
}

impl JobHandle {
    pub fn state(&self) -> JobState {
        *lock(&self.state)
    }

    /// Wait for the terminal outcome
    pub async fn wait(self) -> JobOutcome {
        self.outcome.await.unwrap_or_else(|_| JobOutcome::Failed {
            failure: JobFailure::worker("Job was abandoned by the controller"),
        })
    }
}

struct ActiveJob {
    progress: UnboundedSender<f64>,
    last_progress: f64,
    outcome: oneshot::Sender<JobOutcome>,
    state: Arc<Mutex<JobState>>,
}

impl ActiveJob {
    fn mark_running(&self) {
        let mut state = lock(&self.state);
        if *state == JobState::Created {
            *state = JobState::Running;
        }
    }

    fn finish(self, outcome: JobOutcome) {
        *lock(&self.state) = JobState::for_outcome(&outcome);
        // The sink closes before the outcome is published
        drop(self.progress);
        let _ = self.outcome.send(outcome);
    }
}

/// Drives one worker with at most one outstanding job
///
/// Callers must wait for a job's outcome before submitting the next one;
/// a second concurrent `submit` is rejected with `JobError::Busy`
pub struct JobController {
    requests: UnboundedSender<Request>,
    active: Arc<Mutex<Option<ActiveJob>>>,
    driver: JoinHandle<()>,
}

impl JobController {
    /// Start a worker through `launcher` and take control of it
    pub async fn connect(launcher: &dyn WorkerLauncher) -> Result<Self, JobError> {
        let WorkerChannel {
            requests,
            responses,
        } = launcher.launch().await?;

        let active = Arc::new(Mutex::new(None));
        let driver = tokio::spawn(drive(responses, Arc::clone(&active)));

        Ok(Self {
            requests,
            active,
            driver,
        })
    }

    /// Submit a job; progress fractions go to `progress` in non-decreasing
    /// order, and the sink is closed once the job resolves
    pub fn submit(
        &self,
        operation: Operation,
        progress: UnboundedSender<f64>,
    ) -> Result<JobHandle, JobError> {
        let mut active = lock(&self.active);
        if active.is_some() {
            return Err(JobError::Busy);
        }
        if self.driver.is_finished() {
            return Err(JobError::Disconnected);
        }

        let state = Arc::new(Mutex::new(JobState::Created));
        let (outcome_tx, outcome_rx) = oneshot::channel();

        self.requests
            .send(Request::Run { operation })
            .map_err(|_| JobError::Disconnected)?;

        *active = Some(ActiveJob {
            progress,
            last_progress: 0.0,
            outcome: outcome_tx,
            state: Arc::clone(&state),
        });

        Ok(JobHandle {
            outcome: outcome_rx,
            state,
        })
    }

    /// Ask the worker to stop every running job at its next checkpoint
    ///
    /// The outstanding handle then resolves with `JobOutcome::Cancelled`
    /// unless the job had already finished
    pub fn cancel_all(&self) {
        if self.requests.send(Request::CancelAll).is_err() {
            tracing::warn!("Cannot cancel: worker is not running");
        }
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.active).is_some()
    }
}

impl Drop for JobController {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn drive(mut responses: UnboundedReceiver<Response>, active: Arc<Mutex<Option<ActiveJob>>>) {
    while let Some(response) = responses.recv().await {
        match response {
            Response::Progress { fraction } => {
                let mut guard = lock(&active);
                if let Some(job) = guard.as_mut() {
                    job.mark_running();
                    let fraction = fraction.clamp(0.0, 1.0);
                    if fraction >= job.last_progress {
                        job.last_progress = fraction;
                        let _ = job.progress.send(fraction);
                    }
                }
            }
            Response::Finished { outcome } => {
                let job = lock(&active).take();
                match job {
                    Some(job) => job.finish(outcome),
                    None => tracing::warn!("Dropping outcome with no job outstanding: {:?}", outcome),
                }
            }
        }
    }

    tracing::info!("Worker connection closed");
    if let Some(job) = lock(&active).take() {
        job.finish(JobOutcome::Failed {
            failure: JobFailure::worker("Worker connection closed before the job finished"),
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
