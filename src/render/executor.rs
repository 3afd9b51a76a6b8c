//! Bounded, fail-fast parallel execution of render jobs.
//!
//! Jobs are queued on a channel that is closed once filled. `W` worker tasks
//! pull from it one job at a time. The first failing job cancels the shared
//! [`CancellationToken`]; workers finish the job they are running and then
//! stop, so nothing new is started after a failure is observed. The whole
//! run is bounded by a global timeout.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::core::TerraError;
use crate::utils::ProgressBar;

type JobFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;
type JobFn = Box<dyn FnOnce() -> JobFuture + Send>;

/// A described unit of render work.
pub struct RenderJob {
    description: String,
    run: JobFn,
}

impl RenderJob {
    /// Wrap `run`; `description` must be unique within a run.
    pub fn new<F, Fut>(description: impl Into<String>, run: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            description: description.into(),
            run: Box::new(move || Box::pin(run())),
        }
    }

    /// Human-readable description, e.g. `leonardo in dev`.
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl std::fmt::Debug for RenderJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderJob").field("description", &self.description).finish_non_exhaustive()
    }
}

struct JobFailure {
    description: String,
    error: String,
}

/// Runs [`RenderJob`]s on a bounded pool of tokio tasks.
pub struct ParallelExecutor {
    workers: usize,
    timeout: Duration,
    progress: ProgressBar,
}

impl ParallelExecutor {
    /// An executor with `workers` workers and a global `timeout`.
    pub fn new(workers: usize, timeout: Duration) -> Self {
        Self {
            workers,
            timeout,
            progress: ProgressBar::hidden(),
        }
    }

    /// Report finished jobs on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Run every job, failing fast.
    ///
    /// # Errors
    ///
    /// - [`TerraError::RenderTimeout`] if the run exceeds the timeout
    /// - [`TerraError::AggregatedRenderError`] listing every job that failed
    pub async fn execute(&self, jobs: Vec<RenderJob>) -> Result<()> {
        if jobs.is_empty() {
            return Ok(());
        }
        let workers = self.workers.clamp(1, jobs.len());
        tracing::debug!(target: "render", "Running {} jobs on {} workers", jobs.len(), workers);

        let (job_tx, job_rx) = mpsc::channel(jobs.len());
        for job in jobs {
            job_tx.send(job).await.map_err(|_| TerraError::ProgrammerError {
                message: "render job queue closed while enqueueing".to_string(),
            })?;
        }
        drop(job_tx);

        let queue = Arc::new(Mutex::new(job_rx));
        let (error_tx, mut error_rx) = mpsc::unbounded_channel::<JobFailure>();
        let token = CancellationToken::new();

        let handles: Vec<_> = (0..workers)
            .map(|id| {
                tokio::spawn(worker(
                    id,
                    Arc::clone(&queue),
                    error_tx.clone(),
                    token.clone(),
                    self.progress.clone(),
                ))
            })
            .collect();
        drop(error_tx);

        let results = tokio::select! {
            results = join_all(handles) => results,
            () = tokio::time::sleep(self.timeout) => {
                token.cancel();
                tracing::error!(target: "render", "Render timed out after {:?}", self.timeout);
                return Err(TerraError::RenderTimeout {
                    timeout: self.timeout,
                }
                .into());
            }
        };

        let mut failures = Vec::new();
        while let Ok(failure) = error_rx.try_recv() {
            failures.push(format!("{}: {}", failure.description, failure.error));
        }
        for result in results {
            if let Err(join_error) = result {
                failures.push(format!("render worker: {join_error}"));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(TerraError::AggregatedRenderError {
                count: failures.len(),
                joined: failures.join("\n"),
            }
            .into())
        }
    }
}

async fn worker(
    id: usize,
    queue: Arc<Mutex<mpsc::Receiver<RenderJob>>>,
    errors: mpsc::UnboundedSender<JobFailure>,
    token: CancellationToken,
    progress: ProgressBar,
) {
    loop {
        if token.is_cancelled() {
            tracing::trace!(target: "render", "Worker {} stopping on cancellation", id);
            return;
        }
        let Some(job) = queue.lock().await.recv().await else {
            return;
        };
        // A failure may have landed while this worker waited on the queue
        if token.is_cancelled() {
            return;
        }

        let RenderJob {
            description,
            run,
        } = job;
        tracing::debug!(target: "render", "Worker {} rendering {}", id, description);
        progress.set_message(description.clone());

        match run().await {
            Ok(()) => progress.inc(1),
            Err(err) => {
                let error = format!("{err:#}");
                progress.println(format!("{description}: {error}"));
                let _ = errors.send(JobFailure {
                    description,
                    error,
                });
                token.cancel();
            }
        }
    }
}
