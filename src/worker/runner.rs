//! Polling loop that pulls jobs, runs them, and reports back.

use super::{
    Backoff,
    ports::{ClientError, CoordinatorClient, Processor, ProcessorError},
};
use crate::config::BackoffConfig;
use crate::coordinator::Job;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Reasons the worker loop stops.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Shutdown was requested.
    #[error("worker cancelled")]
    Cancelled,
    /// The coordinator rejected the worker in a way retrying cannot fix.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Final state a worker drove a job to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Output uploaded; the task awaits ingestion.
    Uploaded,
    /// Execution failed and was reported as such.
    Failed,
    /// The job was abandoned after a reporting failure.
    Halted,
}

/// Single-threaded worker loop.
///
/// Keeps a local queue of assigned jobs, polls the coordinator when it runs
/// dry, and backs off after empty or failed polls.
pub struct WorkerLoop<C, P>
where
    C: CoordinatorClient,
    P: Processor,
{
    client: Arc<C>,
    processor: Arc<P>,
    worker: String,
    backoff: Backoff,
    queue: VecDeque<Job>,
}

impl<C, P> WorkerLoop<C, P>
where
    C: CoordinatorClient,
    P: Processor,
{
    /// Creates a worker loop polling as `worker`.
    #[must_use]
    pub fn new(
        client: Arc<C>,
        processor: Arc<P>,
        worker: impl Into<String>,
        backoff: BackoffConfig,
    ) -> Self {
        Self {
            client,
            processor,
            worker: worker.into(),
            backoff: Backoff::new(backoff),
            queue: VecDeque::new(),
        }
    }

    /// Runs until `shutdown` is cancelled.
    ///
    /// Jobs still queued at shutdown are halted so none is left waiting in
    /// `created`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Cancelled`] on shutdown and
    /// [`WorkerError::Client`] when the coordinator rejects the worker name.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), WorkerError> {
        loop {
            if shutdown.is_cancelled() {
                self.halt_queued().await;
                return Err(WorkerError::Cancelled);
            }
            match self.queue.pop_front() {
                Some(job) => {
                    self.run_job(&job).await;
                }
                None => self.poll(&shutdown).await?,
            }
        }
    }

    /// Polls once, refilling the queue or sleeping off the backoff.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Cancelled`] when `shutdown` fires during the
    /// sleep and [`WorkerError::Client`] for permanent rejections.
    pub async fn poll(&mut self, shutdown: &CancellationToken) -> Result<(), WorkerError> {
        match self.client.jobs(&self.worker).await {
            Ok(jobs) if !jobs.is_empty() => {
                debug!(worker = %self.worker, count = jobs.len(), "received jobs");
                self.queue.extend(jobs);
                self.backoff.reset();
                Ok(())
            }
            Ok(_) => {
                debug!(worker = %self.worker, "no work available");
                self.sleep(shutdown).await
            }
            Err(err) if err.is_permanent() => Err(err.into()),
            Err(err) => {
                warn!(worker = %self.worker, error = %err, "poll failed");
                self.sleep(shutdown).await
            }
        }
    }

    /// Drives one job through start, execution, and upload.
    pub async fn run_job(&self, job: &Job) -> JobOutcome {
        let task_id = job.task_id;

        if let Err(err) = self.client.start(task_id).await {
            warn!(%task_id, error = %err, "start report failed, halting");
            self.halt(job).await;
            return JobOutcome::Halted;
        }
        info!(%task_id, module = %job.module.path, commit = %job.commit_sha, "running job");

        let output = match self.execute(job).await {
            Ok(output) => output,
            Err(err) => {
                warn!(%task_id, error = %err, "job failed");
                if let Err(report) = self.client.fail(task_id).await {
                    warn!(%task_id, error = %report, "failure report failed, halting");
                    self.halt(job).await;
                    return JobOutcome::Halted;
                }
                return JobOutcome::Failed;
            }
        };

        if let Err(err) = self.client.upload(task_id, output).await {
            warn!(%task_id, error = %err, "upload failed, halting");
            self.halt(job).await;
            return JobOutcome::Halted;
        }
        info!(%task_id, "job uploaded");
        JobOutcome::Uploaded
    }

    /// Returns the number of jobs waiting locally.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    async fn execute(&self, job: &Job) -> Result<Vec<u8>, ProcessorError> {
        let mut stream = self.processor.run(job).await?;
        let mut output = Vec::new();
        stream.read_to_end(&mut output).await?;
        Ok(output)
    }

    async fn halt(&self, job: &Job) {
        if let Err(err) = self.client.halt(job.task_id).await {
            warn!(task_id = %job.task_id, error = %err, "halt report failed");
        }
    }

    async fn halt_queued(&mut self) {
        while let Some(job) = self.queue.pop_front() {
            self.halt(&job).await;
        }
    }

    async fn sleep(&mut self, shutdown: &CancellationToken) -> Result<(), WorkerError> {
        let delay = self.backoff.next_delay();
        debug!(worker = %self.worker, ?delay, "backing off");
        tokio::select! {
            () = shutdown.cancelled() => Err(WorkerError::Cancelled),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
