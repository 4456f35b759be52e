//! Worker loop driving an in-process coordinator end to end.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::helpers::Stack;
use async_trait::async_trait;
use benchplane::config::BackoffConfig;
use benchplane::coordinator::Job;
use benchplane::task::domain::{Task, TaskStatus, WorkerName};
use benchplane::task::ports::TaskRepository;
use benchplane::worker::{Processor, ProcessorError, ResultStream, WorkerError, WorkerLoop};
use chrono::TimeDelta;
use eyre::{OptionExt, ensure};
use rstest::{fixture, rstest};
use tokio_util::sync::CancellationToken;

/// Processor that echoes the commit and stops the loop after `limit` jobs.
struct Scripted {
    fail: bool,
    limit: usize,
    runs: AtomicUsize,
    shutdown: CancellationToken,
}

#[async_trait]
impl Processor for Scripted {
    async fn run(&self, job: &Job) -> Result<ResultStream, ProcessorError> {
        let runs = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        if runs >= self.limit {
            self.shutdown.cancel();
        }
        if self.fail {
            return Err(ProcessorError::Exit {
                status: "exit status: 2".to_owned(),
                stderr: "build failed".to_owned(),
            });
        }
        let output = format!("commit: {}\nBenchmarkX 10 5 ns/op\n", job.commit_sha);
        Ok(Box::pin(Cursor::new(output.into_bytes())))
    }
}

#[fixture]
fn stack() -> Stack {
    Stack::new()
}

fn quick_backoff() -> BackoffConfig {
    BackoffConfig {
        initial: Duration::from_millis(5),
        factor: 2.0,
        max: Duration::from_millis(20),
    }
}

async fn run_worker(stack: &Stack, fail: bool, limit: usize) -> eyre::Result<Vec<Task>> {
    let shutdown = CancellationToken::new();
    let processor = Arc::new(Scripted {
        fail,
        limit,
        runs: AtomicUsize::new(0),
        shutdown: shutdown.clone(),
    });
    let mut worker = WorkerLoop::new(
        Arc::new(stack.client()),
        processor,
        "gopher",
        quick_backoff(),
    );

    let result = tokio::time::timeout(Duration::from_secs(10), worker.run(shutdown)).await?;
    ensure!(
        matches!(result, Err(WorkerError::Cancelled)),
        "got {result:?}"
    );
    ensure!(worker.queued() == 0);

    Ok(stack
        .repository
        .list_worker_tasks_with_status(&WorkerName::new("gopher")?, &TaskStatus::ALL)
        .await?)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn worker_uploads_results_for_each_commit(stack: Stack) -> eyre::Result<()> {
    let first = stack.commit('1', TimeDelta::days(1));
    let second = stack.commit('2', TimeDelta::days(2));

    let tasks = run_worker(&stack, false, 2).await?;

    ensure!(tasks.len() == 2, "tasks {tasks:?}");
    for (task, sha) in tasks.iter().zip([&first, &second]) {
        ensure!(task.status() == TaskStatus::ResultUploaded);
        ensure!(task.spec().commit_sha() == sha);
        let datafile_id = task.datafile_id().ok_or_eyre("datafile not bound")?;
        let datafile = stack
            .repository
            .find_datafile(datafile_id)
            .await?
            .ok_or_eyre("datafile missing")?;
        ensure!(datafile.contents().starts_with(format!("commit: {sha}").as_bytes()));
        ensure!(datafile.verify());
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_execution_is_reported(stack: Stack) -> eyre::Result<()> {
    stack.commit('3', TimeDelta::days(1));

    let tasks = run_worker(&stack, true, 1).await?;

    let task = tasks.first().ok_or_eyre("expected a task")?;
    ensure!(tasks.len() == 1);
    ensure!(task.status() == TaskStatus::CompleteError);
    ensure!(task.datafile_id().is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn uploaded_results_can_be_ingested(stack: Stack) -> eyre::Result<()> {
    stack.commit('4', TimeDelta::days(1));
    let tasks = run_worker(&stack, false, 1).await?;
    let task = tasks.first().ok_or_eyre("expected a task")?;

    let completed = stack.lifecycle.complete(task.id()).await?;

    ensure!(completed.status() == TaskStatus::CompleteSuccess);
    ensure!(stack.coordinator.jobs("gopher").await?.is_empty());
    Ok(())
}
