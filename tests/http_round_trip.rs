//! Worker protocol over a real HTTP listener.

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use benchplane::config::{BackoffConfig, CoordinatorConfig};
use benchplane::coordinator::{Coordinator, Job};
use benchplane::http::{HttpCoordinatorClient, router};
use benchplane::scheduler::default_scheduler;
use benchplane::task::{
    adapters::memory::InMemoryTaskRepository,
    domain::{BenchModule, Commit, CommitSha, TargetId, TaskId, TaskStatus},
    ports::TaskRepository,
    services::TaskLifecycleService,
};
use benchplane::worker::{
    ClientError, CoordinatorClient, LocalCoordinatorClient, Processor, ProcessorError,
    ResultStream, WorkerError, WorkerLoop,
};
use chrono::{TimeDelta, Utc};
use eyre::{OptionExt, ensure};
use mockable::DefaultClock;
use rstest::rstest;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

struct Server {
    address: SocketAddr,
    repository: Arc<InMemoryTaskRepository>,
    shutdown: CancellationToken,
}

impl Server {
    async fn start() -> eyre::Result<Self> {
        let clock = Arc::new(DefaultClock);
        let repository = Arc::new(InMemoryTaskRepository::new());
        let module = BenchModule::new(TargetId::new(), "golang.org/x/benchmarks", "v0.1.0")?;
        repository.add_module(module)?;
        repository.add_commit(Commit::new(
            CommitSha::new("f".repeat(40))?,
            Utc::now() - TimeDelta::hours(1),
        ))?;

        let config = CoordinatorConfig::default();
        let coordinator = Coordinator::new(
            Arc::clone(&repository),
            Arc::clone(&repository),
            Arc::new(default_scheduler(&repository, &clock, &config)),
            config.run,
        );
        let lifecycle = TaskLifecycleService::new(Arc::clone(&repository), clock);
        let local: Arc<dyn CoordinatorClient> =
            Arc::new(LocalCoordinatorClient::new(coordinator, lifecycle));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let stop = shutdown.clone().cancelled_owned();
        tokio::spawn(async move {
            axum::serve(listener, router(local, config.http))
                .with_graceful_shutdown(stop)
                .await
        });

        Ok(Self {
            address,
            repository,
            shutdown,
        })
    }

    fn client(&self) -> eyre::Result<HttpCoordinatorClient> {
        Ok(HttpCoordinatorClient::new(
            format!("http://{}/", self.address),
            Duration::from_secs(5),
        )?)
    }

    async fn status(&self, task_id: TaskId) -> eyre::Result<TaskStatus> {
        let task = self
            .repository
            .find_by_id(task_id)
            .await?
            .ok_or_eyre("task missing")?;
        Ok(task.status())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct Echo;

#[async_trait]
impl Processor for Echo {
    async fn run(&self, job: &Job) -> Result<ResultStream, ProcessorError> {
        let output = format!("BenchmarkEcho/{} 1 1 ns/op\n", job.commit_sha);
        Ok(Box::pin(Cursor::new(output.into_bytes())))
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn job_round_trips_over_http() -> eyre::Result<()> {
    let server = Server::start().await?;
    let client = server.client()?;

    let jobs = client.jobs("gopher").await?;
    let job = jobs.first().ok_or_eyre("expected a job")?;
    ensure!(job.module.path == "golang.org/x/benchmarks");
    ensure!(job.commit_sha.as_str() == "f".repeat(40));
    ensure!(job.bench_time == Duration::from_secs(1));

    client.start(job.task_id).await?;
    client.upload(job.task_id, b"BenchmarkX 1 1 ns/op".to_vec()).await?;

    ensure!(server.status(job.task_id).await? == TaskStatus::ResultUploaded);
    ensure!(client.jobs("gopher").await?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn errors_survive_the_wire() -> eyre::Result<()> {
    let server = Server::start().await?;
    let client = server.client()?;

    let invalid = client.jobs("gopherPi").await;
    ensure!(
        matches!(invalid, Err(ClientError::InvalidWorker(_))),
        "got {invalid:?}"
    );
    let missing = client.start(TaskId::new()).await;
    ensure!(
        matches!(missing, Err(ClientError::NotFound(_))),
        "got {missing:?}"
    );

    let jobs = client.jobs("gopher").await?;
    let job = jobs.first().ok_or_eyre("expected a job")?;
    let early_fail = client.fail(job.task_id).await;
    ensure!(
        matches!(early_fail, Err(ClientError::Conflict(_))),
        "got {early_fail:?}"
    );
    client.halt(job.task_id).await?;
    ensure!(server.status(job.task_id).await? == TaskStatus::Halted);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unreachable_coordinator_is_a_transport_error() -> eyre::Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    drop(listener);

    let client = HttpCoordinatorClient::new(format!("http://{address}"), Duration::from_secs(2))?;
    let result = client.jobs("gopher").await;

    ensure!(
        matches!(&result, Err(err) if !err.is_permanent()),
        "got {result:?}"
    );
    ensure!(matches!(result, Err(ClientError::Transport(_))));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn worker_loop_runs_against_remote_coordinator() -> eyre::Result<()> {
    let server = Server::start().await?;
    let client = Arc::new(server.client()?);
    let backoff = BackoffConfig {
        initial: Duration::from_millis(10),
        factor: 2.0,
        max: Duration::from_millis(50),
    };
    let mut worker = WorkerLoop::new(client, Arc::new(Echo), "gopher", backoff);
    let shutdown = CancellationToken::new();

    let handle = tokio::spawn({
        let token = shutdown.clone();
        async move { worker.run(token).await }
    });

    let mut uploaded = false;
    for _ in 0..200 {
        let tasks = server
            .repository
            .list_worker_tasks_with_status(
                &benchplane::task::domain::WorkerName::new("gopher")?,
                &[TaskStatus::ResultUploaded],
            )
            .await?;
        if !tasks.is_empty() {
            uploaded = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    shutdown.cancel();
    let result = handle.await?;

    ensure!(uploaded, "worker never uploaded");
    ensure!(matches!(result, Err(WorkerError::Cancelled)), "got {result:?}");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn bad_request_is_only_permanent_for_polls() -> eyre::Result<()> {
    use axum::{Json, Router, http::StatusCode};
    use benchplane::http::wire::ErrorBody;

    let app = Router::new().fallback(|| async {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: "request rejected".to_owned(),
            }),
        )
    });
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    let shutdown = CancellationToken::new();
    let stop = shutdown.clone().cancelled_owned();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(stop)
            .await
    });

    let client = HttpCoordinatorClient::new(format!("http://{address}"), Duration::from_secs(5))?;
    let poll = client.jobs("gopher").await;
    let start = client.start(TaskId::new()).await;
    let upload = client.upload(TaskId::new(), b"out".to_vec()).await;
    shutdown.cancel();

    ensure!(
        matches!(&poll, Err(err @ ClientError::InvalidWorker(_)) if err.is_permanent()),
        "got {poll:?}"
    );
    for result in [start, upload] {
        ensure!(
            matches!(&result, Err(err @ ClientError::Internal(_)) if !err.is_permanent()),
            "got {result:?}"
        );
    }
    Ok(())
}
