//! Coordinator server and benchmark worker.
//!
//! Usage:
//!
//! ```text
//! benchplane serve [--database-url URL] [--catalog FILE] [--listen ADDR]
//! benchplane work --name NAME --command CMD [--coordinator URL]
//! ```
//!
//! `serve` runs the assignment API and the stale-task reaper against either
//! `PostgreSQL` or an in-memory store. `work` polls a coordinator and runs
//! each assigned job through a shell command. Both stop on SIGINT or
//! SIGTERM.

use anyhow::{Context, Result};
use benchplane::catalog::Catalog;
use benchplane::config::{
    BackoffConfig, CoordinatorConfig, HttpConfig, ReaperConfig, RetryConfig, RunParameters,
    parse_duration,
};
use benchplane::coordinator::Coordinator;
use benchplane::http::{HttpCoordinatorClient, router};
use benchplane::scheduler::{CandidateQueries, default_scheduler};
use benchplane::task::{
    adapters::{
        memory::InMemoryTaskRepository,
        postgres::{PostgresTaskRepository, TaskPgPool},
    },
    ports::{ModuleResolver, TaskRepository},
    services::{StaleTaskReaper, TaskLifecycleService},
};
use benchplane::worker::{
    CommandProcessor, CoordinatorClient, LocalCoordinatorClient, WorkerError, WorkerLoop,
};
use clap::{ArgAction, Args, Parser, Subcommand};
use diesel::r2d2::ConnectionManager;
use mockable::DefaultClock;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "benchplane", version, about = "Continuous-benchmarking control plane")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the coordinator API and stale-task reaper.
    Serve(ServeArgs),
    /// Poll a coordinator and execute assigned jobs.
    Work(WorkArgs),
}

#[derive(Debug, Args)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "BENCHPLANE_LISTEN", default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// `PostgreSQL` connection string; omit to keep state in memory.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// JSON catalog of modules and commits to seed at startup.
    #[arg(long, env = "BENCHPLANE_CATALOG")]
    catalog: Option<PathBuf>,

    /// Failed attempts after which a spec is no longer retried.
    #[arg(long, default_value_t = RetryConfig::default().max_errors)]
    max_errors: u32,

    /// Minimum time between a failed attempt and its retry.
    #[arg(long, value_parser = parse_duration, default_value = "1h")]
    retry_cooloff: Duration,

    /// Run benchmarks in short mode.
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    short: bool,

    /// Target duration of each benchmark.
    #[arg(long, value_parser = parse_duration, default_value = "1s")]
    bench_time: Duration,

    /// Inactivity after which in-flight tasks are timed out.
    #[arg(long, value_parser = parse_duration, default_value = "6h")]
    stale_timeout: Duration,

    /// Time between stale sweeps.
    #[arg(long, value_parser = parse_duration, default_value = "5m")]
    reap_interval: Duration,

    /// Largest accepted result upload, in bytes.
    #[arg(long, env = "BENCHPLANE_MAX_UPLOAD_BYTES", default_value_t = HttpConfig::default().max_upload_bytes)]
    max_upload_bytes: usize,
}

impl ServeArgs {
    fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            recent_commits: benchplane::config::RecentCommitsConfig::default(),
            retry: RetryConfig {
                max_errors: self.max_errors,
                cooloff: self.retry_cooloff,
            },
            run: RunParameters {
                short: self.short,
                bench_time: self.bench_time,
            },
            reaper: ReaperConfig {
                timeout: self.stale_timeout,
                interval: self.reap_interval,
            },
            http: HttpConfig {
                max_upload_bytes: self.max_upload_bytes,
            },
        }
    }
}

#[derive(Debug, Args)]
struct WorkArgs {
    /// Worker name: a lowercase letter followed by lowercase letters,
    /// digits, or hyphens.
    #[arg(long, env = "BENCHPLANE_WORKER")]
    name: String,

    /// Coordinator base URL.
    #[arg(long, env = "BENCHPLANE_COORDINATOR", default_value = "http://127.0.0.1:8080")]
    coordinator: String,

    /// Shell command run per job; module path and commit are appended.
    #[arg(long, env = "BENCHPLANE_COMMAND")]
    command: String,

    /// Timeout applied to every coordinator request.
    #[arg(long, value_parser = parse_duration, default_value = "30s")]
    request_timeout: Duration,

    /// Sleep after the first empty or failed poll.
    #[arg(long, value_parser = parse_duration, default_value = "1s")]
    backoff_initial: Duration,

    /// Upper bound on the poll backoff.
    #[arg(long, value_parser = parse_duration, default_value = "1m")]
    backoff_max: Duration,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let shutdown = install_shutdown_handler();

    match cli.command {
        Command::Serve(args) => serve(args, shutdown).await,
        Command::Work(args) => work(args, shutdown).await,
    }
}

fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.cancel();
    });

    token
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(err) => {
            warn!(error = %err, "SIGTERM handler unavailable, listening for SIGINT only");
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received SIGINT, shutting down");
            }
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("received interrupt, shutting down");
    }
}

async fn serve(args: ServeArgs, shutdown: CancellationToken) -> Result<()> {
    let clock = Arc::new(DefaultClock);
    let config = args.coordinator_config();
    let catalog = args
        .catalog
        .as_deref()
        .map(Catalog::load)
        .transpose()
        .context("failed to load catalog")?
        .unwrap_or_default();

    if let Some(url) = &args.database_url {
        let pool = TaskPgPool::builder()
            .build(ConnectionManager::new(url.as_str()))
            .context("failed to create PostgreSQL pool")?;
        let repository = Arc::new(PostgresTaskRepository::new(pool, Arc::clone(&clock)));
        repository
            .ensure_schema()
            .await
            .context("failed to apply schema")?;
        for module in &catalog.modules {
            repository.add_module(module).await?;
        }
        for commit in &catalog.commits {
            repository.add_commit(commit).await?;
        }
        info!(store = "postgres", "task store ready");
        run_coordinator(repository, clock, config, args.listen, shutdown).await
    } else {
        let repository = Arc::new(InMemoryTaskRepository::with_clock(Arc::clone(&clock)));
        for module in catalog.modules {
            repository.add_module(module)?;
        }
        for commit in catalog.commits {
            repository.add_commit(commit)?;
        }
        warn!(store = "memory", "task store is not persistent");
        run_coordinator(repository, clock, config, args.listen, shutdown).await
    }
}

async fn run_coordinator<R>(
    repository: Arc<R>,
    clock: Arc<DefaultClock>,
    config: CoordinatorConfig,
    listen: SocketAddr,
    shutdown: CancellationToken,
) -> Result<()>
where
    R: TaskRepository + ModuleResolver + CandidateQueries + 'static,
{
    let scheduler = default_scheduler(&repository, &clock, &config);
    let coordinator = Coordinator::new(
        Arc::clone(&repository),
        Arc::clone(&repository),
        Arc::new(scheduler),
        config.run,
    );
    let lifecycle = TaskLifecycleService::new(Arc::clone(&repository), Arc::clone(&clock));
    let client: Arc<dyn CoordinatorClient> =
        Arc::new(LocalCoordinatorClient::new(coordinator, lifecycle));

    let reaper = StaleTaskReaper::new(repository, clock, config.reaper);
    let reaper_shutdown = shutdown.clone();
    let reaper_task = tokio::spawn(async move {
        let result = reaper.run(reaper_shutdown.clone()).await;
        if result.is_err() {
            reaper_shutdown.cancel();
        }
        result
    });

    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    info!(%listen, "coordinator listening");

    axum::serve(listener, router(client, config.http))
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await
        .context("server failed")?;

    shutdown.cancel();
    reaper_task
        .await
        .context("reaper task panicked")?
        .context("stale reaper failed")?;
    info!("coordinator stopped");
    Ok(())
}

async fn work(args: WorkArgs, shutdown: CancellationToken) -> Result<()> {
    let client = Arc::new(
        HttpCoordinatorClient::new(args.coordinator.as_str(), args.request_timeout)
            .context("failed to build coordinator client")?,
    );
    let processor = Arc::new(CommandProcessor::new(args.command));
    let backoff = BackoffConfig {
        initial: args.backoff_initial,
        max: args.backoff_max,
        ..BackoffConfig::default()
    };
    let mut worker = WorkerLoop::new(client, processor, args.name.as_str(), backoff);
    info!(worker = %args.name, coordinator = %args.coordinator, "worker started");

    match worker.run(shutdown).await {
        Ok(()) | Err(WorkerError::Cancelled) => {
            info!(worker = %args.name, "worker stopped");
            Ok(())
        }
        Err(err) => {
            error!(worker = %args.name, error = %err, "worker aborted");
            Err(err.into())
        }
    }
}
