//! Shared wiring for in-memory integration tests.

use std::sync::{Arc, Mutex};

use benchplane::config::CoordinatorConfig;
use benchplane::coordinator::{Coordinator, Job};
use benchplane::scheduler::default_scheduler;
use benchplane::task::{
    adapters::memory::InMemoryTaskRepository,
    domain::{BenchModule, Commit, CommitSha, TargetId},
    services::TaskLifecycleService,
};
use benchplane::worker::LocalCoordinatorClient;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

/// Clock advanced explicitly by tests.
#[derive(Debug)]
pub struct TestClock(Mutex<DateTime<Utc>>);

impl TestClock {
    /// Creates a clock fixed at 2026-06-01 09:00 UTC.
    pub fn new() -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 6, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp");
        Self(Mutex::new(start))
    }

    /// Moves the clock forward.
    pub fn advance(&self, delta: TimeDelta) {
        *self.0.lock().expect("clock lock") += delta;
    }
}

impl Clock for TestClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.0.lock().expect("clock lock")
    }
}

/// Repository type used throughout the in-memory suite.
pub type Repository = InMemoryTaskRepository<TestClock>;

/// A coordinator stack over a shared in-memory store.
pub struct Stack {
    pub clock: Arc<TestClock>,
    pub repository: Arc<Repository>,
    pub coordinator: Coordinator<Repository, Repository>,
    pub lifecycle: TaskLifecycleService<Repository, TestClock>,
    pub module: BenchModule,
}

impl Stack {
    /// Builds the default scheduler stack with one registered module.
    pub fn new() -> Self {
        let clock = Arc::new(TestClock::new());
        let repository = Arc::new(InMemoryTaskRepository::with_clock(Arc::clone(&clock)));
        let module = BenchModule::new(TargetId::new(), "golang.org/x/benchmarks", "v0.1.0")
            .expect("valid module");
        repository
            .add_module(module.clone())
            .expect("register module");

        let config = CoordinatorConfig::default();
        let scheduler = default_scheduler(&repository, &clock, &config);
        let coordinator = Coordinator::new(
            Arc::clone(&repository),
            Arc::clone(&repository),
            Arc::new(scheduler),
            config.run,
        );
        let lifecycle = TaskLifecycleService::new(Arc::clone(&repository), Arc::clone(&clock));

        Self {
            clock,
            repository,
            coordinator,
            lifecycle,
            module,
        }
    }

    /// Registers a commit made `age` before the current clock reading.
    pub fn commit(&self, fill: char, age: TimeDelta) -> CommitSha {
        let sha = CommitSha::new(fill.to_string().repeat(40)).expect("valid sha");
        let committed_at = self.clock.utc() - age;
        self.repository
            .add_commit(Commit::new(sha.clone(), committed_at))
            .expect("register commit");
        sha
    }

    /// Polls once and returns the single assigned job.
    pub async fn assign(&self, worker: &str) -> eyre::Result<Job> {
        let jobs = self.coordinator.jobs(worker).await?;
        eyre::ensure!(jobs.len() == 1, "expected one job, got {}", jobs.len());
        jobs.into_iter()
            .next()
            .ok_or_else(|| eyre::eyre!("expected a job"))
    }

    /// Wraps the stack in an in-process worker client.
    pub fn client(&self) -> LocalCoordinatorClient<Repository, Repository, TestClock> {
        LocalCoordinatorClient::new(self.coordinator.clone(), self.lifecycle.clone())
    }
}
