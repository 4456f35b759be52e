//! Shared world state for task assignment BDD scenarios.

use std::sync::{Arc, Mutex};

use benchplane::config::CoordinatorConfig;
use benchplane::coordinator::{Coordinator, CoordinatorError, Job};
use benchplane::scheduler::default_scheduler;
use benchplane::task::{
    adapters::memory::InMemoryTaskRepository,
    domain::Task,
    services::{StaleTaskReaper, TaskLifecycleError, TaskLifecycleService},
};
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use rstest::fixture;

/// Clock advanced explicitly by scenario steps.
#[derive(Debug)]
pub struct ScenarioClock(Mutex<DateTime<Utc>>);

impl ScenarioClock {
    fn new() -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 6, 1, 9, 0, 0)
            .single()
            .unwrap_or_default();
        Self(Mutex::new(start))
    }

    /// Moves the clock forward.
    pub fn advance(&self, delta: TimeDelta) {
        if let Ok(mut now) = self.0.lock() {
            *now += delta;
        }
    }
}

impl Clock for ScenarioClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0.lock().map(|now| *now).unwrap_or_default()
    }
}

/// Repository type used by the BDD world.
pub type ScenarioRepository = InMemoryTaskRepository<ScenarioClock>;

/// Scenario world for task assignment behaviour tests.
pub struct AssignmentWorld {
    pub clock: Arc<ScenarioClock>,
    pub repository: Arc<ScenarioRepository>,
    pub coordinator: Coordinator<ScenarioRepository, ScenarioRepository>,
    pub lifecycle: TaskLifecycleService<ScenarioRepository, ScenarioClock>,
    pub reaper: StaleTaskReaper<ScenarioRepository, ScenarioClock>,
    pub next_commit: u8,
    pub assigned: Option<Job>,
    pub last_poll: Option<Result<Vec<Job>, CoordinatorError>>,
    pub last_report: Option<Result<Task, TaskLifecycleError>>,
}

impl AssignmentWorld {
    /// Creates a world over an empty store with default configuration.
    #[must_use]
    pub fn new() -> Self {
        let clock = Arc::new(ScenarioClock::new());
        let repository = Arc::new(InMemoryTaskRepository::with_clock(Arc::clone(&clock)));
        let config = CoordinatorConfig::default();
        let coordinator = Coordinator::new(
            Arc::clone(&repository),
            Arc::clone(&repository),
            Arc::new(default_scheduler(&repository, &clock, &config)),
            config.run,
        );

        Self {
            lifecycle: TaskLifecycleService::new(Arc::clone(&repository), Arc::clone(&clock)),
            reaper: StaleTaskReaper::new(Arc::clone(&repository), Arc::clone(&clock), config.reaper),
            coordinator,
            clock,
            repository,
            next_commit: 0,
            assigned: None,
            last_poll: None,
            last_report: None,
        }
    }
}

impl Default for AssignmentWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> AssignmentWorld {
    AssignmentWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
