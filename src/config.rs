//! Configuration types.
//!
//! Every tunable of the scheduler, coordinator, worker loop, and stale
//! reaper lives here with its default. The binary assembles these from
//! command-line arguments and environment variables.

use std::time::Duration;
use thiserror::Error;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Settings for the recent-commits strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecentCommitsConfig {
    /// Only commits younger than this are proposed.
    pub window: Duration,
    /// Commits at most this old get `High` priority.
    pub high_age: Duration,
    /// Commits at least this old get `Idle` priority.
    pub idle_age: Duration,
}

impl Default for RecentCommitsConfig {
    fn default() -> Self {
        Self {
            window: DAY.saturating_mul(365),
            high_age: DAY.saturating_mul(60),
            idle_age: DAY.saturating_mul(365),
        }
    }
}

/// Settings for the retry strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Specs with this many failed attempts are no longer proposed.
    pub max_errors: u32,
    /// Minimum time since the last attempt before a retry is proposed.
    pub cooloff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_errors: 4,
            cooloff: Duration::from_secs(60 * 60), // 1 hour
        }
    }
}

/// Run parameters applied to every job handed to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunParameters {
    /// Run benchmarks in short mode.
    pub short: bool,
    /// Target duration of each benchmark.
    pub bench_time: Duration,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            short: true,
            bench_time: Duration::from_secs(1),
        }
    }
}

/// Settings for the worker's poll backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    /// Sleep after the first empty or failed poll.
    pub initial: Duration,
    /// Growth factor applied after each sleep.
    pub factor: f64,
    /// Upper bound on the sleep.
    pub max: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            factor: 1.5,
            max: Duration::from_secs(60),
        }
    }
}

/// Settings for the stale-task reaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaperConfig {
    /// In-flight tasks without a status update for this long are timed out.
    pub timeout: Duration,
    /// Time between sweeps.
    pub interval: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(6 * 60 * 60), // 6 hours
            interval: Duration::from_secs(5 * 60),     // 5 minutes
        }
    }
}

/// Settings for the coordinator's HTTP surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    /// Largest accepted result upload, in bytes.
    pub max_upload_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 64 * 1024 * 1024, // 64 MiB
        }
    }
}

/// Coordinator-side configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CoordinatorConfig {
    /// Recent-commits strategy settings.
    pub recent_commits: RecentCommitsConfig,
    /// Retry strategy settings.
    pub retry: RetryConfig,
    /// Parameters stamped onto every job.
    pub run: RunParameters,
    /// Stale reaper settings.
    pub reaper: ReaperConfig,
    /// HTTP surface settings.
    pub http: HttpConfig,
}

/// Error returned by [`parse_duration`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid duration '{0}', expected an integer followed by ms, s, m, h, or d")]
pub struct ParseDurationError(pub String);

/// Parses durations such as `500ms`, `90s`, `5m`, `6h`, or `365d`.
///
/// ```
/// use benchplane::config::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("5m"), Ok(Duration::from_secs(300)));
/// ```
///
/// # Errors
///
/// Returns [`ParseDurationError`] for a missing or unknown unit, a
/// non-numeric amount, or an overflowing value.
pub fn parse_duration(input: &str) -> Result<Duration, ParseDurationError> {
    let trimmed = input.trim();
    let invalid = || ParseDurationError(input.to_owned());
    let split = trimmed
        .find(|ch: char| !ch.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (amount, unit) = trimmed.split_at(split);
    let value: u64 = amount.parse().map_err(|_| invalid())?;

    let seconds_per_unit = match unit {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => DAY.as_secs(),
        _ => return Err(invalid()),
    };
    value
        .checked_mul(seconds_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(invalid)
}
