//! Coordinator assignment through the default scheduler composition.

use super::helpers::Stack;
use benchplane::config::CoordinatorConfig;
use benchplane::task::domain::{TaskStatus, WorkerName};
use benchplane::task::ports::TaskRepository;
use chrono::TimeDelta;
use eyre::ensure;
use rstest::{fixture, rstest};

#[fixture]
fn stack() -> Stack {
    Stack::new()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn newest_commit_is_assigned_first(stack: Stack) -> eyre::Result<()> {
    stack.commit('1', TimeDelta::days(200));
    let newest = stack.commit('2', TimeDelta::hours(3));
    stack.commit('3', TimeDelta::days(20));

    let job = stack.assign("gopher").await?;

    ensure!(job.commit_sha == newest);
    ensure!(job.module.path == stack.module.path());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeated_polls_do_not_pile_up_work(stack: Stack) -> eyre::Result<()> {
    stack.commit('1', TimeDelta::days(1));
    stack.commit('2', TimeDelta::days(2));

    let first = stack.assign("gopher").await?;
    let second = stack.assign("gopher").await?;
    let third = stack.coordinator.jobs("gopher").await?;

    ensure!(first.commit_sha != second.commit_sha);
    ensure!(third.is_empty(), "unexpected third job");
    let pending = stack
        .repository
        .list_worker_tasks_with_status(&WorkerName::new("gopher")?, &TaskStatus::PENDING)
        .await?;
    ensure!(pending.len() == 2, "pending {}", pending.len());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completed_spec_is_only_offered_to_other_workers(stack: Stack) -> eyre::Result<()> {
    let sha = stack.commit('a', TimeDelta::days(1));
    let job = stack.assign("gopher").await?;
    stack.lifecycle.start(job.task_id).await?;
    stack.lifecycle.upload(job.task_id, b"ok".to_vec()).await?;
    stack.lifecycle.complete(job.task_id).await?;

    ensure!(stack.coordinator.jobs("gopher").await?.is_empty());
    let other = stack.assign("gopher-arm64").await?;
    ensure!(other.commit_sha == sha);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn fresh_commits_outrank_failures_still_cooling_off(stack: Stack) -> eyre::Result<()> {
    stack.commit('a', TimeDelta::days(2));
    let failed = stack.assign("gopher").await?;
    stack.lifecycle.start(failed.task_id).await?;
    stack.lifecycle.fail(failed.task_id).await?;
    let fresh = stack.commit('b', TimeDelta::minutes(5));

    let job = stack.assign("gopher").await?;

    ensure!(job.commit_sha == fresh);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cooled_off_failures_are_retried_first(stack: Stack) -> eyre::Result<()> {
    stack.commit('a', TimeDelta::days(2));
    let failed = stack.assign("gopher").await?;
    stack.lifecycle.start(failed.task_id).await?;
    stack.lifecycle.fail(failed.task_id).await?;
    stack.commit('b', TimeDelta::minutes(5));
    stack.clock.advance(TimeDelta::hours(2));

    let job = stack.assign("gopher").await?;

    ensure!(job.commit_sha == failed.commit_sha);
    ensure!(job.task_id != failed.task_id);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_spec_waits_out_the_cooloff(stack: Stack) -> eyre::Result<()> {
    stack.commit('a', TimeDelta::days(2));
    let failed = stack.assign("gopher").await?;
    stack.lifecycle.start(failed.task_id).await?;
    stack.lifecycle.fail(failed.task_id).await?;

    ensure!(stack.coordinator.jobs("gopher").await?.is_empty());
    stack.clock.advance(TimeDelta::minutes(30));
    ensure!(stack.coordinator.jobs("gopher").await?.is_empty());

    stack.clock.advance(TimeDelta::minutes(31));
    let retried = stack.assign("gopher").await?;
    ensure!(retried.commit_sha == failed.commit_sha);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn spec_is_abandoned_after_max_errors(stack: Stack) -> eyre::Result<()> {
    let sha = stack.commit('a', TimeDelta::days(2));
    let max_errors = CoordinatorConfig::default().retry.max_errors;

    for attempt in 0..max_errors {
        if attempt > 0 {
            stack.clock.advance(TimeDelta::hours(2));
        }
        let job = stack.assign("gopher").await?;
        ensure!(job.commit_sha == sha, "attempt {attempt} got {}", job.commit_sha);
        stack.lifecycle.start(job.task_id).await?;
        stack.lifecycle.fail(job.task_id).await?;
    }

    for _ in 0..3 {
        stack.clock.advance(TimeDelta::hours(2));
        ensure!(stack.coordinator.jobs("gopher").await?.is_empty());
    }
    let other = stack.assign("gopher-arm64").await?;
    ensure!(other.commit_sha == sha);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn jobs_carry_run_parameters(stack: Stack) -> eyre::Result<()> {
    stack.commit('c', TimeDelta::days(1));

    let job = stack.assign("gopher").await?;

    ensure!(job.short);
    ensure!(job.bench_time == std::time::Duration::from_secs(1));
    ensure!(job.module.version == stack.module.version());
    Ok(())
}
