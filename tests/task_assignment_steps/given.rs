//! Given steps for task assignment BDD scenarios.

use super::world::{AssignmentWorld, run_async};
use benchplane::task::domain::{BenchModule, Commit, CommitSha, TargetId, TaskId};
use chrono::TimeDelta;
use eyre::WrapErr;
use mockable::Clock;
use rstest_bdd_macros::given;

#[given(r#"a registered module "{path}""#)]
fn registered_module(world: &mut AssignmentWorld, path: String) -> Result<(), eyre::Report> {
    let module = BenchModule::new(TargetId::new(), path, "v0.1.0")?;
    world.repository.add_module(module)?;
    Ok(())
}

#[given("a commit made {days:i64} days ago")]
fn commit_made_days_ago(world: &mut AssignmentWorld, days: i64) -> Result<(), eyre::Report> {
    world.next_commit = world.next_commit.saturating_add(1);
    let sha = CommitSha::new(format!("{:040x}", world.next_commit))?;
    let committed_at = world.clock.utc() - TimeDelta::days(days);
    world.repository.add_commit(Commit::new(sha, committed_at))?;
    Ok(())
}

fn start_assigned_job(world: &mut AssignmentWorld, worker: &str) -> Result<TaskId, eyre::Report> {
    let jobs = run_async(world.coordinator.jobs(worker)).wrap_err("poll for a job")?;
    let job = jobs
        .into_iter()
        .next()
        .ok_or_else(|| eyre::eyre!("no job assigned to {worker}"))?;
    let task_id = job.task_id;
    run_async(world.lifecycle.start(task_id)).wrap_err("report start")?;
    world.assigned = Some(job);
    Ok(task_id)
}

#[given(r#"worker "{worker}" has started the assigned job"#)]
fn worker_started_job(world: &mut AssignmentWorld, worker: String) -> Result<(), eyre::Report> {
    start_assigned_job(world, &worker)?;
    Ok(())
}

#[given(r#"worker "{worker}" has completed the assigned job"#)]
fn worker_completed_job(world: &mut AssignmentWorld, worker: String) -> Result<(), eyre::Report> {
    let task_id = start_assigned_job(world, &worker)?;
    run_async(world.lifecycle.upload(task_id, b"BenchmarkX 1 1 ns/op".to_vec()))
        .wrap_err("report upload")?;
    run_async(world.lifecycle.complete(task_id)).wrap_err("ingest results")?;
    Ok(())
}

#[given("{hours:i64} hours pass")]
fn hours_pass(world: &mut AssignmentWorld, hours: i64) {
    world.clock.advance(TimeDelta::hours(hours));
}

#[given("the stale reaper has swept")]
fn reaper_has_swept(world: &mut AssignmentWorld) -> Result<(), eyre::Report> {
    run_async(world.reaper.sweep()).wrap_err("stale sweep")?;
    Ok(())
}
