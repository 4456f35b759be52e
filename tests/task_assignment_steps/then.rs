//! Then steps for task assignment BDD scenarios.

use super::world::{AssignmentWorld, run_async};
use benchplane::task::{
    domain::{TaskStatus, WorkerName},
    ports::TaskRepository,
};
use rstest_bdd_macros::then;

#[then(r#"worker "{worker}" has {count:usize} pending task"#)]
fn worker_has_pending(
    world: &AssignmentWorld,
    worker: String,
    count: usize,
) -> Result<(), eyre::Report> {
    let name = WorkerName::new(worker)?;
    let pending = run_async(
        world
            .repository
            .list_worker_tasks_with_status(&name, &TaskStatus::PENDING),
    )?;
    eyre::ensure!(
        pending.len() == count,
        "expected {count} pending tasks, found {}",
        pending.len()
    );
    Ok(())
}

#[then("the last poll assigned no job")]
fn last_poll_assigned_nothing(world: &AssignmentWorld) -> Result<(), eyre::Report> {
    match &world.last_poll {
        Some(Ok(jobs)) if jobs.is_empty() => Ok(()),
        other => Err(eyre::eyre!("expected an empty assignment, got {other:?}")),
    }
}

#[then("the last poll assigned a job")]
fn last_poll_assigned_job(world: &AssignmentWorld) -> Result<(), eyre::Report> {
    match &world.last_poll {
        Some(Ok(jobs)) if jobs.len() == 1 => Ok(()),
        other => Err(eyre::eyre!("expected one job, got {other:?}")),
    }
}

#[then("the poll is rejected as an invalid worker")]
fn poll_rejected(world: &AssignmentWorld) -> Result<(), eyre::Report> {
    match &world.last_poll {
        Some(Err(err)) if err.is_invalid_worker() => Ok(()),
        other => Err(eyre::eyre!("expected an invalid worker error, got {other:?}")),
    }
}

#[then(r#"the task status is "{status}""#)]
fn task_status_is(world: &AssignmentWorld, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let task_id = world
        .assigned
        .as_ref()
        .map(|job| job.task_id)
        .ok_or_else(|| eyre::eyre!("missing assigned job"))?;
    let task = run_async(world.repository.find_by_id(task_id))?
        .ok_or_else(|| eyre::eyre!("task {task_id} missing"))?;
    eyre::ensure!(
        task.status() == expected,
        "expected status {expected}, found {}",
        task.status()
    );
    Ok(())
}

#[then("the report is rejected as a conflict")]
fn report_rejected(world: &AssignmentWorld) -> Result<(), eyre::Report> {
    match &world.last_report {
        Some(Err(err)) if err.is_conflict() => Ok(()),
        other => Err(eyre::eyre!("expected a transition conflict, got {other:?}")),
    }
}
