//! When steps for task assignment BDD scenarios.

use super::world::{AssignmentWorld, run_async};
use rstest_bdd_macros::when;

#[when(r#"worker "{worker}" polls {times:u32} times"#)]
fn worker_polls(world: &mut AssignmentWorld, worker: String, times: u32) {
    for _ in 0..times {
        let result = run_async(world.coordinator.jobs(&worker));
        world.last_poll = Some(result);
    }
}

#[when("the stale reaper sweeps")]
fn stale_reaper_sweeps(world: &mut AssignmentWorld) -> Result<(), eyre::Report> {
    run_async(world.reaper.sweep())?;
    Ok(())
}

#[when("the worker uploads its results")]
fn worker_uploads(world: &mut AssignmentWorld) -> Result<(), eyre::Report> {
    let task_id = world
        .assigned
        .as_ref()
        .map(|job| job.task_id)
        .ok_or_else(|| eyre::eyre!("missing assigned job"))?;
    world.last_report = Some(run_async(
        world.lifecycle.upload(task_id, b"late".to_vec()),
    ));
    Ok(())
}
