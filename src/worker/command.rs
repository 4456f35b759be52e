//! Processor that runs each job through a shell command.

use super::{
    ports::{Processor, ProcessorError, ResultStream},
    shell_escape,
};
use crate::coordinator::Job;
use async_trait::async_trait;
use std::io::Cursor;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Runs a configured shell command per job and streams back its stdout.
///
/// The command line is `<program> '<module path>' '<commit sha>'`, run by
/// `sh -c`. Job parameters are also exported as `BENCH_TASK_UUID`,
/// `BENCH_COMMIT_SHA`, `BENCH_MODULE_PATH`, `BENCH_MODULE_VERSION`,
/// `BENCH_SHORT`, and `BENCH_TIME` (milliseconds with an `ms` suffix).
#[derive(Debug, Clone)]
pub struct CommandProcessor {
    program: String,
}

impl CommandProcessor {
    /// Creates a processor invoking `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Returns the shell command line for `job`.
    #[must_use]
    pub fn command_line(&self, job: &Job) -> String {
        format!(
            "{} {} {}",
            self.program,
            shell_escape(&job.module.path),
            shell_escape(job.commit_sha.as_str())
        )
    }
}

#[async_trait]
impl Processor for CommandProcessor {
    async fn run(&self, job: &Job) -> Result<ResultStream, ProcessorError> {
        let command_line = self.command_line(job);
        debug!(task_id = %job.task_id, %command_line, "spawning benchmark runner");

        let output = Command::new("sh")
            .arg("-c")
            .arg(&command_line)
            .env("BENCH_TASK_UUID", job.task_id.to_string())
            .env("BENCH_COMMIT_SHA", job.commit_sha.as_str())
            .env("BENCH_MODULE_PATH", &job.module.path)
            .env("BENCH_MODULE_VERSION", &job.module.version)
            .env("BENCH_SHORT", job.short.to_string())
            .env("BENCH_TIME", format!("{}ms", job.bench_time.as_millis()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(ProcessorError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(Box::pin(Cursor::new(output.stdout)))
    }
}
