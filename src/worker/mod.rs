//! Worker side of the polling protocol.
//!
//! A [`WorkerLoop`] polls a [`CoordinatorClient`] for jobs, executes them
//! through a [`Processor`], and reports every lifecycle step back. Reporting
//! failures never leave a task ambiguous: the job is halted instead.

mod backoff;
mod command;
mod local;
pub mod ports;
mod runner;
mod shell;

#[cfg(test)]
mod tests;

pub use backoff::Backoff;
pub use command::CommandProcessor;
pub use local::LocalCoordinatorClient;
pub use ports::{
    ClientError, ClientResult, CoordinatorClient, Processor, ProcessorError, ResultStream,
};
pub use runner::{JobOutcome, WorkerError, WorkerLoop};
pub use shell::shell_escape;
