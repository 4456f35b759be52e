//! Benchplane: continuous-benchmarking control plane.
//!
//! Matches pending benchmark work (a module/commit pair to measure) against
//! a fleet of polling workers, tracks every attempt through a strict
//! lifecycle, and balances covering new commits against retrying known
//! failures on one priority scale.
//!
//! # Architecture
//!
//! Benchplane follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, HTTP, etc.)
//!
//! # Modules
//!
//! - [`task`]: Task records, the compare-and-set lifecycle, and the reaper
//! - [`scheduler`]: Prioritised candidate proposals
//! - [`coordinator`]: The assignment protocol
//! - [`worker`]: The polling worker loop and benchmark processors
//! - [`http`]: JSON transport between workers and the coordinator
//! - [`catalog`]: Module and commit seed files
//! - [`config`]: Tunables and their defaults

pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod http;
pub mod scheduler;
pub mod task;
pub mod worker;

#[cfg(test)]
mod test_support;
