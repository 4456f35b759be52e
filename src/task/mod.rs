//! Task assignment records and their lifecycle.
//!
//! Every assignment the coordinator makes is persisted as a [`domain::Task`]
//! and afterwards mutated only through the compare-and-set transition
//! primitive of [`ports::TaskRepository`], whether the actor is a worker, the
//! ingester, or the stale reaper. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
