//! HTTP transport between workers and the coordinator.
//!
//! [`router`] serves any [`crate::worker::CoordinatorClient`] (normally a
//! [`crate::worker::LocalCoordinatorClient`]) and [`HttpCoordinatorClient`]
//! speaks to it from a remote worker, so the worker loop is unaware of
//! which side of the network it runs on.

mod client;
mod server;
pub mod wire;

pub use client::HttpCoordinatorClient;
pub use server::{ApiError, router};
