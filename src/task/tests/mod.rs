//! Unit tests for the task domain, services, and in-memory adapter.
