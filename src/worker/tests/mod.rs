//! Unit tests for the worker loop and the in-process client.
