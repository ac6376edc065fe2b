//! Deterministic, pure logic for the guided walk.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod command;
pub mod email;
pub mod engine;
pub mod matcher;
pub mod types;
