//! Deterministic, pure logic shared by the saga runner.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod effect;
pub mod error_match;
pub mod raised;
pub mod signal;
pub mod value_table;
