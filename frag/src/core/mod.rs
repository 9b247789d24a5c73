//! Deterministic, pure logic shared by the template engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod path;
pub mod syntax;
pub mod value;
