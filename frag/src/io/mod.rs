//! I/O helpers for the `frag` binary and embedders.

pub mod config;
pub mod templates;
