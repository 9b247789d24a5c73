//! Stable exit codes for the `frag` CLI.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed due to unreadable input, invalid config or other errors.
pub const INVALID: i32 = 1;
/// `frag check` found structural problems in the template.
pub const DIAGNOSTICS: i32 = 2;
