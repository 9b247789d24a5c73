//! String templates with loops and a small observable key-value store.
//!
//! The crate keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (path lookup, template parsing,
//!   value rendering). No I/O, fully testable in isolation.
//! - **[`io`]**: Filesystem helpers (config, template directories).
//!
//! [`template`], [`cache`] and [`store`] build the public API on top of those:
//! [`expand`] renders a template string against a JSON data context, the
//! [`TemplateCache`] keeps named compiled templates, and [`Reactive`] owns an
//! observable [`Store`] plus the watchers notified on every write.

pub mod cache;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod store;
pub mod template;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use cache::TemplateCache;
pub use crate::core::value::MissingValue;
pub use store::{Lifecycle, Reactive, Store, StoreConfig, WatchId};
pub use template::{RenderOptions, Template, expand};
