//! Test-only helpers for observing store notifications.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;

use crate::store::Store;

/// Shared, ordered log of `label:key` notification entries.
#[derive(Debug, Clone, Default)]
pub struct KeyLog(Rc<RefCell<Vec<String>>>);

impl KeyLog {
    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    fn push(&self, entry: String) {
        self.0.borrow_mut().push(entry);
    }
}

/// Watcher that appends `label:key` to `log` on every notification.
pub fn recording_watcher(log: &KeyLog, label: &str) -> impl Fn(&str, &Store) -> Result<()> + 'static {
    let log = log.clone();
    let label = label.to_string();
    move |key, _| {
        log.push(format!("{}:{}", label, key));
        Ok(())
    }
}
