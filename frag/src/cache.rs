//! Named template cache.
//!
//! Templates are compiled on [`TemplateCache::set`] and rendered on
//! [`TemplateCache::get`]. The cache is unbounded; entries live until removed
//! or overwritten.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::template::{RenderOptions, Template};

#[derive(Debug, Clone, Default)]
pub struct TemplateCache {
    templates: HashMap<String, Template>,
    options: RenderOptions,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache that renders with `options` instead of the defaults.
    pub fn with_options(options: RenderOptions) -> Self {
        Self {
            templates: HashMap::new(),
            options,
        }
    }

    /// Compile `source` and store it under `name`, replacing any prior entry.
    pub fn set(&mut self, name: &str, source: &str) {
        let template = Template::compile(source);
        let replaced = self.templates.insert(name.to_string(), template).is_some();
        debug!(name, replaced, "cached template");
    }

    /// Render the template stored under `name`, or `""` if there is none.
    pub fn get(&self, name: &str, data: &Value) -> String {
        match self.templates.get(name) {
            Some(template) => template.render(data, &self.options),
            None => {
                debug!(name, "template cache miss");
                String::new()
            }
        }
    }

    /// Compiled template under `name`, e.g. to inspect its diagnostics.
    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.templates.remove(name).is_some()
    }

    /// Cached template names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
