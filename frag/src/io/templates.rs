//! Loading template files into a [`TemplateCache`].

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::cache::TemplateCache;

/// Extension of files picked up by [`load_dir`].
pub const TEMPLATE_EXTENSION: &str = "html";

/// Read a template file.
pub fn read_template(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read template {}", path.display()))
}

/// Register every `*.html` file directly under `dir`, keyed by file stem.
///
/// Returns the names registered, sorted. Subdirectories are not traversed.
pub fn load_dir(cache: &mut TemplateCache, dir: &Path) -> Result<Vec<String>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("read template dir {}", dir.display()))?;

    let mut loaded = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("list template dir {}", dir.display()))?
            .path();
        if !path.is_file() || !path.extension().is_some_and(|e| e == TEMPLATE_EXTENSION) {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            warn!(path = %path.display(), "skipping template with non-UTF-8 name");
            continue;
        };
        let source = read_template(&path)?;
        cache.set(name, &source);
        loaded.push(name.to_string());
    }

    loaded.sort();
    debug!(dir = %dir.display(), count = loaded.len(), "loaded templates");
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn load_dir_registers_html_files_by_stem() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("card.html"), "<b>{{ title }}</b>").expect("write");
        fs::write(temp.path().join("list.html"), "{{ each xs }}{{ item }}{{ end }}")
            .expect("write");
        fs::write(temp.path().join("notes.txt"), "ignored").expect("write");
        fs::create_dir(temp.path().join("sub.html")).expect("mkdir");

        let mut cache = TemplateCache::new();
        let names = load_dir(&mut cache, temp.path()).expect("load");

        assert_eq!(names, vec!["card", "list"]);
        assert_eq!(cache.get("card", &json!({"title": "T"})), "<b>T</b>");
        assert_eq!(cache.get("list", &json!({"xs": [1, 2]})), "12");
        assert!(!cache.contains("notes"));
    }

    #[test]
    fn load_dir_fails_for_missing_dir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut cache = TemplateCache::new();
        let err = load_dir(&mut cache, &temp.path().join("absent")).unwrap_err();
        assert!(err.to_string().contains("read template dir"));
    }
}
