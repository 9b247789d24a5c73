//! Configuration stored in `frag.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::store::StoreConfig;
use crate::template::RenderOptions;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "frag.toml";

/// Frag configuration (TOML).
///
/// Missing tables and fields fall back to defaults: blank substitution for
/// missing values and a cascade limit of 100 notifications.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FragConfig {
    pub render: RenderOptions,
    pub store: StoreConfig,
}

impl FragConfig {
    pub fn validate(&self) -> Result<()> {
        self.store.validate()
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `FragConfig::default()`.
pub fn load_config(path: &Path) -> Result<FragConfig> {
    if !path.exists() {
        return Ok(FragConfig::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: FragConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &FragConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
