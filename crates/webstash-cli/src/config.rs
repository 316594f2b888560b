use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use webstash_core::StoreConfig;

/// Name of the persistent backend's document inside the data directory.
pub const PERSISTENT_FILE: &str = "persistent.json";

/// Settings read from `<config_dir>/webstash/config.json`.
///
/// Every field is optional; command-line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub separator: Option<char>,
    pub data_dir: Option<PathBuf>,
}

impl FileConfig {
    /// The default config file location, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("webstash").join("config.json"))
    }

    /// Load `path`, treating a missing file as an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }
}

/// Effective settings after merging flags over the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub store: StoreConfig,
}

impl Settings {
    pub fn resolve(
        file: FileConfig,
        data_dir: Option<PathBuf>,
        separator: Option<char>,
    ) -> Result<Self> {
        let data_dir = match data_dir.or(file.data_dir) {
            Some(dir) => dir,
            None => dirs::data_dir()
                .map(|d| d.join("webstash"))
                .context("no data directory available; pass --data-dir")?,
        };
        let mut store = StoreConfig::default();
        if let Some(sep) = separator.or(file.separator) {
            store = store.with_separator(sep);
        }
        Ok(Self { data_dir, store })
    }

    pub fn persistent_path(&self) -> PathBuf {
        self.data_dir.join(PERSISTENT_FILE)
    }
}
