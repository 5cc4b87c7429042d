use crate::core::{Result, SqlpeekError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub ui: Option<UiConfig>,
    pub sqlite: Option<SqliteConfig>,
}

/// UI-related configuration.
#[derive(Debug, Deserialize)]
pub struct UiConfig {
    /// Number of rows the grid viewport shows at once.
    pub max_display_rows: Option<usize>,
}

/// SQLite-related configuration.
#[derive(Debug, Deserialize)]
pub struct SqliteConfig {
    /// Busy timeout applied to every connection, in milliseconds.
    pub busy_timeout_ms: Option<u64>,
}

impl Config {
    /// Viewport height for the results grid, with a default of 10.
    pub fn max_display_rows(&self) -> usize {
        self.ui
            .as_ref()
            .and_then(|ui| ui.max_display_rows)
            .unwrap_or(10)
    }

    /// Configured busy timeout, if any.
    pub fn busy_timeout_ms(&self) -> Option<u64> {
        self.sqlite.as_ref().and_then(|s| s.busy_timeout_ms)
    }
}

/// Loads configuration from a TOML file at the given path.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| SqlpeekError::Config(e.to_string()))
}

/// Default config file location: `<config-dir>/sqlpeek/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sqlpeek").join("config.toml"))
}

/// Loads the default config file, falling back to defaults when the file
/// does not exist. A present-but-malformed file is an error rather than a
/// silent fallback.
pub fn load_default() -> Result<Config> {
    match default_config_path() {
        Some(path) if path.is_file() => load_config(path),
        _ => Ok(Config::default()),
    }
}
