//! `config.toml` loading with an environment overlay.
//!
//! ```toml
//! data_dir = "~/jams"
//! lookahead_ms = 100
//!
//! [gemini]
//! api_key = "..."
//! model = "gemini-3-flash-preview"
//!
//! [sampling]
//! first_delay_ms = 1000
//! interval_ms = 5000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::analysis::Cadence;
use crate::error::ConfigError;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: Option<PathBuf>,
    pub lookahead_ms: u64,
    pub gemini: GeminiConfig,
    pub sampling: SamplingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            lookahead_ms: 100,
            gemini: GeminiConfig::default(),
            sampling: SamplingConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-3-flash-preview".into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            timeout_secs: 20,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub first_delay_ms: u64,
    pub interval_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { first_delay_ms: 1000, interval_ms: 5000 }
    }
}

impl SamplingConfig {
    pub fn cadence(&self) -> Cadence {
        Cadence {
            first_delay: Duration::from_millis(self.first_delay_ms),
            interval: Duration::from_millis(self.interval_ms),
        }
    }
}

impl AppConfig {
    /// Reads `path` if given, else the user config file if one exists,
    /// else defaults. Environment overrides are applied on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };
        let mut config = match file {
            Some(ref p) => load_from_file(p)?,
            None => AppConfig::default(),
        };
        let overrides = config.apply_env(|name| std::env::var(name).ok());
        debug!(file = ?file, ?overrides, "config loaded");
        Ok(config)
    }

    /// Applies environment overrides through `lookup`; returns the names
    /// that took effect.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Vec<&'static str> {
        let mut applied = Vec::new();
        for name in ["GEMINI_API_KEY", "API_KEY"] {
            if let Some(v) = lookup(name).filter(|v| !v.is_empty()) {
                self.gemini.api_key = Some(v);
                applied.push(name);
                break;
            }
        }
        if let Some(v) = lookup("JAMPILOT_DATA_DIR").filter(|v| !v.is_empty()) {
            self.data_dir = Some(PathBuf::from(v));
            applied.push("JAMPILOT_DATA_DIR");
        }
        applied
    }

    pub fn lookahead(&self) -> Duration {
        Duration::from_millis(self.lookahead_ms)
    }

    /// `override_dir` (from the command line) wins over the config value,
    /// which wins over the platform data directory.
    pub fn resolve_data_dir(&self, override_dir: Option<&Path>) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = override_dir {
            return Ok(dir.to_path_buf());
        }
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        directories::ProjectDirs::from("", "", "jampilot")
            .map(|d| d.data_dir().to_path_buf())
            .ok_or(ConfigError::NoDataDir)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "jampilot").map(|d| d.config_dir().join(CONFIG_FILE))
}

pub fn load_from_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_toml(&contents, path)
}

fn parse_toml(contents: &str, path: &Path) -> Result<AppConfig, ConfigError> {
    toml::from_str(contents).map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
