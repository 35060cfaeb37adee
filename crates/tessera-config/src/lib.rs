use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid setting locator.{key} in {config_path}: {reason}")]
    InvalidSetting {
        config_path: PathBuf,
        key: &'static str,
        reason: String,
    },
}

/// Settings read from `~/.config/tessera/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Folder holding `.md` and `.json` documents. `~` and `$VARS` are expanded on load.
    pub documents_path: PathBuf,
    #[serde(default)]
    pub locator: LocatorSettings,
}

/// Pointer hit-testing tunables, in pixels. Missing keys take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorSettings {
    pub hover_threshold: f32,
    pub tie_band: f32,
    pub sample_offsets: Vec<f32>,
    pub lateral_offset: f32,
}

impl Default for LocatorSettings {
    fn default() -> Self {
        Self {
            hover_threshold: 180.0,
            tie_band: 8.0,
            sample_offsets: vec![0.0, -2.0, 2.0, -4.0, 4.0],
            lateral_offset: 24.0,
        }
    }
}

impl LocatorSettings {
    /// First setting that the locator cannot work with, as `(key, reason)`.
    fn problem(&self) -> Option<(&'static str, String)> {
        let distances = [
            ("hover_threshold", self.hover_threshold),
            ("tie_band", self.tie_band),
            ("lateral_offset", self.lateral_offset),
        ];
        if let Some((key, value)) = distances
            .into_iter()
            .find(|(_, value)| !value.is_finite() || *value < 0.0)
        {
            return Some((key, format!("expected a distance >= 0, got {value}")));
        }
        if self.sample_offsets.is_empty() {
            return Some(("sample_offsets", "at least one offset is required".into()));
        }
        if let Some(value) = self.sample_offsets.iter().find(|v| !v.is_finite()) {
            return Some(("sample_offsets", format!("{value} is not a number of pixels")));
        }
        None
    }
}

impl Config {
    pub fn new(documents_path: impl Into<PathBuf>) -> Self {
        Self {
            documents_path: documents_path.into(),
            locator: LocatorSettings::default(),
        }
    }

    /// Reads the config at `config_path`. A missing file is `Ok(None)`.
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;
        Self::parse(&content, config_path).map(Some)
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        Self::load_from_path(Self::config_path())
    }

    fn parse(content: &str, config_path: &Path) -> Result<Self, ConfigError> {
        let mut config: Config =
            toml::from_str(content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        if let Some((key, reason)) = config.locator.problem() {
            return Err(ConfigError::InvalidSetting {
                config_path: config_path.to_path_buf(),
                key,
                reason,
            });
        }

        config.documents_path =
            Self::expand_path(&config.documents_path).unwrap_or(config.documents_path);
        Ok(config)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(config_path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to_path(Self::config_path())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/tessera");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        shellexpand::full(&path_str)
            .ok()
            .map(|expanded| PathBuf::from(expanded.as_ref()))
    }
}
