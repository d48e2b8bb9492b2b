//! Serializable run configuration: where the bars come from plus the engine
//! parameter set.
//!
//! ```toml
//! label = "usdjpy-m1"
//!
//! [data]
//! source = "csv"
//! path = "data/USDJPYM1.csv"
//! tail = 6000
//!
//! [engine.stop]
//! atr_cap = 3.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use zonelab_core::config::{ConfigError as EngineConfigError, EngineConfig};

/// Unique identifier for a run configuration (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse run config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Engine(#[from] EngineConfigError),
}

/// Bar source for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum DataConfig {
    /// Headerless CSV file.
    Csv {
        path: PathBuf,
        /// Reject malformed rows instead of skipping them.
        #[serde(default)]
        strict: bool,
        /// Keep only the last `tail` bars.
        #[serde(default)]
        tail: Option<usize>,
    },
    /// Seeded random walk of one-minute bars.
    Synthetic {
        #[serde(default = "default_synthetic_bars")]
        bars: usize,
        #[serde(default)]
        seed: String,
        #[serde(default = "default_start_price")]
        start_price: f64,
    },
}

fn default_synthetic_bars() -> usize {
    20_160
}

fn default_start_price() -> f64 {
    150.0
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig::Synthetic {
            bars: default_synthetic_bars(),
            seed: String::new(),
            start_price: default_start_price(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Free-form name used in reports and artifact directories.
    pub label: String,
    pub data: DataConfig,
    pub engine: EngineConfig,
}

impl RunConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.engine.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Deterministic hash of the whole configuration, data source included.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"));
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Label, or a short run id when none was given.
    pub fn display_label(&self) -> String {
        if self.label.is_empty() {
            self.run_id()[..12].to_string()
        } else {
            self.label.clone()
        }
    }
}
