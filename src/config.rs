//! Application configuration management.
//!
//! Configuration is layered with figment, lowest priority first:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. A TOML file: the `--config` path, or `config.toml` in the platform
//!    config directory
//! 3. Environment variables prefixed `DUPSWEEP_`, nested with `__`
//!    (e.g. `DUPSWEEP_SCAN__IO_THREADS=8`)
//!
//! Command-line flags are applied on top by the caller.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duplicates::FinderConfig;
use crate::scanner::{WalkerConfig, DEFAULT_CHUNK_SIZE};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "DUPSWEEP_";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer could not be read or parsed.
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Scan settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Skip files whose own name starts with a dot
    pub skip_hidden: bool,
    /// Treat symlinks to files as files
    pub follow_symlinks: bool,
    /// Hashing threads
    pub io_threads: usize,
    /// Read chunk size in bytes
    pub chunk_size: usize,
    /// Minimum time between progress events
    pub progress_interval_ms: u64,
    /// Ignore files smaller than this
    pub min_size: Option<u64>,
    /// Ignore files larger than this
    pub max_size: Option<u64>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            skip_hidden: true,
            follow_symlinks: false,
            io_threads: 4,
            chunk_size: DEFAULT_CHUNK_SIZE,
            progress_interval_ms: 100,
            min_size: None,
            max_size: None,
        }
    }
}

/// Action settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionSettings {
    /// Recovery folder used instead of the system trash
    pub trash_dir: Option<PathBuf>,
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `[scan]` section
    pub scan: ScanSettings,
    /// `[actions]` section
    pub actions: ActionSettings,
}

impl Config {
    /// Load configuration from all layers.
    ///
    /// `explicit` overrides the default file location. A missing default
    /// file is fine; a missing explicit file is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a layer fails to parse or a value is
    /// invalid.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::Invalid(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                log::debug!("Loading config from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(path) = Self::default_path().filter(|p| p.is_file()) {
                    log::debug!("Loading config from {}", path.display());
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract and validate a configuration from a prepared figment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on extraction failure or invalid values.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Config = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the scanner cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "scan.chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.scan.io_threads == 0 {
            return Err(ConfigError::Invalid(
                "scan.io_threads must be greater than 0".to_string(),
            ));
        }
        if let (Some(min), Some(max)) = (self.scan.min_size, self.scan.max_size) {
            if min > max {
                return Err(ConfigError::Invalid(format!(
                    "scan.min_size ({}) is larger than scan.max_size ({})",
                    min, max
                )));
            }
        }
        Ok(())
    }

    /// Default platform-specific configuration path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "dupsweep").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Finder configuration for these settings.
    #[must_use]
    pub fn finder_config(&self) -> FinderConfig {
        let walker = WalkerConfig::new(
            self.scan.follow_symlinks,
            self.scan.skip_hidden,
            self.scan.min_size,
            self.scan.max_size,
        );

        FinderConfig::default()
            .with_walker_config(walker)
            .with_io_threads(self.scan.io_threads)
            .with_chunk_size(self.scan.chunk_size)
            .with_progress_interval(Duration::from_millis(self.scan.progress_interval_ms))
    }
}
