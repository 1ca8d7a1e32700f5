//! Configuration management and validation.
//!
//! Provides the layered configuration for the analyzer: built-in defaults,
//! an optional TOML file, then CLI overrides applied by the command layer.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{default_parallel_workers, SITE_LIST_FILENAME};
use crate::{Error, Result};

/// Top-level analyzer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub io: IoConfig,
    pub performance: PerformanceConfig,
    pub logging: LoggingConfig,
}

/// Input and output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    /// Directory holding the site list and the per-coordinate series files
    pub input_dir: PathBuf,

    /// Directory the result CSVs are written to
    pub output_dir: PathBuf,

    /// Site list path override; defaults to the conventional name inside
    /// the input directory
    pub site_list: Option<PathBuf>,
}

/// Processing performance settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Number of concurrent site-analysis workers
    pub workers: usize,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level used when no CLI verbosity is given
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            io: IoConfig::default(),
            performance: PerformanceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            site_list: None,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            workers: default_parallel_workers(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit file, or from the default
    /// location when it exists, or fall back to the built-in defaults.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_file {
            return Self::from_file(path);
        }
        if let Ok(default_path) = Self::default_config_path()
            && default_path.exists()
        {
            debug!(path = %default_path.display(), "using default config file");
            return Self::from_file(&default_path);
        }
        Ok(Self::default())
    }

    /// Parse a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("cannot read config {}", path.display()), e))?;
        toml::from_str(&content).map_err(|e| {
            Error::configuration(format!("invalid config {}: {e}", path.display()))
        })
    }

    /// Conventional config file location under the user config directory.
    pub fn default_config_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("agcd-analyzer").join("config.toml"))
            .ok_or_else(|| Error::configuration("cannot determine user config directory"))
    }

    /// Resolved site list path.
    pub fn site_list_path(&self) -> PathBuf {
        self.io
            .site_list
            .clone()
            .unwrap_or_else(|| self.io.input_dir.join(SITE_LIST_FILENAME))
    }

    /// Validate settings before processing starts.
    pub fn validate(&self) -> Result<()> {
        if self.performance.workers == 0 {
            return Err(Error::configuration("workers must be at least 1"));
        }
        if !self.io.input_dir.exists() {
            return Err(Error::configuration(format!(
                "input directory does not exist: {}",
                self.io.input_dir.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.io.input_dir, PathBuf::from("input"));
        assert_eq!(config.io.output_dir, PathBuf::from("output"));
        assert!(config.performance.workers >= 1);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_site_list_path_defaults_into_input_dir() {
        let config = Config::default();
        assert_eq!(
            config.site_list_path(),
            PathBuf::from("input").join(SITE_LIST_FILENAME)
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[performance]\nworkers = 2\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.performance.workers, 2);
        assert_eq!(config.io.input_dir, PathBuf::from("input"));
    }

    #[test]
    fn test_invalid_toml_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "workers = [not toml").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.io.input_dir = dir.path().to_path_buf();
        config.performance.workers = 0;
        assert!(config.validate().is_err());
    }
}
