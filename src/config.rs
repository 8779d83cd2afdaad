//! Configuration file handling

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::calculator::DEFAULT_FURTHER_INFORMATION;

/// Read from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "hvac-emissions.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the SQLite reference database
    #[serde(default = "default_database")]
    pub database: PathBuf,

    #[serde(default)]
    pub lookup: LookupConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            lookup: LookupConfig::default(),
            report: ReportConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Zip code resolution settings
#[derive(Debug, Clone, Deserialize)]
pub struct LookupConfig {
    /// Use the national average grid factor for unmapped zip codes
    #[serde(default)]
    pub fallback_to_national_average: bool,

    #[serde(default = "default_national_average")]
    pub national_average_kg_co2e_per_mwh: f64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            fallback_to_national_average: false,
            national_average_kg_co2e_per_mwh: default_national_average(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_further_information")]
    pub further_information: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            further_information: default_further_information(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Filter directive used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_database() -> PathBuf {
    PathBuf::from("hvac_emissions.db")
}

fn default_national_average() -> f64 {
    371.4
}

fn default_further_information() -> String {
    DEFAULT_FURTHER_INFORMATION.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Load an explicit config file, else the default file if present, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Config::default());
                }
                default
            }
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let average = self.lookup.national_average_kg_co2e_per_mwh;
        if !(average.is_finite() && average > 0.0) {
            bail!("lookup.national_average_kg_co2e_per_mwh must be positive, got {average}");
        }
        Ok(())
    }
}
