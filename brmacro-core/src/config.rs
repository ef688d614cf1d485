//! Application configuration: HTTP tunables, storage paths and the catalog.
//!
//! Loaded once at process start, either from a TOML file or from the
//! built-in defaults. Every section is optional in the file; missing
//! sections fall back to the defaults below.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::catalog::{builtin_series, Catalog, Provider, SeriesDescriptor};

pub const IBGE_BASE_URL: &str = "https://servicodados.ibge.gov.br/api/v3/agregados";
pub const BCB_BASE_URL: &str = "https://api.bcb.gov.br/dados/serie";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("duplicate series key '{0}' in catalog")]
    DuplicateKey(String),

    #[error("catalog has no series")]
    EmptyCatalog,

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub paths: PathsConfig,
    pub series: Vec<SeriesDescriptor>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            paths: PathsConfig::default(),
            series: builtin_series(),
        }
    }
}

impl AppConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Load `path` if given, otherwise the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.series.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        if let Some(desc) = self.series.iter().find(|d| d.key.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "series with code '{}' has an empty key",
                desc.code
            )));
        }
        if let Some(desc) = self.series.iter().find(|d| d.code.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "series '{}' has an empty provider code",
                desc.key
            )));
        }
        if !(1900..=2100).contains(&self.api.base_year) {
            return Err(ConfigError::Invalid(format!(
                "base_year {} out of range 1900..=2100",
                self.api.base_year
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be positive".into()));
        }
        Catalog::new(self.series.clone()).map_err(ConfigError::DuplicateKey)?;
        Ok(())
    }

    /// Validated catalog of the configured series.
    pub fn catalog(&self) -> Result<Catalog, ConfigError> {
        if self.series.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        Catalog::new(self.series.clone()).map_err(ConfigError::DuplicateKey)
    }

    pub fn count_by_provider(&self, provider: Provider) -> usize {
        self.series.iter().filter(|d| d.provider == provider).count()
    }
}

/// HTTP and collection tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Extra attempts after a connect or timeout failure.
    pub max_retries: u32,
    /// Pause after every fetch, successful or not.
    pub rate_limit_delay_secs: u64,
    /// Collection starts on January 1st of this year.
    pub base_year: i32,
    pub ibge_base_url: String,
    pub bcb_base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            rate_limit_delay_secs: 1,
            base_year: 2012,
            ibge_base_url: IBGE_BASE_URL.to_string(),
            bcb_base_url: BCB_BASE_URL.to_string(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_secs(self.rate_limit_delay_secs)
    }

    /// Earliest date requested from the providers.
    pub fn since_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.base_year, 1, 1).unwrap_or_default()
    }
}

/// Storage locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl PathsConfig {
    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.data_dir.join("processed")
    }
}
