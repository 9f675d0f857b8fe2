use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    aggregate::AggregatorOptions,
    city::{City, CityTable},
    predict::DEFAULT_PRECISION,
    provider::Endpoints,
    retry::{RetryConfig, RetryPolicy},
};

pub const DEFAULT_MODEL_PATH: &str = "models/next_hour_temperature.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// model_path = "models/next_hour_temperature.json"
/// timeout_secs = 10
///
/// [cities.oslo]
/// name = "Oslo"
/// latitude = 59.9139
/// longitude = 10.7522
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Regression model artifact.
    pub model_path: PathBuf,

    /// Per-request HTTP timeout.
    pub timeout_secs: u64,

    /// Decimals kept on the prediction (1 or 2).
    pub precision: u32,

    /// Fail the whole request on a feature contract mismatch instead of
    /// serving the record with an "N/A" prediction.
    pub strict_prediction: bool,

    pub retry: RetryConfig,
    pub endpoints: Endpoints,

    /// Added to, or replacing, the built-in cities.
    pub cities: BTreeMap<String, City>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            precision: DEFAULT_PRECISION,
            strict_prediction: false,
            retry: RetryConfig::default(),
            endpoints: Endpoints::default(),
            cities: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load config from `path`, or return defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "nowcast", "nowcast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.into()
    }

    pub fn city_table(&self) -> CityTable {
        CityTable::with_overrides(self.cities.clone())
    }

    /// The per-provider deadline covers every attempt plus the backoff between them.
    pub fn aggregator_options(&self) -> AggregatorOptions {
        let policy = self.retry_policy();
        let attempts = policy.max_retries.saturating_add(1);

        AggregatorOptions {
            provider_timeout: self.request_timeout().saturating_mul(attempts) + policy.total_backoff(),
            strict_prediction: self.strict_prediction,
        }
    }
}
