use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::model::BoosterParams;
use crate::signals::DEFAULT_MIN_PROBABILITY;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub scoring: ScoringConfig,
    pub training: TrainingConfig,
    pub influxdb: InfluxConfig,
    pub validator: ValidatorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub model_path: String,
    pub min_probability: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            model_path: "signal_model.json".to_string(),
            min_probability: DEFAULT_MIN_PROBABILITY,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Synthetic rows generated when history is missing or thin.
    pub synthetic_samples: usize,
    pub synthetic_seed: u64,
    /// Below this many historical records, synthetic data is appended.
    pub min_records: usize,
    pub test_fraction: f64,
    pub split_seed: u64,
    pub booster: BoosterParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            synthetic_samples: 500,
            synthetic_seed: 42,
            min_records: 50,
            test_fraction: 0.2,
            split_seed: 42,
            booster: BoosterParams::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InfluxConfig {
    pub url: String,
    pub org: String,
    pub bucket: String,
    pub measurement: String,
    pub lookback_days: u32,
    pub timeout_secs: u64,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".to_string(),
            org: "turkninja".to_string(),
            bucket: "trading_data".to_string(),
            measurement: "position_closes".to_string(),
            lookback_days: 365,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub enabled: bool,
    pub url: String,
    pub timeout_ms: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "http://localhost:8000/predict".to_string(),
            timeout_ms: 100,
        }
    }
}

/// Values that come from the process environment (and `.env`).
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub config_path: Option<String>,
    pub model_path: Option<String>,
    pub min_probability: Option<f64>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub influxdb_url: Option<String>,
    /// Absent or empty means synthetic-data mode.
    pub influxdb_token: Option<String>,
    pub influxdb_org: Option<String>,
    pub influxdb_bucket: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// File config (if the file exists) with environment overrides applied.
    pub fn resolve(env: &EnvConfig) -> Result<Self> {
        let path = env.config_path.as_deref().unwrap_or("config.toml");
        let mut config = if Path::new(path).exists() {
            Self::load(path)?
        } else {
            tracing::info!("No config file at {}, using defaults", path);
            Self::default()
        };
        config.apply_env(env);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(path) = &env.model_path {
            self.scoring.model_path = path.clone();
        }
        if let Some(p) = env.min_probability {
            self.scoring.min_probability = p;
        }
        if let Some(host) = &env.host {
            self.server.host = host.clone();
        }
        if let Some(port) = env.port {
            self.server.port = port;
        }
        if let Some(url) = &env.influxdb_url {
            self.influxdb.url = url.clone();
        }
        if let Some(org) = &env.influxdb_org {
            self.influxdb.org = org.clone();
        }
        if let Some(bucket) = &env.influxdb_bucket {
            self.influxdb.bucket = bucket.clone();
        }
    }

    pub fn validate(&self) -> Result<()> {
        let p = self.scoring.min_probability;
        if !(0.0..=1.0).contains(&p) {
            bail!("min_probability must be within [0, 1], got {}", p);
        }
        let f = self.training.test_fraction;
        if !(f > 0.0 && f < 1.0) {
            bail!("test_fraction must be within (0, 1), got {}", f);
        }
        Ok(())
    }
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            config_path: std::env::var("CONFIG_PATH").ok(),
            model_path: std::env::var("MODEL_PATH").ok(),
            min_probability: parse_var("MIN_PROBABILITY")?,
            host: std::env::var("HOST").ok(),
            port: parse_var("PORT")?,
            influxdb_url: std::env::var("INFLUXDB_URL").ok(),
            influxdb_token: std::env::var("INFLUXDB_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
            influxdb_org: std::env::var("INFLUXDB_ORG").ok(),
            influxdb_bucket: std::env::var("INFLUXDB_BUCKET").ok(),
        })
    }
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} is invalid ({}): {}", name, raw, e)),
        Err(_) => Ok(None),
    }
}
