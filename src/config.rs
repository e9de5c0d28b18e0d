use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::models::ScoringWeights;
use crate::services::MatchingOptions;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub directory: DirectorySettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Which contractor directory backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DirectorySettings {
    #[serde(default)]
    pub backend: DirectoryBackend,
    /// JSON seed for the in-memory backend
    pub seed_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

/// Notification service; notifications are only logged when no endpoint is set
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NotificationSettings {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MatchingSettings {
    pub default_limit: Option<u16>,
    pub max_limit: Option<u16>,
    pub directory_timeout_secs: Option<u64>,
    pub scoring_chunk_size: Option<usize>,
}

impl Settings {
    pub fn matching_options(&self) -> MatchingOptions {
        let defaults = MatchingOptions::default();

        MatchingOptions {
            default_limit: self
                .matching
                .default_limit
                .map(usize::from)
                .unwrap_or(defaults.default_limit),
            max_limit: self
                .matching
                .max_limit
                .map(usize::from)
                .unwrap_or(defaults.max_limit),
            directory_timeout: self
                .matching
                .directory_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.directory_timeout),
            notification_timeout: self
                .notifications
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.notification_timeout),
            scoring_chunk_size: self
                .matching
                .scoring_chunk_size
                .unwrap_or(defaults.scoring_chunk_size),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_expertise_weight")]
    pub expertise: f64,
    #[serde(default = "default_availability_weight")]
    pub availability: f64,
    #[serde(default = "default_rating_weight")]
    pub rating: f64,
    #[serde(default = "default_location_weight")]
    pub location: f64,
    #[serde(default = "default_budget_weight")]
    pub budget: f64,
    #[serde(default = "default_timeline_weight")]
    pub timeline: f64,
    #[serde(default = "default_urgency_weight")]
    pub urgency: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            expertise: default_expertise_weight(),
            availability: default_availability_weight(),
            rating: default_rating_weight(),
            location: default_location_weight(),
            budget: default_budget_weight(),
            timeline: default_timeline_weight(),
            urgency: default_urgency_weight(),
        }
    }
}

fn default_expertise_weight() -> f64 { 0.25 }
fn default_availability_weight() -> f64 { 0.20 }
fn default_rating_weight() -> f64 { 0.20 }
fn default_location_weight() -> f64 { 0.15 }
fn default_budget_weight() -> f64 { 0.10 }
fn default_timeline_weight() -> f64 { 0.05 }
fn default_urgency_weight() -> f64 { 0.05 }

impl From<&WeightsConfig> for ScoringWeights {
    fn from(config: &WeightsConfig) -> Self {
        ScoringWeights {
            expertise: config.expertise,
            availability: config.availability,
            rating: config.rating,
            location: config.location,
            budget: config.budget,
            timeline: config.timeline,
            urgency: config.urgency,
        }
    }
}

impl WeightsConfig {
    /// Convert to scoring weights, rejecting sets that do not sum to 1.0
    pub fn to_weights(&self) -> Result<ScoringWeights, ConfigError> {
        let weights = ScoringWeights::from(self);
        weights
            .validate()
            .map_err(|e| ConfigError::Message(format!("scoring.weights: {}", e)))?;
        Ok(weights)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "full".to_string() }

const ENV_PREFIX: &str = "CMATCH";

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with CMATCH__)
    /// 5. DATABASE_URL
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g. CMATCH__SERVER__PORT -> server.port
            .add_source(environment())
            .build()?;

        apply_database_url(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        apply_database_url(settings)?.try_deserialize()
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// DATABASE_URL wins over the file and prefixed variables when set
fn apply_database_url(settings: Config) -> Result<Config, ConfigError> {
    match std::env::var("DATABASE_URL") {
        Ok(url) if !url.is_empty() => Config::builder()
            .add_source(settings)
            .set_override("database.url", url)?
            .build(),
        _ => Ok(settings),
    }
}
