//! Configuration management for the fraud scoring service

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Field policy for the scoring flow.
///
/// Lenient scoring encodes whatever transaction object arrives, defaulting
/// missing or malformed fields to zero contributions; strict scoring runs
/// full validation first and refuses invalid transactions. Lenient matches
/// the historical behavior and is the default.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScoringPolicy {
    #[default]
    Lenient,
    Strict,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub artifact: ArtifactConfig,
    pub scoring: ScoringConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject carrying validation request envelopes
    pub validation_subject: String,
    /// Subject carrying scoring request envelopes
    pub scoring_subject: String,
    /// Subject results are published to when a request has no reply subject
    pub result_subject: String,
}

/// Scoring-parameter artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactConfig {
    /// Filesystem path of the exported scoring-parameters JSON
    pub path: String,
}

/// Scoring flow configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    /// Field policy: "lenient" (default) or "strict"
    #[serde(default)]
    pub policy: ScoringPolicy,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Number of concurrently processed requests
    pub workers: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                validation_subject: "transactions.validate".to_string(),
                scoring_subject: "transactions.score".to_string(),
                result_subject: "transactions.results".to_string(),
            },
            artifact: ArtifactConfig {
                path: "reports/fraud_scoring_parameters_latest.json".to_string(),
            },
            scoring: ScoringConfig {
                policy: ScoringPolicy::Lenient,
            },
            pipeline: PipelineConfig { workers: 4 },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}
