/// Configuration management for Relationship Service
///
/// Loads configuration from environment variables.
use anyhow::{anyhow, Context, Result};
use db_pool::DbConfig;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const SERVICE_NAME: &str = "relationship-service";

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Pool configuration, present only for the postgres store
    pub database: Option<DbConfig>,
    /// Relationship graph behaviour
    pub graph: GraphConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// HTTP port for health checks and metrics
    pub http_port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow!("unknown GRAPH_STORE: {}", other)),
        }
    }
}

/// What `update_comment` does with the text when the caller supplies none
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextUpdatePolicy {
    /// Leave the stored text as is
    #[default]
    Keep,
    /// Reset the stored text to the empty string
    Clear,
}

impl FromStr for TextUpdatePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(TextUpdatePolicy::Keep),
            "clear" => Ok(TextUpdatePolicy::Clear),
            other => Err(anyhow!("unknown COMMENT_TEXT_UPDATE_POLICY: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    pub store: StoreBackend,
    pub text_update_policy: TextUpdatePolicy,
    /// zlib level, 0-9
    pub compression_level: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            store: StoreBackend::Postgres,
            text_update_policy: TextUpdatePolicy::Keep,
            compression_level: 6,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8010),
        };

        let defaults = GraphConfig::default();
        let store = match std::env::var("GRAPH_STORE") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.store,
        };
        let text_update_policy = match std::env::var("COMMENT_TEXT_UPDATE_POLICY") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.text_update_policy,
        };
        let compression_level = match std::env::var("MEDIA_COMPRESSION_LEVEL") {
            Ok(raw) => {
                let level: u32 = raw
                    .parse()
                    .with_context(|| format!("invalid MEDIA_COMPRESSION_LEVEL: {}", raw))?;
                if level > 9 {
                    return Err(anyhow!("MEDIA_COMPRESSION_LEVEL must be 0-9, got {}", level));
                }
                level
            }
            Err(_) => defaults.compression_level,
        };

        let database = match store {
            StoreBackend::Postgres => Some(
                DbConfig::from_env(SERVICE_NAME)
                    .map_err(|e| anyhow!(e))
                    .context("Failed to load database configuration")?,
            ),
            StoreBackend::Memory => None,
        };

        Ok(Config {
            app,
            database,
            graph: GraphConfig {
                store,
                text_update_policy,
                compression_level,
            },
        })
    }
}
