//! Configuration loading and management.
//!
//! Layered configuration using figment. Values are loaded from (in order of
//! priority):
//! 1. Default values (compiled in)
//! 2. Config file: `/var/task/test-sink.toml` (optional)
//! 3. Environment variables with `TEST_SINK_` prefix
//!
//! | Variable | Config key | Description |
//! |----------|------------|-------------|
//! | `TEST_SINK_RESULTS_TABLE` | `results_table` | Record store table name |
//! | `TEST_SINK_LAKE_BUCKET` | `lake_bucket` | Blob store bucket name |
//! | `TEST_SINK_CORS_ALLOW_ORIGIN` | `cors_allow_origin` | CORS allow-origin header value |

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "/var/task/test-sink.toml";
const ENV_PREFIX: &str = "TEST_SINK_";

/// Deployment configuration for the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Record store table holding test run records.
    pub results_table: String,
    /// Blob store bucket receiving raw result payloads.
    pub lake_bucket: String,
    /// Origin allowed by the CORS response headers.
    pub cors_allow_origin: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            results_table: "test-results".to_string(),
            lake_bucket: "test-results-lake".to_string(),
            cors_allow_origin: "https://todobackend.com".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Loads configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    #[allow(clippy::result_large_err)]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Loads configuration from a custom config file path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    #[allow(clippy::result_large_err)]
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(ServiceConfig::default()));

        if config_path.as_ref().exists() {
            figment = figment.merge(Toml::file(config_path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX)).extract()
    }
}
