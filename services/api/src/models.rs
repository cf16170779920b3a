//! API Models
//!
//! This module defines the JSON bodies of the HTTP endpoints, annotated for
//! OpenAPI documentation with `utoipa`.

use crate::config::Config;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// The number of leading key characters `/debug` may reveal.
pub const DEBUG_KEY_PREFIX_LEN: usize = 5;

pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct HealthResponse {
    #[schema(example = "OK")]
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub api_key_configured: bool,
    #[schema(example = "gemini-2.0-flash-live-001")]
    pub model: String,
    pub version: String,
}

impl HealthResponse {
    pub fn new(config: &Config, timestamp: DateTime<Utc>) -> Self {
        Self {
            status: "OK".to_string(),
            timestamp,
            api_key_configured: !config.gemini_api_key.is_empty(),
            model: config.gemini_model.clone(),
            version: SERVICE_VERSION.to_string(),
        }
    }
}

/// Runtime diagnostics. Never carries more than a short prefix of the key.
#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct DebugResponse {
    pub api_key_configured: bool,
    pub api_key_length: usize,
    #[schema(example = "AIzaS")]
    pub api_key_prefix: String,
    pub model: String,
    pub version: String,
    #[schema(example = "development")]
    pub environment: String,
    #[schema(example = "0.0.0.0:3000")]
    pub bind_address: String,
}

impl From<&Config> for DebugResponse {
    fn from(config: &Config) -> Self {
        Self {
            api_key_configured: !config.gemini_api_key.is_empty(),
            api_key_length: config.gemini_api_key.len(),
            api_key_prefix: config.gemini_api_key.prefix(DEBUG_KEY_PREFIX_LEN).to_string(),
            model: config.gemini_model.clone(),
            version: SERVICE_VERSION.to_string(),
            environment: config.environment.clone(),
            bind_address: config.bind_address.to_string(),
        }
    }
}
