//! Application configuration loaded from environment variables.
//!
//! Cloud Run injects secrets as environment variables via secret bindings,
//! so everything is read once at startup.

use crate::fit::{DecodeMode, DecoderConfig};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Bucket holding uploads and artifacts (read by the query function)
    pub storage_bucket: String,
    /// Root for per-invocation scratch directories
    pub scratch_dir: PathBuf,
    /// Age after which an `Uploaded` record is considered stuck
    pub stuck_after_minutes: i64,
    /// FIT decoding settings
    pub decoder: DecoderConfig,

    // --- Secrets ---
    /// JWT signing key for caller identity tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Bearer token expected on `/tasks/*` maintenance routes
    pub tasks_token: String,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            storage_bucket: "test-bucket".to_string(),
            scratch_dir: env::temp_dir().join("fit-pipeline-test"),
            stuck_after_minutes: 30,
            decoder: DecoderConfig::default(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            tasks_token: "test_tasks_token".to_string(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let decoder = DecoderConfig {
            speed_unit: parse_or_default("FIT_SPEED_UNIT")?,
            length_unit: parse_or_default("FIT_LENGTH_UNIT")?,
            temperature_unit: parse_or_default("FIT_TEMPERATURE_UNIT")?,
            mode: parse_or_default::<DecodeMode>("FIT_MODE")?,
            elapsed_record_field: match env::var("FIT_ELAPSED_RECORD_FIELD") {
                Ok(v) => parse_bool(&v).ok_or(ConfigError::Invalid("FIT_ELAPSED_RECORD_FIELD"))?,
                Err(_) => true,
            },
        };

        let gcp_project_id =
            env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string());

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            storage_bucket: env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| format!("{}.appspot.com", gcp_project_id)),
            gcp_project_id,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            scratch_dir: env::var("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir().join("fit-pipeline")),
            stuck_after_minutes: match env::var("STUCK_AFTER_MINUTES") {
                Ok(v) => v
                    .parse()
                    .map_err(|_| ConfigError::Invalid("STUCK_AFTER_MINUTES"))?,
                Err(_) => 30,
            },
            decoder,

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            tasks_token: env::var("TASKS_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("TASKS_TOKEN"))?,
        })
    }
}

/// Parse an optional variable, falling back to the type's default.
fn parse_or_default<T>(name: &'static str) -> Result<T, ConfigError>
where
    T: FromStr + Default,
{
    match env::var(name) {
        Ok(v) => v.parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(T::default()),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
