//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing.
//! The database URL is wrapped in secrecy::SecretString since it may carry credentials.

pub mod secrets;

use crate::error::{Error, Result};
use crate::locator::DEFAULT_BASE_URL;
use secrecy::SecretString;
use std::path::PathBuf;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug)]
pub struct Config {
    pub database_url: SecretString,
    pub data_dir: PathBuf,
    pub corpus_base_url: String,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database_url: SecretString::from(required_var("DATABASE_URL")?),
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            corpus_base_url: std::env::var("CORPUS_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: validate_log_level(&log_level)?,
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

fn validate_log_level(raw: &str) -> Result<String> {
    let lower = raw.trim().to_ascii_lowercase();
    if LOG_LEVELS.contains(&lower.as_str()) {
        Ok(lower)
    } else {
        Err(Error::Config(format!(
            "LOG_LEVEL must be one of {LOG_LEVELS:?}; got {raw:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_is_case_insensitive() {
        assert_eq!(validate_log_level("WARN").unwrap(), "warn");
        assert_eq!(validate_log_level(" Debug ").unwrap(), "debug");
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        assert!(matches!(
            validate_log_level("verbose"),
            Err(Error::Config(_))
        ));
    }
}
