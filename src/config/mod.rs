//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing or
//! malformed. Account tokens are read from the accounts file and held as
//! `secrecy::SecretString`.

pub mod secrets;

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::event::DEFAULT_CAPACITY;

#[derive(Debug, Clone)]
pub struct Config {
    /// TOML file of `[[account]]` tables.
    pub accounts_file: PathBuf,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
    /// Events buffered per event bus subscriber.
    pub event_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            accounts_file: PathBuf::from(required_var("FOLDERSYNC_ACCOUNTS")?),
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_capacity: parsed_var("FOLDERSYNC_EVENT_CAPACITY", DEFAULT_CAPACITY)?,
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

fn parsed_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("invalid {name}={raw:?}: {e}"))),
        Err(_) => Ok(default),
    }
}
