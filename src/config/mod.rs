//! Typed configuration from environment variables.
//!
//! Loads once at startup. Nothing is required; tuning overrides come from an
//! optional TOML file named by `CHOREWHEEL_TUNING`.

pub mod tuning;

use std::path::PathBuf;

use crate::error::Result;

pub use tuning::Tuning;

#[derive(Debug, Clone)]
pub struct Config {
    pub otel_endpoint: Option<String>,
    pub log_level: String,
    pub tuning_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            otel_endpoint: optional_var("OTEL_ENDPOINT"),
            log_level: optional_var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            tuning_path: optional_var("CHOREWHEEL_TUNING").map(PathBuf::from),
        })
    }

    /// Load the tuning file if one is configured, otherwise the built-in defaults.
    pub fn tuning(&self) -> Result<Tuning> {
        match &self.tuning_path {
            Some(path) => Tuning::load(path),
            None => Ok(Tuning::default()),
        }
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
