//! Error types for chorewheel.

use thiserror::Error;

use crate::model::DelegationStatus;

#[derive(Debug, Error)]
pub enum Error {
    /// Caller supplied a malformed member, task, or series.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid delegation transition: {from} -> {to}")]
    InvalidTransition {
        from: DelegationStatus,
        to: DelegationStatus,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
