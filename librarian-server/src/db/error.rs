//! Database error types

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("database configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to connect to database at {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("database at {url} is unreachable: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("database at {url} did not answer the liveness probe within {timeout:?}")]
    ProbeTimeout { url: String, timeout: Duration },

    #[error("failed to disconnect from database: {0}")]
    Disconnect(String),

    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

impl DbError {
    /// Errors raised while establishing the connection at startup.
    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Connect { .. } | Self::Unreachable { .. } | Self::ProbeTimeout { .. }
        )
    }
}
