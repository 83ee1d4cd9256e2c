//! Error types for casework.

use thiserror::Error;

use crate::model::unit::UnitState;

#[derive(Debug, Error)]
pub enum Error {
    /// No eligible unit right now. Recoverable: callers poll or back off.
    #[error("no available units: {0}")]
    NotAvailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state transition for unit {unit_id}: {from} -> {to}")]
    InvalidState {
        unit_id: String,
        from: UnitState,
        to: UnitState,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Malformed identifier, URL or citation. Never stored.
    #[error("invalid format: {0}")]
    FormatInvalid(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
