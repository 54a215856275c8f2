//! Error types for the store and import layers.
//!
//! The linking services never surface these to callers: a failed read is
//! logged and treated as "no data". They matter to direct store users and to
//! the repair binary.

use thiserror::Error;

use crate::db::DbError;

/// Errors raised by a `RecordStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("{entity_type} {id} not found")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    #[error("{entity_type} {id} already exists")]
    Duplicate {
        entity_type: &'static str,
        id: String,
    },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Db(DbError::Sqlite(err))
    }
}

/// Errors raised while importing a legacy workspace export.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to read export: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse export: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected export shape: {0}")]
    Shape(String),

    #[error("Failed to store imported record: {0}")]
    Store(#[from] StoreError),
}
