//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid blob type: {0}")]
    InvalidType(String),

    #[error("blob name is too short for sharded type {blob_type}: {name:?}")]
    NameTooShort { blob_type: String, name: String },

    #[error("Range: header invalid: {0}")]
    InvalidRange(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
