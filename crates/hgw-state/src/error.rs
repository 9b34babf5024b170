//! Error types for the HGW settings store.

use thiserror::Error;

/// Result type alias for settings store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during settings store operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("schema mismatch for {key}: found v{found}, expected v{expected}")]
    SchemaMismatch { key: String, found: u32, expected: u32 },

    #[error("type mismatch for {key}: stored {found}, requested {expected}")]
    TypeMismatch {
        key: String,
        found: &'static str,
        expected: &'static str,
    },
}
