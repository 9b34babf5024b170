//! Core error types.

use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown script kind: {0}")]
    UnknownScriptKind(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
