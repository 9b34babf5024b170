//! Scheduler error types.

use thiserror::Error;

/// Errors that can occur during scheduling operations.
///
/// Allocation shortfalls and launch failures are not errors: they shrink
/// a wave and are reported through [`OptimizeReport`](hgw_core::OptimizeReport).
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("target server not found: {0}")]
    TargetNotFound(String),

    #[error("config error: {0}")]
    Config(#[from] hgw_core::CoreError),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
