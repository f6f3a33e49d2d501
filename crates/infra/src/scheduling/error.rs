//! Scheduler error types

use storelink_common::CommonError;
use thiserror::Error;

/// Scheduler-specific errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// No tokio runtime is available to spawn timers on
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),

    /// The scheduler was shut down and accepts no more work
    #[error("Scheduler is shut down")]
    ShutDown,
}

impl From<SchedulerError> for CommonError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::NoRuntime(_) => CommonError::config(err.to_string()),
            SchedulerError::ShutDown => CommonError::task_cancelled("delay-scheduler"),
        }
    }
}

/// Convenience type alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
