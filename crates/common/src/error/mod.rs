//! Error types shared by the Storelink crates.
//!
//! `CommonError` covers the failures that show up on more than one layer:
//! bad configuration, ledger persistence, sqlite lock contention, config
//! file parsing. Crate-specific errors convert into it at their boundary
//! (see `storelink-infra`'s `InfraError`).
//!
//! `ErrorClassification` is the shared vocabulary for deciding whether an
//! error is worth retrying and at which level it gets logged.
//!
//! | Severity | Typical source |
//! |----------|----------------|
//! | `Info` | scheduler shut down while a reconnect was pending |
//! | `Warning` | sqlite busy or locked |
//! | `Error` | invalid config, ledger write failure |
//! | `Critical` | subscriber or executor invariants broken |

use std::fmt;
use std::time::Duration;

use thiserror::Error;

pub type CommonResult<T> = Result<T, CommonError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommonError {
    #[error("Configuration error{}: {message}", scoped(" in field", .field))]
    Config { message: String, field: Option<String> },

    /// Contention on a shared resource (sqlite busy/locked)
    #[error("Lock error{}: {message}", scoped(" for", .resource))]
    Lock { message: String, resource: Option<String> },

    #[error("Serialization error{}: {message}", tagged(.format))]
    Serialization { message: String, format: Option<String> },

    /// Posted-token ledger and file system failures
    #[error("Persistence error{}: {message}", scoped(" during", .operation))]
    Persistence { message: String, operation: Option<String> },

    #[error("Internal error{}: {message}", tagged(.context))]
    Internal { message: String, context: Option<String> },

    #[error("Task '{task}' cancelled")]
    TaskCancelled { task: String },
}

fn scoped(label: &str, value: &Option<String>) -> String {
    value.as_ref().map(|v| format!("{label} '{v}'")).unwrap_or_default()
}

fn tagged(value: &Option<String>) -> String {
    value.as_ref().map(|v| format!(" ({v})")).unwrap_or_default()
}

impl CommonError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into(), field: None }
    }

    /// Configuration error pinned to a dotted field path or env var name
    pub fn config_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config { message: message.into(), field: Some(field.into()) }
    }

    pub fn lock_resource(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Lock { message: message.into(), resource: Some(resource.into()) }
    }

    pub fn serialization_format(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into(), format: Some(format.into()) }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence { message: message.into(), operation: None }
    }

    pub fn persistence_op(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Persistence { message: message.into(), operation: Some(operation.into()) }
    }

    pub fn internal_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), context: Some(context.into()) }
    }

    pub fn task_cancelled(task: impl Into<String>) -> Self {
        Self::TaskCancelled { task: task.into() }
    }
}

impl From<std::io::Error> for CommonError {
    fn from(err: std::io::Error) -> Self {
        Self::persistence_op("io", err.to_string())
    }
}

/// Classifies an error for retry and logging decisions.
///
/// Implemented by `CommonError` here and by the billing error type in
/// `storelink-domain`, where retryability follows the store response code.
pub trait ErrorClassification {
    /// Whether the same operation may succeed if attempted again
    fn is_retryable(&self) -> bool;

    fn severity(&self) -> ErrorSeverity;

    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    /// Suggested delay before retrying, when the error carries one
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        })
    }
}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Lock { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::TaskCancelled { .. } => ErrorSeverity::Info,
            Self::Lock { .. } => ErrorSeverity::Warning,
            Self::Config { .. } | Self::Serialization { .. } | Self::Persistence { .. } => {
                ErrorSeverity::Error
            }
            Self::Internal { .. } => ErrorSeverity::Critical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_optional_context() {
        assert_eq!(
            CommonError::config_field("reconnect.base_delay_ms", "must be positive").to_string(),
            "Configuration error in field 'reconnect.base_delay_ms': must be positive"
        );
        assert_eq!(
            CommonError::config("no ledger path").to_string(),
            "Configuration error: no ledger path"
        );
        assert_eq!(
            CommonError::lock_resource("sqlite", "database is busy").to_string(),
            "Lock error for 'sqlite': database is busy"
        );
        assert_eq!(
            CommonError::serialization_format("toml", "expected table").to_string(),
            "Serialization error (toml): expected table"
        );
        assert_eq!(
            CommonError::persistence_op("insert posted token", "disk full").to_string(),
            "Persistence error during 'insert posted token': disk full"
        );
        assert_eq!(
            CommonError::task_cancelled("delay-scheduler").to_string(),
            "Task 'delay-scheduler' cancelled"
        );
    }

    #[test]
    fn only_lock_contention_is_retryable() {
        let busy = CommonError::lock_resource("sqlite", "database is busy");
        assert!(busy.is_retryable());
        assert_eq!(busy.severity(), ErrorSeverity::Warning);

        let write = CommonError::persistence("database is read-only");
        assert!(!write.is_retryable());
        assert_eq!(write.severity(), ErrorSeverity::Error);
        assert_eq!(write.retry_after(), None);
    }

    #[test]
    fn internal_errors_are_critical() {
        let err = CommonError::internal_with_context("subscriber already set", "init_tracing");
        assert!(err.is_critical());
        assert!(!CommonError::task_cancelled("delay-scheduler").is_critical());
    }

    #[test]
    fn severity_orders_by_urgency() {
        assert!(ErrorSeverity::Info < ErrorSeverity::Warning);
        assert!(ErrorSeverity::Error < ErrorSeverity::Critical);
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARNING");
    }

    #[test]
    fn io_errors_become_persistence_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = CommonError::from(io);
        assert!(matches!(
            err,
            CommonError::Persistence { operation: Some(ref op), .. } if op == "io"
        ));
    }
}
