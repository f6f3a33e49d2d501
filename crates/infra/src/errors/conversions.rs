//! Conversions from external infrastructure errors into common errors.

use rusqlite::Error as SqlError;
use storelink_common::CommonError;
use thiserror::Error;

/// Failures raised by the infrastructure adapters.
///
/// Every variant converts into [`CommonError`], which is what the core ports
/// return.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] SqlError),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error ({format}): {message}")]
    Serialization { format: &'static str, message: String },
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        Self::Serialization { format: "toml", message: value.to_string() }
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization { format: "json", message: value.to_string() }
    }
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → CommonError */
/* -------------------------------------------------------------------------- */

fn sqlite_to_common(err: SqlError) -> CommonError {
    use rusqlite::ffi::ErrorCode;
    use rusqlite::Error as RE;

    match err {
        RE::SqliteFailure(err, maybe_message) => {
            let message = maybe_message.unwrap_or_default();
            match err.code {
                ErrorCode::DatabaseBusy => CommonError::lock_resource("sqlite", "database is busy"),
                ErrorCode::DatabaseLocked => {
                    CommonError::lock_resource("sqlite", "database is locked")
                }
                ErrorCode::ReadOnly => CommonError::persistence("database is read-only"),
                ErrorCode::DiskFull => CommonError::persistence("database or disk is full"),
                _ => CommonError::persistence(format!(
                    "sqlite failure {:?} (code {}): {}",
                    err.code, err.extended_code, message
                )),
            }
        }
        RE::QueryReturnedNoRows => CommonError::persistence("no rows returned by query"),
        RE::FromSqlConversionFailure(_, _, cause) => {
            CommonError::persistence(format!("failed to convert sqlite value: {cause}"))
        }
        RE::InvalidColumnType(_, _, ty) => {
            CommonError::persistence(format!("invalid column type: {ty}"))
        }
        RE::InvalidPath(path) => CommonError::persistence(format!(
            "invalid database path: {}",
            path.to_string_lossy()
        )),
        other => CommonError::persistence(other.to_string()),
    }
}

impl From<InfraError> for CommonError {
    fn from(value: InfraError) -> Self {
        match value {
            InfraError::Sqlite(err) => sqlite_to_common(err),
            InfraError::Pool(err) => {
                CommonError::persistence_op("acquire connection", err.to_string())
            }
            InfraError::Config(message) => CommonError::config(message),
            InfraError::Io(err) => CommonError::persistence(err.to_string()),
            InfraError::Serialization { format, message } => {
                CommonError::serialization_format(format, message)
            }
        }
    }
}
