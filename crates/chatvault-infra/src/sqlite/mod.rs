//! SQLite storage layer.
//!
//! One [`pool::DatabasePool`] per tier, with the hot store in [`hot`] and
//! the cold store in [`cold`]. Driver errors are translated into the
//! domain taxonomy here, at the store boundary.

pub mod cold;
pub mod hot;
pub mod pool;

use chatvault_types::error::StoreError;
use chrono::{DateTime, Utc};
use sqlx::error::ErrorKind;

/// Translate a driver error into the domain taxonomy.
///
/// Transport and pool failures become `Unavailable` (retryable); constraint
/// violations become `AlreadyExists`/`NotFound`; everything else is a
/// non-transient `Query` fault.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
            StoreError::Unavailable(err.to_string())
        }
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
        sqlx::Error::Database(db) => match db.kind() {
            ErrorKind::UniqueViolation => StoreError::AlreadyExists(db.to_string()),
            ErrorKind::ForeignKeyViolation => StoreError::NotFound(db.to_string()),
            // SQLITE_BUSY / SQLITE_LOCKED: the busy timeout elapsed.
            _ if matches!(db.code().as_deref(), Some("5") | Some("6")) => {
                StoreError::Unavailable(db.to_string())
            }
            _ => StoreError::Query(db.to_string()),
        },
        other => StoreError::Query(other.to_string()),
    }
}

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Query(format!("invalid datetime: {e}")))
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

pub(crate) fn parse_uuid(s: &str, column: &str) -> Result<uuid::Uuid, StoreError> {
    uuid::Uuid::parse_str(s).map_err(|e| StoreError::Query(format!("invalid {column}: {e}")))
}
