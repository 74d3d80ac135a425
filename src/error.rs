// Error kinds surfaced by the interval parser, the metrics store and the HTTP layer.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Why a shorthand duration token was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntervalError {
    /// Too short, or the magnitude part is not a positive integer.
    #[error("Invalid time format: {0:?}")]
    Malformed(String),

    /// Structurally valid, but the unit letter is not one of s, m, h, d, w.
    #[error("Unsupported time unit: {0}")]
    UnsupportedUnit(char),
}

/// Failure while reading from or writing to the metrics store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No usable connection: pool closed or timed out, I/O failure, or the database
    /// stayed busy or locked past the busy timeout.
    #[error("database connection not available: {0}")]
    Unavailable(#[source] sqlx::Error),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(e)
            }
            e if is_busy_or_locked(&e) => StoreError::Unavailable(e),
            other => StoreError::Database(other),
        }
    }
}

const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// SQLite reports extended result codes; the primary code is the low byte.
fn is_busy_or_locked(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|d| d.code())
        .and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Error returned by HTTP handlers. Internal detail is logged, never sent to the caller.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(#[from] IntervalError),

    #[error("Database connection not available")]
    Unavailable,

    #[error("Database error occurred")]
    Database,
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(inner) => {
                tracing::warn!(error = %inner, "metrics store unavailable");
                ApiError::Unavailable
            }
            StoreError::Database(inner) => {
                tracing::error!(error = %inner, "metrics store query failed");
                ApiError::Database
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    detail: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Database => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_failures_classify_as_unavailable() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Database(_)
        ));
    }

    #[test]
    fn api_error_status_codes() {
        let bad = ApiError::from(IntervalError::UnsupportedUnit('x'));
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
        assert_eq!(bad.to_string(), "Unsupported time unit: x");
        assert_eq!(ApiError::Unavailable.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ApiError::Database.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
