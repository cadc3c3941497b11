//! Error kinds returned by the user store and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Input broke a business rule (empty field, short password, duplicate email).
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Authentication(String),

    /// Any database failure not classified above. Already logged where it was raised.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// The row passed its existence check but the write touched nothing.
    #[error("no affected lines")]
    NoRowsAffected,

    #[error("password hash error: {0}")]
    PasswordHash(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Validation(_) => "VALIDATION_ERROR",
            StoreError::NotFound(_) => "NOT_FOUND",
            StoreError::Authentication(_) => "AUTHENTICATION_ERROR",
            StoreError::Storage(_) => "STORAGE_ERROR",
            StoreError::NoRowsAffected => "NO_ROWS_AFFECTED",
            StoreError::PasswordHash(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            StoreError::Validation(_) => StatusCode::BAD_REQUEST,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Authentication(_) => StatusCode::UNAUTHORIZED,
            StoreError::NoRowsAffected => StatusCode::CONFLICT,
            StoreError::Storage(_) | StoreError::PasswordHash(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    // Internal details stay in the logs.
    fn user_message(&self) -> String {
        match self {
            StoreError::Storage(_) | StoreError::PasswordHash(_) => {
                "an internal error occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message: self.user_message(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

/// True when `err` is a Postgres unique-constraint violation (SQLSTATE 23505).
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            StoreError::Validation("name cannot be empty".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            StoreError::NotFound("not found user".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            StoreError::Authentication("password don't match".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(StoreError::NoRowsAffected.status(), StatusCode::CONFLICT);
        assert_eq!(
            StoreError::Storage(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn display_keeps_business_messages_verbatim() {
        let err = StoreError::Validation("password must be at least 6 characters".into());
        assert_eq!(err.to_string(), "password must be at least 6 characters");
    }

    #[test]
    fn internal_errors_are_hidden_from_clients() {
        let err = StoreError::Storage(sqlx::Error::PoolTimedOut);
        assert_eq!(err.user_message(), "an internal error occurred");
        assert_eq!(err.code(), "STORAGE_ERROR");
    }

    #[test]
    fn row_not_found_is_not_a_unique_violation() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn response_carries_status() {
        let res = StoreError::NotFound("not found user".into()).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
