//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Every failure that can reach a client is one of its variants, so handlers never let an
//! internal error cross the HTTP boundary unmapped.
//!
//! `AppError` implements `actix_web::error::ResponseError`, producing a JSON body of the
//! form `{"error": "...", "kind": "..."}` where `kind` names the failure category.
//! `From` implementations for `sqlx::Error`, `validator::ValidationErrors` and
//! [`TokenError`](crate::auth::token::TokenError) allow conversion with the `?` operator.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

use crate::auth::token::TokenError;

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Missing, invalid or expired credentials (HTTP 401).
    Unauthenticated(String),
    /// Authenticated, but lacking the relation the operation requires (HTTP 403).
    Forbidden(String),
    /// A referenced entity does not exist (HTTP 404).
    NotFound(String),
    /// A uniqueness constraint would be violated, e.g. a duplicate email (HTTP 409).
    Conflict(String),
    /// Input passed deserialization but failed validation rules (HTTP 422).
    ValidationFailed(String),
    /// The request could not be parsed or carries nothing to do (HTTP 400).
    BadRequest(String),
    /// The data store could not be reached or the transaction failed (HTTP 503).
    StoreUnavailable(String),
    /// An unexpected server-side failure (HTTP 500).
    Internal(String),
}

impl AppError {
    /// Stable, machine-readable name of the failure category.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::ValidationFailed(_) => "validation_failed",
            AppError::BadRequest(_) => "bad_request",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::Internal(_) => "internal",
        }
    }

    fn message(&self) -> &str {
        match self {
            AppError::Unauthenticated(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::ValidationFailed(msg)
            | AppError::BadRequest(msg)
            | AppError::StoreUnavailable(msg)
            | AppError::Internal(msg) => msg,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthenticated(msg) => write!(f, "Unauthenticated: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::ValidationFailed(msg) => write!(f, "Validation Failed: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::StoreUnavailable(msg) => write!(f, "Store Unavailable: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

/// Converts `AppError` variants into `HttpResponse` objects.
///
/// Server-side failures are logged in full and answered with a generic message so that
/// driver or library details never leak to clients.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::StoreUnavailable(_) => {
                log::error!("{}", self);
                "Data store unavailable"
            }
            AppError::Internal(_) => {
                log::error!("{}", self);
                "Internal server error"
            }
            other => other.message(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "error": message,
            "kind": self.kind()
        }))
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// Constraint violations are the data layer's way of reporting invariant breaches:
/// a unique violation is a `Conflict`, a foreign-key violation means the referenced
/// row is absent, a failed check is a validation error. Connectivity failures become
/// `StoreUnavailable`.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(match db_err.constraint() {
                    Some("users_email_key") => "Email already registered".to_string(),
                    Some(constraint) => format!("Duplicate value violates {}", constraint),
                    None => "Duplicate value".to_string(),
                })
            }
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound("Referenced record not found".into())
            }
            sqlx::Error::Database(ref db_err) if db_err.is_check_violation() => {
                AppError::ValidationFailed("Value violates a data constraint".into())
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => AppError::StoreUnavailable(error.to_string()),
            _ => AppError::Internal(error.to_string()),
        }
    }
}

/// Converts `validator::ValidationErrors` into `AppError::ValidationFailed`.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationFailed(error.to_string())
    }
}

/// Every token failure is reported the same way to the client.
impl From<TokenError> for AppError {
    fn from(error: TokenError) -> AppError {
        log::debug!("Rejected bearer token: {}", error);
        AppError::Unauthenticated("Invalid or expired token".into())
    }
}
