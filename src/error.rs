//! Typed errors per layer and their HTTP mapping.

use axum::{
    extract::rejection::QueryRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Error, Debug, PartialEq)]
pub enum RegistryError {
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("duplicate table: {0}")]
    DuplicateTable(String),
    #[error("invalid primary key: table {table} column {column}")]
    InvalidPrimaryKey { table: String, column: String },
}

/// Failures raised by a store backend while executing inside a unit of work.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error("constraint violated: {0}")]
    Constraint(String),
    #[error("store: {0}")]
    Backend(String),
}

/// Outcomes of the generic record accessor other than a successful read or write.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccessError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("constraint: {0}")]
    Constraint(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl From<StoreError> for AccessError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(m) => AccessError::Conflict(m),
            StoreError::Constraint(m) => AccessError::Constraint(m),
            StoreError::Backend(m) => AccessError::Internal(m),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("token signing: {0}")]
    Signing(String),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("incorrect email or password")]
    InvalidCredentials,
    #[error("invalid email address")]
    InvalidEmail,
    #[error("could not create user")]
    CouldNotCreate,
    #[error("could not validate credentials")]
    Unauthenticated,
    #[error("token carries no expiration")]
    MissingExpiry,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("password hashing: {0}")]
    Hashing(String),
    #[error(transparent)]
    Access(#[from] AccessError),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl From<AccessError> for AppError {
    fn from(e: AccessError) -> Self {
        match e {
            AccessError::NotFound(m) => AppError::NotFound(m),
            AccessError::Validation(m) => AppError::Validation(m),
            AccessError::Conflict(m) => AppError::Conflict(m),
            AccessError::Constraint(m) => AppError::BadRequest(m),
            AccessError::Internal(m) => AppError::Internal(m),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AccessError::from(e).into()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => AppError::Unauthorized("Incorrect email or password".into()),
            AuthError::InvalidEmail => AppError::Validation("Invalid email address".into()),
            AuthError::CouldNotCreate => {
                AppError::BadRequest("Could not create user (email may already be registered)".into())
            }
            AuthError::Unauthenticated => AppError::Unauthorized("Could not validate credentials".into()),
            AuthError::MissingExpiry => AppError::BadRequest("No expiration in token".into()),
            AuthError::Token(TokenError::Expired) => AppError::Unauthorized("Token has expired".into()),
            AuthError::Token(TokenError::Invalid(_)) => AppError::Unauthorized("Invalid token".into()),
            AuthError::Token(e @ TokenError::Signing(_)) => AppError::Internal(e.to_string()),
            AuthError::Hashing(m) => AppError::Internal(m),
            AuthError::Access(e) => e.into(),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        let message = match &self {
            AppError::Config(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
