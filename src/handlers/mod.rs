//! HTTP handlers for auth, candidate and application routes.

pub mod application;
pub mod auth;
pub mod candidate;

use crate::error::{AccessError, AppError};
use crate::record::Record;
use serde_json::Value;

fn parse_id(id_str: &str) -> Result<String, AppError> {
    uuid::Uuid::parse_str(id_str)
        .map(|u| u.to_string())
        .map_err(|_| AppError::BadRequest("invalid uuid".into()))
}

fn body_to_record(value: Value) -> Result<Record, AppError> {
    Record::from_value(value).ok_or_else(|| AppError::BadRequest("body must be a JSON object".into()))
}

/// Collapse every client-caused create failure into one 400 message.
fn create_failed(message: &str, e: AccessError) -> AppError {
    match e {
        AccessError::Internal(m) => AppError::Internal(m),
        other => {
            tracing::warn!(error = %other, "{}", message);
            AppError::BadRequest(message.to_string())
        }
    }
}

fn not_found_as(message: &str, e: AccessError) -> AppError {
    match e {
        AccessError::NotFound(_) => AppError::NotFound(message.to_string()),
        other => other.into(),
    }
}
