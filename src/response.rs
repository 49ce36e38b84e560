//! Response helpers. Bodies are the bare resource (or array of resources).

use crate::error::{AccessError, AppError};
use crate::record::Record;
use axum::{http::StatusCode, Json};
use serde::{de::DeserializeOwned, Serialize};

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(data))
}

pub fn ok<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::OK, Json(data))
}

/// Convert a stored row into its typed model. A row that does not fit is a server fault.
pub fn typed<T: DeserializeOwned>(row: Record) -> Result<T, AppError> {
    row.into_typed()
        .map_err(|e| AccessError::Internal(format!("stored row does not match model: {}", e)).into())
}

pub fn typed_all<T: DeserializeOwned>(rows: Vec<Record>) -> Result<Vec<T>, AppError> {
    rows.into_iter().map(typed).collect()
}
