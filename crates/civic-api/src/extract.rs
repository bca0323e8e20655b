//! Rejection handling for the built-in extractors.
//!
//! Handlers take `Result<Json<T>, JsonRejection>` (and the same for `Path`
//! and `Query`) and unwrap through these helpers, so malformed input comes
//! back in the regular error body instead of axum's plain-text rejection.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use uuid::Uuid;

use crate::error::ApiError;

pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    result.map(|Json(v)| v).map_err(ApiError::from)
}

pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    result.map(|Query(v)| v).map_err(ApiError::from)
}

/// An id that is not a UUID cannot name an existing proposition.
pub fn extract_id(result: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
    result
        .map(|Path(id)| id)
        .map_err(|_| ApiError::NotFound("proposition not found".into()))
}
