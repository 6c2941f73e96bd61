//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use cargodesk_core::store::StoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
///
/// Store failures are logged where they happen; clients only ever see a
/// generic message.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("service unavailable")]
  Unavailable,

  #[error("internal error")]
  Internal,
}

impl ApiError {
  /// Classify a store error, logging its detail.
  pub fn store(e: impl StoreError) -> Self {
    if e.is_unavailable() {
      tracing::error!(error = %e, "store unavailable");
      ApiError::Unavailable
    } else {
      tracing::error!(error = %e, "store query failed");
      ApiError::Internal
    }
  }
}

impl From<QueryRejection> for ApiError {
  fn from(e: QueryRejection) -> Self { ApiError::BadRequest(e.body_text()) }
}

impl From<JsonRejection> for ApiError {
  fn from(e: JsonRejection) -> Self { ApiError::BadRequest(e.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match self {
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "authentication required".to_owned()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
      ApiError::Unavailable => {
        (StatusCode::SERVICE_UNAVAILABLE, "database service unavailable".to_owned())
      }
      ApiError::Internal => {
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
