//! API error type and [`axum::response::IntoResponse`] implementation.

use aftertrials_core::error::ALREADY_ON_WAITLIST;
use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Core(#[from] aftertrials_core::Error),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    use aftertrials_core::Error as Core;
    match self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Core(Core::DuplicateEntry) => StatusCode::CONFLICT,
      ApiError::Core(Core::Backend { .. }) => StatusCode::BAD_GATEWAY,
      ApiError::Core(Core::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
      ApiError::Core(Core::Xml(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      ApiError::NotFound(m) | ApiError::BadRequest(m) => m.clone(),
      ApiError::Core(aftertrials_core::Error::DuplicateEntry) => ALREADY_ON_WAITLIST.to_owned(),
      ApiError::Core(e) => {
        tracing::error!(error = %e, "request failed");
        e.to_string()
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use std::io;

  use aftertrials_core::Error;

  use super::*;

  #[test]
  fn core_errors_map_to_gateway_statuses() {
    let backend = Error::backend("find_blog", io::Error::other("connection reset"));
    assert_eq!(ApiError::from(backend).status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
      ApiError::from(Error::Timeout("find_blog")).status(),
      StatusCode::GATEWAY_TIMEOUT
    );
    assert_eq!(ApiError::from(Error::DuplicateEntry).status(), StatusCode::CONFLICT);
  }
}
