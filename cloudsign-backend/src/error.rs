use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use cloudsign_core::SignError;
use cloudsign_db::DbError;
use serde::Serialize;

use crate::loader::LoadError;

const INTERNAL_ERROR: &str = "An internal error occurred. Please try again later.";

/// API error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
  pub error: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<String>,
}

impl ErrorResponse {
  pub fn new(error: impl Into<String>) -> Self {
    Self {
      error: error.into(),
      details: None,
    }
  }

  pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
    Self {
      error: error.into(),
      details: Some(details.into()),
    }
  }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
  Sign(SignError),
  Database(DbError),
  Config(LoadError),
  ValidationError(String),
  /// Missing or wrong operator token
  Unauthorized,
  /// Mutating routes are disabled (no operator token configured)
  Forbidden,
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let (status, body) = match self {
      AppError::Sign(err) => sign_error_response(err),
      AppError::Database(db_err) => {
        let (status, message) = match &db_err {
          DbError::LocationAlreadyRegistered => (StatusCode::CONFLICT, "Sign is already registered"),
          DbError::LocationNotFound => (StatusCode::NOT_FOUND, "Sign is not registered"),
          DbError::Sqlite(_) | DbError::Connection(_) => {
            // Don't expose internal database errors
            tracing::error!(?db_err, "internal database error");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
          }
        };
        (status, ErrorResponse::new(message))
      }
      AppError::Config(err) => {
        tracing::warn!(error = %err, "configuration reload failed");
        (
          StatusCode::UNPROCESSABLE_ENTITY,
          ErrorResponse::with_details("Configuration could not be loaded", err.to_string()),
        )
      }
      AppError::ValidationError(msg) => {
        tracing::warn!(validation_error = %msg, "Validation failed");
        (StatusCode::BAD_REQUEST, ErrorResponse::new(msg))
      }
      AppError::Unauthorized => (
        StatusCode::UNAUTHORIZED,
        ErrorResponse::new("Invalid operator token"),
      ),
      AppError::Forbidden => (
        StatusCode::FORBIDDEN,
        ErrorResponse::new("Operator routes are disabled"),
      ),
    };
    (status, Json(body)).into_response()
  }
}

fn sign_error_response(err: SignError) -> (StatusCode, ErrorResponse) {
  match err {
    SignError::GroupNotFound(group) => (
      StatusCode::NOT_FOUND,
      ErrorResponse::with_details("Group not found", group),
    ),
    SignError::GroupNotRegistered(group) => (
      StatusCode::NOT_FOUND,
      ErrorResponse::with_details("No signs registered for group", group),
    ),
    SignError::AlreadyRegistered => (
      StatusCode::CONFLICT,
      ErrorResponse::new("Sign is already registered"),
    ),
    SignError::NotRegistered => (
      StatusCode::NOT_FOUND,
      ErrorResponse::new("Sign is not registered"),
    ),
    err @ (SignError::RuleNotFound(_)
    | SignError::RuleConflict(_)
    | SignError::TooManyLines(_)
    | SignError::InvalidPattern { .. }
    | SignError::InvalidLayout { .. }) => {
      tracing::warn!(error = %err, "rejected sign configuration");
      (
        StatusCode::UNPROCESSABLE_ENTITY,
        ErrorResponse::with_details("Invalid sign configuration", err.to_string()),
      )
    }
    SignError::Controller(source) => {
      tracing::error!(error = %source, "controller request failed");
      (
        StatusCode::BAD_GATEWAY,
        ErrorResponse::new("Cloud controller is unavailable"),
      )
    }
    err @ (SignError::Registry(_) | SignError::Mapping(_) | SignError::AlreadyStarted) => {
      tracing::error!(error = %err, "internal sign error");
      (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new(INTERNAL_ERROR))
    }
  }
}

impl From<SignError> for AppError {
  fn from(err: SignError) -> Self {
    AppError::Sign(err)
  }
}

impl From<DbError> for AppError {
  fn from(err: DbError) -> Self {
    AppError::Database(err)
  }
}

impl From<LoadError> for AppError {
  fn from(err: LoadError) -> Self {
    AppError::Config(err)
  }
}

impl From<crate::validation::ValidationError> for AppError {
  fn from(err: crate::validation::ValidationError) -> Self {
    AppError::ValidationError(err.to_string())
  }
}
