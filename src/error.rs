//! Error types for exam generation and their HTTP mapping.

use std::time::Duration;

use axum::{
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use thiserror::Error;

use crate::protocol::ErrorOut;

/// Shown to the teacher for every generation failure. Causes are only logged.
pub const GENERATION_FAILED_MESSAGE: &str =
  "Gagal membuat soal. Pastikan API Key valid atau coba lagi beberapa saat lagi.";

/// Anything that went wrong between sending the prompt and holding a typed document.
#[derive(Debug, Error)]
pub enum GenerationError {
  #[error("model call failed: {0}")]
  Call(String),
  #[error("model returned no text")]
  EmptyResponse,
  #[error("response does not match the declared shape: {0}")]
  Shape(String),
  #[error("model call timed out after {0:?}")]
  Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error("invalid exam configuration: {0}")]
  InvalidConfig(String),
  #[error("a generation is already in progress for this session")]
  Busy,
  #[error(transparent)]
  Generation(#[from] GenerationError),
  #[error("no generator configured (set GEMINI_API_KEY or OPENAI_API_KEY)")]
  GeneratorUnavailable,
  #[error("no exam document for this session")]
  NoDocument,
}

impl AppError {
  pub fn status(&self) -> StatusCode {
    match self {
      AppError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
      AppError::Busy => StatusCode::CONFLICT,
      AppError::Generation(_) => StatusCode::BAD_GATEWAY,
      AppError::GeneratorUnavailable => StatusCode::SERVICE_UNAVAILABLE,
      AppError::NoDocument => StatusCode::NOT_FOUND,
    }
  }

  /// Message safe to show in the UI.
  pub fn public_message(&self) -> String {
    match self {
      AppError::Generation(_) => GENERATION_FAILED_MESSAGE.to_string(),
      other => other.to_string(),
    }
  }
}

impl From<JsonRejection> for AppError {
  fn from(rejection: JsonRejection) -> Self {
    AppError::InvalidConfig(rejection.body_text())
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let status = self.status();
    (status, Json(ErrorOut { message: self.public_message() })).into_response()
  }
}
