//! API error type and its HTTP mapping.

use alert_correlator::types::ErrorOutput;
use alert_correlator::EngineError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Engine(#[from] EngineError),

  #[error(transparent)]
  Body(#[from] JsonRejection),

  #[error(transparent)]
  Query(#[from] QueryRejection),

  #[error("config: {field}: {reason}")]
  Config { field: String, reason: String },

  #[error("analysis not configured")]
  AnalysisUnavailable,

  #[error("analysis failed: {0}")]
  Analysis(String),

  #[error("zabbix: {0}")]
  Zabbix(String),

  #[error("http: {0}")]
  Http(#[from] reqwest::Error),

  #[error("io: {0}")]
  Io(#[from] std::io::Error),
}

impl ApiError {
  pub fn config(field: &str, reason: &str) -> Self {
    Self::Config {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::Engine(e) => match e {
        EngineError::Validation { .. } | EngineError::Parse(_) | EngineError::Json(_) => {
          StatusCode::BAD_REQUEST
        }
        EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
        EngineError::InvalidState(_) => StatusCode::CONFLICT,
        EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
      Self::Body(r) => r.status(),
      Self::Query(r) => r.status(),
      Self::Config { .. } | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
      Self::AnalysisUnavailable => StatusCode::SERVICE_UNAVAILABLE,
      Self::Analysis(_) | Self::Zabbix(_) | Self::Http(_) => StatusCode::BAD_GATEWAY,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      warn!(error = %self, status = status.as_u16(), "request failed");
    }
    let body = match &self {
      Self::Engine(e) => ErrorOutput::from(e),
      Self::Body(r) => ErrorOutput::new(r.body_text()),
      Self::Query(r) => ErrorOutput::new(r.body_text()),
      other => ErrorOutput::new(other.to_string()),
    };
    (status, Json(body)).into_response()
  }
}
