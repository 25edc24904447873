//! Structured error types for the alert correlator.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("validation: {field}: {reason}")]
  Validation { field: String, reason: String },

  #[error("parse: {0}")]
  Parse(String),

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),

  #[error("{kind} not found: {id}")]
  NotFound { kind: &'static str, id: String },

  #[error("invalid state: {0}")]
  InvalidState(String),

  #[error("store: {0}")]
  Store(String),
}

impl EngineError {
  pub fn validation(field: &str, reason: &str) -> Self {
    Self::Validation {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn parse(msg: impl Into<String>) -> Self {
    Self::Parse(msg.into())
  }

  pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
    Self::NotFound {
      kind,
      id: id.into(),
    }
  }

  pub fn invalid_state(msg: impl Into<String>) -> Self {
    Self::InvalidState(msg.into())
  }

  /// Field name for validation errors, used by callers that report it separately.
  pub fn field(&self) -> Option<&str> {
    match self {
      Self::Validation { field, .. } => Some(field),
      _ => None,
    }
  }
}
