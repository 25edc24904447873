//! Request/response types for the API.

use alert_correlator::types::ErrorOutput;
use alert_correlator::{EngineError, InboundAlert, Incident, Outcome};
use serde::Serialize;
use serde_json::Value;

/// `POST /alerts` body: one alert object or an array of them.
/// Records are decoded one by one so a bad record fails alone.
#[derive(Debug)]
pub enum AlertBatch {
  One(Value),
  Many(Vec<Value>),
}

impl From<Value> for AlertBatch {
  fn from(body: Value) -> Self {
    match body {
      Value::Array(items) => Self::Many(items),
      other => Self::One(other),
    }
  }
}

pub fn decode_alert(value: Value) -> Result<InboundAlert, EngineError> {
  Ok(serde_json::from_value(value)?)
}

/// Per-record result of a batch ingest.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatchItem {
  Ok(Outcome),
  Err(ErrorOutput),
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
  pub message: &'static str,
  pub root_cause: String,
  pub confidence: f64,
  pub incident: Incident,
}

#[derive(Debug, Serialize)]
pub struct CloseResponse {
  pub message: &'static str,
  pub incident: Incident,
}

#[derive(Debug, Serialize)]
pub struct Health {
  pub status: &'static str,
  pub version: &'static str,
}
