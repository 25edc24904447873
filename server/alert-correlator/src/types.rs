//! Core types for the alert correlator (JSON contracts + internal models).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Inbound types (JSON contract: what the caller sends)
// ---------------------------------------------------------------------------

/// A string-or-number field. Monitoring sources disagree on whether
/// severities and timestamps are sent as text or as numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
  Int(i64),
  Float(f64),
  Text(String),
}

impl fmt::Display for Scalar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Int(v) => write!(f, "{}", v),
      Self::Float(v) => write!(f, "{}", v),
      Self::Text(v) => f.write_str(v),
    }
  }
}

impl From<&str> for Scalar {
  fn from(s: &str) -> Self {
    Self::Text(s.to_string())
  }
}

impl From<i64> for Scalar {
  fn from(v: i64) -> Self {
    Self::Int(v)
  }
}

fn default_source() -> String {
  "api".to_string()
}

/// One inbound alert. Unknown fields are silently ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundAlert {
  #[serde(default = "default_source")]
  pub source: String,
  /// Identifier assigned by the monitoring source (e.g. Zabbix eventid), used for dedup.
  #[serde(default)]
  pub external_id: Option<String>,
  pub host: String,
  pub severity: Scalar,
  pub message: String,
  /// RFC3339 string or Unix seconds.
  pub timestamp: Scalar,
  #[serde(default)]
  pub raw_payload: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Severity enum (normalized)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  #[serde(alias = "info")]
  Information,
  Warning,
  Average,
  High,
  Disaster,
}

impl Severity {
  /// Accepts names, common abbreviations and Zabbix numeric codes.
  pub fn from_str_loose(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "information" | "info" | "not classified" => Some(Self::Information),
      "warning" | "warn" => Some(Self::Warning),
      "average" | "avg" => Some(Self::Average),
      "high" => Some(Self::High),
      "disaster" | "critical" => Some(Self::Disaster),
      code => code.parse::<i64>().ok().and_then(Self::from_code),
    }
  }

  /// Zabbix severity codes: 0 (not classified) through 5 (disaster).
  pub fn from_code(code: i64) -> Option<Self> {
    match code {
      0 | 1 => Some(Self::Information),
      2 => Some(Self::Warning),
      3 => Some(Self::Average),
      4 => Some(Self::High),
      5 => Some(Self::Disaster),
      _ => None,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Information => "information",
      Self::Warning => "warning",
      Self::Average => "average",
      Self::High => "high",
      Self::Disaster => "disaster",
    }
  }
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncidentId(pub String);

impl fmt::Display for AlertId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl fmt::Display for IncidentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for IncidentId {
  fn from(s: &str) -> Self {
    Self(s.to_string())
  }
}

impl From<&str> for AlertId {
  fn from(s: &str) -> Self {
    Self(s.to_string())
  }
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// Canonical alert after normalization + validation, not yet stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
  pub source: String,
  pub external_id: Option<String>,
  pub host: String,
  pub severity: Severity,
  pub message: String,
  pub timestamp: DateTime<Utc>,
  pub raw_payload: Map<String, Value>,
}

/// A stored alert. Immutable once stored except for `incident_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
  pub id: AlertId,
  pub source: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub external_id: Option<String>,
  pub host: String,
  pub severity: Severity,
  pub message: String,
  pub timestamp: DateTime<Utc>,
  pub incident_id: Option<IncidentId>,
  #[serde(skip_serializing_if = "Map::is_empty")]
  pub raw_payload: Map<String, Value>,
  /// Arrival sequence assigned by the store.
  #[serde(skip)]
  pub seq: u64,
}

impl Alert {
  pub fn is_pending(&self) -> bool {
    self.incident_id.is_none()
  }
}

// ---------------------------------------------------------------------------
// Incidents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
  Open,
  Closed,
}

/// A correlated group of alerts sharing a host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Incident {
  pub id: IncidentId,
  pub host: String,
  pub created_at: DateTime<Utc>,
  pub status: IncidentStatus,
  pub root_cause_summary: Option<String>,
  pub llm_explanation: Option<String>,
  pub updated_at: Option<DateTime<Utc>>,
  pub closed_at: Option<DateTime<Utc>>,
  /// Member alerts in arrival order.
  pub alert_ids: Vec<AlertId>,
}

impl Incident {
  pub fn open(id: IncidentId, host: &str, created_at: DateTime<Utc>) -> Self {
    Self {
      id,
      host: host.to_string(),
      created_at,
      status: IncidentStatus::Open,
      root_cause_summary: None,
      llm_explanation: None,
      updated_at: None,
      closed_at: None,
      alert_ids: Vec::new(),
    }
  }

  pub fn is_open(&self) -> bool {
    self.status == IncidentStatus::Open
  }

  /// Appends an alert at the end of the sequence. Closed incidents reject new members.
  pub fn push_alert(&mut self, alert_id: AlertId, at: DateTime<Utc>) -> Result<(), EngineError> {
    if !self.is_open() {
      return Err(EngineError::invalid_state(format!(
        "incident {} is closed; cannot attach alert {}",
        self.id, alert_id
      )));
    }
    self.alert_ids.push(alert_id);
    self.touch(at);
    Ok(())
  }

  /// open -> closed. Closed is terminal; a second close is an error.
  pub fn close(&mut self, at: DateTime<Utc>) -> Result<(), EngineError> {
    if !self.is_open() {
      return Err(EngineError::invalid_state(format!(
        "incident {} is already closed",
        self.id
      )));
    }
    self.status = IncidentStatus::Closed;
    self.closed_at = Some(at);
    self.touch(at);
    Ok(())
  }

  pub fn set_analysis(&mut self, summary: String, explanation: String, at: DateTime<Utc>) {
    self.root_cause_summary = Some(summary);
    self.llm_explanation = Some(explanation);
    self.touch(at);
  }

  // updated_at never moves backwards when alerts arrive out of order.
  fn touch(&mut self, at: DateTime<Utc>) {
    self.updated_at = Some(match self.updated_at {
      Some(prev) if prev > at => prev,
      _ => at,
    });
  }
}

// ---------------------------------------------------------------------------
// Output types (JSON contract: what we emit)
// ---------------------------------------------------------------------------

/// Result of ingesting one alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
  /// A new incident was opened with the recent pending alerts plus this one.
  Opened {
    alert_id: AlertId,
    incident_id: IncidentId,
    alert_count: usize,
  },
  /// The alert joined its host's open incident.
  Appended {
    alert_id: AlertId,
    incident_id: IncidentId,
    alert_count: usize,
  },
  /// Stored unattached.
  Pending { alert_id: AlertId },
  /// Same (source, external_id) was already ingested; nothing stored.
  Duplicate { source: String, external_id: String },
}

impl Outcome {
  pub fn incident_id(&self) -> Option<&IncidentId> {
    match self {
      Self::Opened { incident_id, .. } | Self::Appended { incident_id, .. } => Some(incident_id),
      Self::Pending { .. } | Self::Duplicate { .. } => None,
    }
  }

  pub fn alert_id(&self) -> Option<&AlertId> {
    match self {
      Self::Opened { alert_id, .. }
      | Self::Appended { alert_id, .. }
      | Self::Pending { alert_id } => Some(alert_id),
      Self::Duplicate { .. } => None,
    }
  }
}

/// Incident with its alerts (arrival order) and suggested first actions.
#[derive(Debug, Clone, Serialize)]
pub struct IncidentDetail {
  #[serde(flatten)]
  pub incident: Incident,
  pub alerts: Vec<Alert>,
  pub recommended_first_actions: Vec<String>,
}

/// Structured error output for invalid input lines and API errors.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
      field: None,
    }
  }

  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = Some(field.into());
    self
  }
}

impl From<&EngineError> for ErrorOutput {
  fn from(e: &EngineError) -> Self {
    match e {
      EngineError::Validation { field, reason } => Self::new(reason.clone()).with_field(field.clone()),
      _ => Self::new(e.to_string()),
    }
  }
}
