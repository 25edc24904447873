//! Normalize inbound alerts into canonical internal models.

use chrono::{DateTime, TimeZone, Utc};

use crate::error::EngineError;
use crate::types::*;

/// Parse and validate an InboundAlert into a NewAlert.
pub fn normalize(raw: &InboundAlert) -> Result<NewAlert, EngineError> {
  let timestamp = parse_timestamp(&raw.timestamp)?;
  let severity = parse_severity(&raw.severity)?;

  let host = raw.host.trim();
  if host.is_empty() {
    return Err(EngineError::validation("host", "must not be empty"));
  }
  let message = raw.message.trim();
  if message.is_empty() {
    return Err(EngineError::validation("message", "must not be empty"));
  }
  let source = raw.source.trim();
  if source.is_empty() {
    return Err(EngineError::validation("source", "must not be empty"));
  }

  // Blank external ids carry no dedup information.
  let external_id = raw
    .external_id
    .as_deref()
    .map(str::trim)
    .filter(|id| !id.is_empty())
    .map(str::to_string);

  Ok(NewAlert {
    source: source.to_ascii_lowercase(),
    external_id,
    host: host.to_string(),
    severity,
    message: message.to_string(),
    timestamp,
    raw_payload: raw.raw_payload.clone(),
  })
}

/// RFC3339 text, or Unix seconds given as a number or numeric text.
pub fn parse_timestamp(value: &Scalar) -> Result<DateTime<Utc>, EngineError> {
  match value {
    Scalar::Int(secs) => from_unix(*secs),
    Scalar::Float(secs) if secs.is_finite() => from_unix(secs.trunc() as i64),
    Scalar::Float(_) => Err(EngineError::validation("timestamp", "not a finite number")),
    Scalar::Text(s) => {
      let s = s.trim();
      if let Ok(secs) = s.parse::<i64>() {
        return from_unix(secs);
      }
      DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EngineError::validation("timestamp", &format!("invalid RFC3339: {}", e)))
    }
  }
}

fn from_unix(secs: i64) -> Result<DateTime<Utc>, EngineError> {
  Utc
    .timestamp_opt(secs, 0)
    .single()
    .ok_or_else(|| EngineError::validation("timestamp", "unix seconds out of range"))
}

fn parse_severity(value: &Scalar) -> Result<Severity, EngineError> {
  let parsed = match value {
    Scalar::Int(code) => Severity::from_code(*code),
    Scalar::Float(_) => None,
    Scalar::Text(s) => Severity::from_str_loose(s),
  };
  parsed.ok_or_else(|| {
    EngineError::validation(
      "severity",
      "expected disaster|high|average|warning|information or 0-5",
    )
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::Map;

  fn raw(host: &str, severity: Scalar, timestamp: Scalar) -> InboundAlert {
    InboundAlert {
      source: "Zabbix".into(),
      external_id: Some(" 1001 ".into()),
      host: host.into(),
      severity,
      message: "  Disk space low on /var ".into(),
      timestamp,
      raw_payload: Map::new(),
    }
  }

  #[test]
  fn normalizes_text_fields() {
    let alert = normalize(&raw(
      " db-02 ",
      "average".into(),
      "2025-03-01T12:00:00+02:00".into(),
    ))
    .unwrap();
    assert_eq!(alert.host, "db-02");
    assert_eq!(alert.source, "zabbix");
    assert_eq!(alert.external_id.as_deref(), Some("1001"));
    assert_eq!(alert.message, "Disk space low on /var");
    assert_eq!(alert.severity, Severity::Average);
    assert_eq!(alert.timestamp.to_rfc3339(), "2025-03-01T10:00:00+00:00");
  }

  #[test]
  fn unix_seconds_accepted() {
    let alert = normalize(&raw("db-02", Scalar::Int(5), Scalar::Int(1_740_830_400))).unwrap();
    assert_eq!(alert.severity, Severity::Disaster);
    assert_eq!(alert.timestamp.to_rfc3339(), "2025-03-01T12:00:00+00:00");

    let alert = normalize(&raw("db-02", "high".into(), "1740830400".into())).unwrap();
    assert_eq!(alert.timestamp.to_rfc3339(), "2025-03-01T12:00:00+00:00");
  }

  #[test]
  fn empty_host_rejected() {
    let err = normalize(&raw("  ", "high".into(), Scalar::Int(0))).unwrap_err();
    assert_eq!(err.field(), Some("host"));
  }

  #[test]
  fn bad_timestamp_rejected() {
    let err = normalize(&raw("web-01", "high".into(), "yesterday".into())).unwrap_err();
    assert!(err.to_string().contains("timestamp"));
  }

  #[test]
  fn unknown_severity_rejected() {
    let err = normalize(&raw("web-01", "loud".into(), Scalar::Int(0))).unwrap_err();
    assert_eq!(err.field(), Some("severity"));
    let err = normalize(&raw("web-01", Scalar::Int(7), Scalar::Int(0))).unwrap_err();
    assert_eq!(err.field(), Some("severity"));
  }

  #[test]
  fn blank_external_id_dropped() {
    let mut inbound = raw("web-01", "high".into(), Scalar::Int(0));
    inbound.external_id = Some("   ".into());
    assert_eq!(normalize(&inbound).unwrap().external_id, None);
  }
}
