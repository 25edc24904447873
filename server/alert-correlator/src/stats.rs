//! Correlation statistics over the stored alerts and incidents.

use serde::Serialize;

use crate::types::{Alert, Incident};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationStats {
  pub total_alerts: usize,
  pub correlated_alerts: usize,
  pub uncorrelated_alerts: usize,
  pub total_incidents: usize,
  pub open_incidents: usize,
  /// Percentage of alerts attached to an incident, two decimals.
  pub correlation_rate: f64,
}

pub fn compute(alerts: &[Alert], incidents: &[Incident]) -> CorrelationStats {
  let total_alerts = alerts.len();
  let correlated_alerts = alerts.iter().filter(|a| !a.is_pending()).count();
  let correlation_rate = if total_alerts > 0 {
    let pct = correlated_alerts as f64 / total_alerts as f64 * 100.0;
    (pct * 100.0).round() / 100.0
  } else {
    0.0
  };

  CorrelationStats {
    total_alerts,
    correlated_alerts,
    uncorrelated_alerts: total_alerts - correlated_alerts,
    total_incidents: incidents.len(),
    open_incidents: incidents.iter().filter(|i| i.is_open()).count(),
    correlation_rate,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{AlertId, IncidentId, Severity};
  use chrono::{TimeZone, Utc};
  use serde_json::Map;

  fn alert(n: u64, incident: Option<&str>) -> Alert {
    Alert {
      id: AlertId(format!("alt-{}", n)),
      source: "api".into(),
      external_id: None,
      host: "web-01".into(),
      severity: Severity::Warning,
      message: "ping loss".into(),
      timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
      incident_id: incident.map(IncidentId::from),
      raw_payload: Map::new(),
      seq: n,
    }
  }

  #[test]
  fn empty_store_has_zero_rate() {
    let stats = compute(&[], &[]);
    assert_eq!(stats.total_alerts, 0);
    assert_eq!(stats.correlation_rate, 0.0);
  }

  #[test]
  fn counts_and_rate() {
    let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    let mut closed = Incident::open(IncidentId::from("inc-a"), "web-01", at);
    closed.close(at).unwrap();
    let open = Incident::open(IncidentId::from("inc-b"), "web-01", at);

    let alerts = vec![
      alert(0, Some("inc-a")),
      alert(1, Some("inc-b")),
      alert(2, None),
    ];
    let stats = compute(&alerts, &[closed, open]);
    assert_eq!(stats.correlated_alerts, 2);
    assert_eq!(stats.uncorrelated_alerts, 1);
    assert_eq!(stats.total_incidents, 2);
    assert_eq!(stats.open_incidents, 1);
    assert_eq!(stats.correlation_rate, 66.67);
  }
}
