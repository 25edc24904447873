//! Stable identifiers for alerts and incidents.
//!
//! Ids hash the record content together with the store's arrival sequence,
//! so replaying the same input into a fresh store yields the same ids.

use chrono::{DateTime, Utc};

use crate::types::{AlertId, IncidentId, NewAlert};

fn short_hex(hasher: &blake3::Hasher) -> String {
  let hex = hasher.finalize().to_hex();
  hex[..16].to_string()
}

pub fn alert_id(alert: &NewAlert, seq: u64) -> AlertId {
  let mut hasher = blake3::Hasher::new();
  hasher.update(alert.source.as_bytes());
  hasher.update(b"|");
  hasher.update(alert.host.as_bytes());
  hasher.update(b"|");
  hasher.update(alert.timestamp.to_rfc3339().as_bytes());
  hasher.update(b"|");
  hasher.update(alert.message.as_bytes());
  hasher.update(b"|");
  hasher.update(&seq.to_le_bytes());
  AlertId(format!("alt-{}", short_hex(&hasher)))
}

pub fn incident_id(host: &str, created_at: &DateTime<Utc>, seq: u64) -> IncidentId {
  let mut hasher = blake3::Hasher::new();
  hasher.update(host.as_bytes());
  hasher.update(b"|");
  hasher.update(created_at.format("%Y-%m-%dT%H:%M:%S").to_string().as_bytes());
  hasher.update(b"|");
  hasher.update(&seq.to_le_bytes());
  IncidentId(format!("inc-{}", short_hex(&hasher)))
}
