//! Rule-based correlation of a stored alert into its host's incident.
//!
//! Rules, in order:
//! 1. The host has an open incident: append the alert to it.
//! 2. The host's pending alerts inside the trailing window
//!    `[timestamp - window, timestamp]` (this one included) exceed the
//!    threshold: open an incident holding all of them, arrival order.
//! 3. Otherwise the alert stays pending.

use tracing::{debug, info};

use crate::config::Config;
use crate::error::EngineError;
use crate::store::Store;
use crate::types::{Alert, AlertId, Outcome};

/// Correlate an alert that is already in `store` and not yet attached.
pub fn correlate<S: Store + ?Sized>(
  store: &mut S,
  config: &Config,
  alert: &Alert,
) -> Result<Outcome, EngineError> {
  if let Some(owner) = &alert.incident_id {
    return Err(EngineError::invalid_state(format!(
      "alert {} already belongs to incident {}",
      alert.id, owner
    )));
  }

  if let Some(open) = store.open_incident_for(&alert.host)? {
    let incident = store.attach_alert(&open.id, &alert.id)?;
    debug!(
      host = %alert.host,
      incident = %incident.id,
      alerts = incident.alert_ids.len(),
      "alert appended to open incident"
    );
    return Ok(Outcome::Appended {
      alert_id: alert.id.clone(),
      incident_id: incident.id,
      alert_count: incident.alert_ids.len(),
    });
  }

  let since = alert
    .timestamp
    .checked_sub_signed(config.window())
    .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC);
  let recent = store.pending_alerts(&alert.host, since, alert.timestamp)?;

  if recent.len() > config.alert_threshold {
    let members: Vec<AlertId> = recent.iter().map(|a| a.id.clone()).collect();
    let incident = store.create_incident(&alert.host, alert.timestamp, &members)?;
    info!(
      host = %alert.host,
      incident = %incident.id,
      alerts = incident.alert_ids.len(),
      "opened incident"
    );
    return Ok(Outcome::Opened {
      alert_id: alert.id.clone(),
      incident_id: incident.id,
      alert_count: incident.alert_ids.len(),
    });
  }

  debug!(host = %alert.host, recent = recent.len(), "alert pending");
  Ok(Outcome::Pending {
    alert_id: alert.id.clone(),
  })
}
