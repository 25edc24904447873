//! Persistence seam for alerts and incidents, plus the in-memory store.
//!
//! The store owns the host -> open incident lookup table. Every mutating call
//! validates fully before it changes anything, so a failed call leaves the
//! store as it was.

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};

use crate::error::EngineError;
use crate::ids;
use crate::types::*;

/// Read/write access to alert and incident records.
pub trait Store {
  /// Stores a new, unattached alert and assigns its id and arrival sequence.
  fn insert_alert(&mut self, alert: NewAlert) -> Result<Alert, EngineError>;

  fn alert(&self, id: &AlertId) -> Result<Option<Alert>, EngineError>;

  /// Alert previously ingested with this source-assigned id, if any.
  fn find_external(&self, source: &str, external_id: &str) -> Result<Option<AlertId>, EngineError>;

  /// Unattached alerts for `host` with `since <= timestamp <= until`, in arrival order.
  fn pending_alerts(
    &self,
    host: &str,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
  ) -> Result<Vec<Alert>, EngineError>;

  /// The single open incident for `host`, if any.
  fn open_incident_for(&self, host: &str) -> Result<Option<Incident>, EngineError>;

  /// Opens an incident for `host` holding `alert_ids` in the given order.
  /// Fails if the host already has an open incident.
  fn create_incident(
    &mut self,
    host: &str,
    created_at: DateTime<Utc>,
    alert_ids: &[AlertId],
  ) -> Result<Incident, EngineError>;

  /// Appends an unattached alert to an open incident of the same host.
  fn attach_alert(&mut self, incident_id: &IncidentId, alert_id: &AlertId) -> Result<Incident, EngineError>;

  fn incident(&self, id: &IncidentId) -> Result<Option<Incident>, EngineError>;

  fn close_incident(&mut self, id: &IncidentId, at: DateTime<Utc>) -> Result<Incident, EngineError>;

  fn set_analysis(
    &mut self,
    id: &IncidentId,
    summary: String,
    explanation: String,
    at: DateTime<Utc>,
  ) -> Result<Incident, EngineError>;

  /// All incidents in creation order.
  fn incidents(&self) -> Result<Vec<Incident>, EngineError>;

  /// All alerts in arrival order.
  fn alerts(&self) -> Result<Vec<Alert>, EngineError>;
}

/// Process-local store. Alerts and incidents are kept in arrival order;
/// side tables index them by id, by host and by source-assigned id.
#[derive(Debug, Default)]
pub struct MemoryStore {
  alerts: Vec<Alert>,
  alert_index: HashMap<AlertId, usize>,
  external_index: HashMap<(String, String), AlertId>,
  /// host -> unattached alerts keyed by (timestamp, slot).
  pending: HashMap<String, BTreeSet<(DateTime<Utc>, usize)>>,
  incidents: Vec<Incident>,
  incident_index: HashMap<IncidentId, usize>,
  open_by_host: HashMap<String, IncidentId>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn alert_count(&self) -> usize {
    self.alerts.len()
  }

  pub fn incident_count(&self) -> usize {
    self.incidents.len()
  }

  fn alert_slot(&self, id: &AlertId) -> Result<usize, EngineError> {
    self
      .alert_index
      .get(id)
      .copied()
      .ok_or_else(|| EngineError::not_found("alert", id.0.clone()))
  }

  fn incident_slot(&self, id: &IncidentId) -> Result<usize, EngineError> {
    self
      .incident_index
      .get(id)
      .copied()
      .ok_or_else(|| EngineError::not_found("incident", id.0.clone()))
  }

  fn take_pending(&mut self, host: &str, slot: usize) {
    let key = (self.alerts[slot].timestamp, slot);
    if let Some(slots) = self.pending.get_mut(host) {
      slots.remove(&key);
      if slots.is_empty() {
        self.pending.remove(host);
      }
    }
  }

  fn check_attachable(&self, slot: usize, host: &str) -> Result<(), EngineError> {
    let alert = &self.alerts[slot];
    if alert.host != host {
      return Err(EngineError::invalid_state(format!(
        "alert {} is for host {}, not {}",
        alert.id, alert.host, host
      )));
    }
    if let Some(owner) = &alert.incident_id {
      return Err(EngineError::invalid_state(format!(
        "alert {} already belongs to incident {}",
        alert.id, owner
      )));
    }
    Ok(())
  }
}

impl Store for MemoryStore {
  fn insert_alert(&mut self, alert: NewAlert) -> Result<Alert, EngineError> {
    let slot = self.alerts.len();
    let id = ids::alert_id(&alert, slot as u64);
    if self.alert_index.contains_key(&id) {
      return Err(EngineError::Store(format!("alert id collision: {}", id)));
    }
    if let Some(ext) = &alert.external_id {
      if self.external_index.contains_key(&(alert.source.clone(), ext.clone())) {
        return Err(EngineError::invalid_state(format!(
          "alert {}/{} already stored",
          alert.source, ext
        )));
      }
    }

    let stored = Alert {
      id: id.clone(),
      source: alert.source,
      external_id: alert.external_id,
      host: alert.host,
      severity: alert.severity,
      message: alert.message,
      timestamp: alert.timestamp,
      incident_id: None,
      raw_payload: alert.raw_payload,
      seq: slot as u64,
    };

    if let Some(ext) = &stored.external_id {
      self
        .external_index
        .insert((stored.source.clone(), ext.clone()), id.clone());
    }
    self.alert_index.insert(id, slot);
    self
      .pending
      .entry(stored.host.clone())
      .or_default()
      .insert((stored.timestamp, slot));
    self.alerts.push(stored.clone());
    Ok(stored)
  }

  fn alert(&self, id: &AlertId) -> Result<Option<Alert>, EngineError> {
    Ok(self.alert_index.get(id).map(|&slot| self.alerts[slot].clone()))
  }

  fn find_external(&self, source: &str, external_id: &str) -> Result<Option<AlertId>, EngineError> {
    Ok(
      self
        .external_index
        .get(&(source.to_string(), external_id.to_string()))
        .cloned(),
    )
  }

  fn pending_alerts(
    &self,
    host: &str,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
  ) -> Result<Vec<Alert>, EngineError> {
    let Some(slots) = self.pending.get(host) else {
      return Ok(Vec::new());
    };
    if since > until {
      return Ok(Vec::new());
    }
    let mut in_window: Vec<usize> = slots
      .range((since, 0)..=(until, usize::MAX))
      .map(|&(_, slot)| slot)
      .collect();
    // Slots are arrival order.
    in_window.sort_unstable();
    Ok(in_window.into_iter().map(|slot| self.alerts[slot].clone()).collect())
  }

  fn open_incident_for(&self, host: &str) -> Result<Option<Incident>, EngineError> {
    match self.open_by_host.get(host) {
      Some(id) => Ok(Some(self.incidents[self.incident_slot(id)?].clone())),
      None => Ok(None),
    }
  }

  fn create_incident(
    &mut self,
    host: &str,
    created_at: DateTime<Utc>,
    alert_ids: &[AlertId],
  ) -> Result<Incident, EngineError> {
    if let Some(open) = self.open_by_host.get(host) {
      return Err(EngineError::invalid_state(format!(
        "host {} already has open incident {}",
        host, open
      )));
    }
    if alert_ids.is_empty() {
      return Err(EngineError::invalid_state("an incident needs at least one alert"));
    }

    let mut slots = Vec::with_capacity(alert_ids.len());
    for id in alert_ids {
      let slot = self.alert_slot(id)?;
      self.check_attachable(slot, host)?;
      if slots.contains(&slot) {
        return Err(EngineError::invalid_state(format!("alert {} listed twice", id)));
      }
      slots.push(slot);
    }

    let seq = self.incidents.len() as u64;
    let id = ids::incident_id(host, &created_at, seq);
    if self.incident_index.contains_key(&id) {
      return Err(EngineError::Store(format!("incident id collision: {}", id)));
    }

    let mut incident = Incident::open(id.clone(), host, created_at);
    for &slot in &slots {
      let alert = &self.alerts[slot];
      incident.push_alert(alert.id.clone(), alert.timestamp)?;
    }
    for &slot in &slots {
      self.alerts[slot].incident_id = Some(id.clone());
      self.take_pending(host, slot);
    }

    self.incident_index.insert(id.clone(), self.incidents.len());
    self.open_by_host.insert(host.to_string(), id);
    self.incidents.push(incident.clone());
    Ok(incident)
  }

  fn attach_alert(&mut self, incident_id: &IncidentId, alert_id: &AlertId) -> Result<Incident, EngineError> {
    let islot = self.incident_slot(incident_id)?;
    let aslot = self.alert_slot(alert_id)?;
    let host = self.incidents[islot].host.clone();
    self.check_attachable(aslot, &host)?;

    let at = self.alerts[aslot].timestamp;
    self.incidents[islot].push_alert(alert_id.clone(), at)?;
    self.alerts[aslot].incident_id = Some(incident_id.clone());
    self.take_pending(&host, aslot);
    Ok(self.incidents[islot].clone())
  }

  fn incident(&self, id: &IncidentId) -> Result<Option<Incident>, EngineError> {
    Ok(self.incident_index.get(id).map(|&slot| self.incidents[slot].clone()))
  }

  fn close_incident(&mut self, id: &IncidentId, at: DateTime<Utc>) -> Result<Incident, EngineError> {
    let slot = self.incident_slot(id)?;
    let incident = &mut self.incidents[slot];
    incident.close(at)?;
    let closed = incident.clone();

    if self.open_by_host.get(&closed.host) == Some(id) {
      self.open_by_host.remove(&closed.host);
    }
    Ok(closed)
  }

  fn set_analysis(
    &mut self,
    id: &IncidentId,
    summary: String,
    explanation: String,
    at: DateTime<Utc>,
  ) -> Result<Incident, EngineError> {
    let slot = self.incident_slot(id)?;
    let incident = &mut self.incidents[slot];
    incident.set_analysis(summary, explanation, at);
    Ok(incident.clone())
  }

  fn incidents(&self) -> Result<Vec<Incident>, EngineError> {
    Ok(self.incidents.clone())
  }

  fn alerts(&self) -> Result<Vec<Alert>, EngineError> {
    Ok(self.alerts.clone())
  }
}
