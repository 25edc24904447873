//! Core engine: owns the store, ingests alerts, drives the incident lifecycle.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::analysis::Analysis;
use crate::config::Config;
use crate::correlation;
use crate::error::EngineError;
use crate::normalize;
use crate::query::{self, AlertFilter, IncidentFilter, Page};
use crate::runbook;
use crate::stats::{self, CorrelationStats};
use crate::store::{MemoryStore, Store};
use crate::types::*;

/// The alert correlation engine. Calls are processed one at a time, in order.
pub struct Engine<S: Store = MemoryStore> {
  config: Config,
  store: S,
}

impl Engine<MemoryStore> {
  pub fn with_defaults() -> Self {
    Self::new(Config::default(), MemoryStore::new())
  }

  pub fn in_memory(config: Config) -> Self {
    Self::new(config, MemoryStore::new())
  }
}

impl<S: Store> Engine<S> {
  pub fn new(config: Config, store: S) -> Self {
    Self { config, store }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  /// Normalize, dedup, store and correlate a single inbound alert.
  pub fn ingest(&mut self, raw: &InboundAlert) -> Result<Outcome, EngineError> {
    let alert = normalize::normalize(raw)?;

    if let Some(ext) = &alert.external_id {
      if self.store.find_external(&alert.source, ext)?.is_some() {
        debug!(source = %alert.source, external_id = %ext, "duplicate alert skipped");
        return Ok(Outcome::Duplicate {
          source: alert.source,
          external_id: ext.clone(),
        });
      }
    }

    let stored = self.store.insert_alert(alert)?;
    correlation::correlate(&mut self.store, &self.config, &stored)
  }

  /// Ingest in the given (arrival) order. A failing record does not stop the rest.
  pub fn ingest_batch(&mut self, raws: &[InboundAlert]) -> Vec<Result<Outcome, EngineError>> {
    raws.iter().map(|raw| self.ingest(raw)).collect()
  }

  /// open -> closed. Closing a closed incident is an error.
  pub fn close(&mut self, id: &IncidentId, at: DateTime<Utc>) -> Result<Incident, EngineError> {
    let incident = self.store.close_incident(id, at)?;
    info!(incident = %incident.id, host = %incident.host, "incident closed");
    Ok(incident)
  }

  /// Alerts to hand to the analysis service, in arrival order.
  pub fn analysis_input(&self, id: &IncidentId) -> Result<Vec<Alert>, EngineError> {
    let incident = self.find_incident(id)?;
    let alerts = self.alerts_of(&incident)?;
    if alerts.is_empty() {
      return Err(EngineError::invalid_state(format!(
        "incident {} has no alerts to analyze",
        id
      )));
    }
    Ok(alerts)
  }

  pub fn record_analysis(
    &mut self,
    id: &IncidentId,
    analysis: &Analysis,
    at: DateTime<Utc>,
  ) -> Result<Incident, EngineError> {
    let incident = self.find_incident(id)?;
    if incident.alert_ids.is_empty() {
      return Err(EngineError::invalid_state(format!(
        "incident {} has no alerts to analyze",
        id
      )));
    }
    let updated = self.store.set_analysis(
      id,
      analysis.root_cause.clone(),
      analysis.reasoning.clone(),
      at,
    )?;
    info!(incident = %id, confidence = analysis.confidence, "analysis recorded");
    Ok(updated)
  }

  pub fn incident(&self, id: &IncidentId) -> Result<IncidentDetail, EngineError> {
    let incident = self.find_incident(id)?;
    self.detail(incident)
  }

  pub fn incidents(&self, filter: &IncidentFilter) -> Result<Page<IncidentDetail>, EngineError> {
    let page = query::page_incidents(self.store.incidents()?, filter);
    let items = page
      .items
      .into_iter()
      .map(|incident| self.detail(incident))
      .collect::<Result<Vec<_>, _>>()?;
    Ok(Page {
      items,
      total: page.total,
    })
  }

  pub fn alert(&self, id: &AlertId) -> Result<Alert, EngineError> {
    self
      .store
      .alert(id)?
      .ok_or_else(|| EngineError::not_found("alert", id.0.clone()))
  }

  pub fn alerts(&self, filter: &AlertFilter) -> Result<Page<Alert>, EngineError> {
    Ok(query::page_alerts(self.store.alerts()?, filter))
  }

  pub fn stats(&self) -> Result<CorrelationStats, EngineError> {
    Ok(stats::compute(&self.store.alerts()?, &self.store.incidents()?))
  }

  fn find_incident(&self, id: &IncidentId) -> Result<Incident, EngineError> {
    self
      .store
      .incident(id)?
      .ok_or_else(|| EngineError::not_found("incident", id.0.clone()))
  }

  fn alerts_of(&self, incident: &Incident) -> Result<Vec<Alert>, EngineError> {
    incident
      .alert_ids
      .iter()
      .map(|id| self.alert(id))
      .collect()
  }

  fn detail(&self, incident: Incident) -> Result<IncidentDetail, EngineError> {
    let alerts = self.alerts_of(&incident)?;
    let recommended_first_actions = runbook::first_actions(alerts.iter().map(|a| a.message.as_str()));
    Ok(IncidentDetail {
      incident,
      alerts,
      recommended_first_actions,
    })
  }
}
