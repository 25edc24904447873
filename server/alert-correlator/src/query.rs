//! List filters and pagination for alerts and incidents.

use serde::{Deserialize, Serialize};

use crate::types::{Alert, Incident, IncidentId, IncidentStatus, Severity};

pub const DEFAULT_LIMIT: usize = 100;
pub const MAX_LIMIT: usize = 1000;

fn effective_limit(limit: Option<usize>) -> usize {
  limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncidentFilter {
  pub host: Option<String>,
  pub status: Option<IncidentStatus>,
  #[serde(default)]
  pub skip: usize,
  pub limit: Option<usize>,
}

impl IncidentFilter {
  pub fn matches(&self, incident: &Incident) -> bool {
    self.host.as_deref().map_or(true, |h| incident.host == h)
      && self.status.map_or(true, |s| incident.status == s)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertFilter {
  pub host: Option<String>,
  pub severity: Option<Severity>,
  pub incident_id: Option<IncidentId>,
  #[serde(default)]
  pub skip: usize,
  pub limit: Option<usize>,
}

impl AlertFilter {
  pub fn matches(&self, alert: &Alert) -> bool {
    self.host.as_deref().map_or(true, |h| alert.host == h)
      && self.severity.map_or(true, |s| alert.severity == s)
      && self
        .incident_id
        .as_ref()
        .map_or(true, |id| alert.incident_id.as_ref() == Some(id))
  }
}

/// One page of results plus the total match count before paging.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub total: usize,
}

/// Newest first (by `created_at`), later-created first on ties.
pub fn page_incidents(mut incidents: Vec<Incident>, filter: &IncidentFilter) -> Page<Incident> {
  incidents.retain(|i| filter.matches(i));
  incidents.reverse();
  incidents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
  paginate(incidents, filter.skip, filter.limit)
}

/// Newest first (by `timestamp`), later arrivals first on ties.
pub fn page_alerts(mut alerts: Vec<Alert>, filter: &AlertFilter) -> Page<Alert> {
  alerts.retain(|a| filter.matches(a));
  alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.seq.cmp(&a.seq)));
  paginate(alerts, filter.skip, filter.limit)
}

fn paginate<T>(items: Vec<T>, skip: usize, limit: Option<usize>) -> Page<T> {
  let total = items.len();
  let items = items
    .into_iter()
    .skip(skip)
    .take(effective_limit(limit))
    .collect();
  Page { items, total }
}
