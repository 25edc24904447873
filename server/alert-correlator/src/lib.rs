//! NOC Alert Correlator: deterministic, rule-based (MVP).
//!
//! Ingests monitoring alerts, attaches each to its host's open incident or
//! opens a new incident when a host bursts past the threshold inside the
//! trailing window, and drives the open -> closed incident lifecycle.
//!
//! No DB, no network; pure computation + in-memory state behind [`Store`].

pub mod analysis;
pub mod config;
pub mod correlation;
pub mod engine;
pub mod error;
pub mod ids;
pub mod normalize;
pub mod query;
pub mod runbook;
pub mod stats;
pub mod store;
pub mod types;
pub mod zabbix;

pub use analysis::Analysis;
pub use config::Config;
pub use engine::Engine;
pub use error::EngineError;
pub use query::{AlertFilter, IncidentFilter, Page};
pub use stats::CorrelationStats;
pub use store::{MemoryStore, Store};
pub use types::{
  Alert, AlertId, InboundAlert, Incident, IncidentDetail, IncidentId, IncidentStatus, Outcome,
  Severity,
};
