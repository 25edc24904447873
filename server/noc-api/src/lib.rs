//! NOC API: HTTP service over the alert correlator.
//!
//! Alerts arrive via `POST /alerts` or the Zabbix poller; incidents are
//! listed, analyzed (LLM root cause) and closed over JSON endpoints.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod poller;
pub mod routes;
pub mod state;
pub mod types;

pub use analyzer::{Analyzer, OpenAiAnalyzer};
pub use config::Settings;
pub use error::ApiError;
pub use poller::{PollSummary, Poller, ProblemSource, ZabbixClient};
pub use routes::router;
pub use state::{AppState, SharedState};
