//! Shared application state.

use alert_correlator::Engine;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::analyzer::Analyzer;

/// One engine behind an async mutex: correlation runs one alert at a time.
pub struct AppState {
  pub engine: Mutex<Engine>,
  pub analyzer: Option<Arc<dyn Analyzer>>,
}

impl AppState {
  pub fn new(engine: Engine, analyzer: Option<Arc<dyn Analyzer>>) -> Self {
    Self {
      engine: Mutex::new(engine),
      analyzer,
    }
  }
}

pub type SharedState = Arc<AppState>;
