//! Binary entrypoint: read JSON lines from stdin, write JSON lines to stdout.
//!
//! Each input line is an InboundAlert. Each output line is either:
//! - An Outcome (`opened`, `appended`, `pending` or `duplicate`)
//! - An ErrorOutput (when input validation fails)
//!
//! Correlation statistics are logged to stderr at end of input.

use alert_correlator::types::ErrorOutput;
use alert_correlator::{Config, Engine, InboundAlert};
use std::io::{self, BufRead, Write};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let config = match Config::from_env() {
    Ok(c) => c,
    Err(e) => {
      error!("alert-correlator: config: {}", e);
      std::process::exit(2);
    }
  };
  info!(
    window_secs = config.window_secs,
    alert_threshold = config.alert_threshold,
    "alert-correlator starting"
  );

  let stdin = io::stdin();
  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());
  let mut engine = Engine::in_memory(config);

  for line in stdin.lock().lines() {
    let line = match line {
      Ok(l) => l,
      Err(e) => {
        error!("alert-correlator: read error: {}", e);
        std::process::exit(1);
      }
    };

    // Skip blank lines.
    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }

    let raw: InboundAlert = match serde_json::from_str(trimmed) {
      Ok(v) => v,
      Err(e) => {
        let err = ErrorOutput::new(format!("json parse: {}", e));
        let _ = serde_json::to_writer(&mut out, &err);
        let _ = writeln!(out);
        continue;
      }
    };

    match engine.ingest(&raw) {
      Ok(outcome) => {
        let _ = serde_json::to_writer(&mut out, &outcome);
      }
      Err(e) => {
        let _ = serde_json::to_writer(&mut out, &ErrorOutput::from(&e));
      }
    }
    let _ = writeln!(out);
  }

  let _ = out.flush();

  match engine.stats() {
    Ok(stats) => info!(
      total_alerts = stats.total_alerts,
      correlated_alerts = stats.correlated_alerts,
      open_incidents = stats.open_incidents,
      correlation_rate = stats.correlation_rate,
      "input exhausted"
    ),
    Err(e) => error!("alert-correlator: stats: {}", e),
  }
}
