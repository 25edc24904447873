//! Correlation configuration with documented defaults.

use chrono::Duration;
use serde::Deserialize;

use crate::error::EngineError;

/// Env var overriding [`Config::window_secs`].
pub const ENV_WINDOW_SECS: &str = "CORRELATION_WINDOW_SECS";
/// Env var overriding [`Config::alert_threshold`].
pub const ENV_ALERT_THRESHOLD: &str = "CORRELATION_ALERT_THRESHOLD";

/// Upper bound for the correlation window (one year).
pub const MAX_WINDOW_SECS: u64 = 366 * 24 * 60 * 60;

/// Tunable thresholds for opening incidents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Trailing window (seconds) in which recent alerts for a host are counted.
  pub window_secs: u64,
  /// A new incident opens when the host's pending alerts inside the window,
  /// the new one included, exceed this count.
  pub alert_threshold: usize,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      window_secs: 300,
      alert_threshold: 5,
    }
  }
}

impl Config {
  /// Defaults overridden by `CORRELATION_*` environment variables.
  pub fn from_env() -> Result<Self, EngineError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Defaults overridden by whatever `lookup` returns for the `CORRELATION_*` keys.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EngineError> {
    let mut config = Self::default();
    if let Some(v) = lookup(ENV_WINDOW_SECS) {
      config.window_secs = v
        .trim()
        .parse()
        .map_err(|_| EngineError::validation(ENV_WINDOW_SECS, "expected whole seconds"))?;
    }
    if let Some(v) = lookup(ENV_ALERT_THRESHOLD) {
      config.alert_threshold = v
        .trim()
        .parse()
        .map_err(|_| EngineError::validation(ENV_ALERT_THRESHOLD, "expected a count"))?;
    }
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), EngineError> {
    if self.window_secs == 0 {
      return Err(EngineError::validation("window_secs", "must be positive"));
    }
    if self.window_secs > MAX_WINDOW_SECS {
      return Err(EngineError::validation("window_secs", "must not exceed one year"));
    }
    if self.alert_threshold == 0 {
      return Err(EngineError::validation("alert_threshold", "must be positive"));
    }
    Ok(())
  }

  pub fn window(&self) -> Duration {
    Duration::seconds(self.window_secs.min(MAX_WINDOW_SECS) as i64)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();
    move |key| map.get(key).cloned()
  }

  #[test]
  fn defaults_are_five_alerts_in_five_minutes() {
    let config = Config::default();
    assert_eq!(config.window_secs, 300);
    assert_eq!(config.alert_threshold, 5);
    assert_eq!(config.window(), Duration::minutes(5));
  }

  #[test]
  fn env_overrides_apply() {
    let config = Config::from_lookup(lookup(&[
      (ENV_WINDOW_SECS, "600"),
      (ENV_ALERT_THRESHOLD, " 3 "),
    ]))
    .unwrap();
    assert_eq!(config.window_secs, 600);
    assert_eq!(config.alert_threshold, 3);
  }

  #[test]
  fn bad_override_names_the_variable() {
    let err = Config::from_lookup(lookup(&[(ENV_WINDOW_SECS, "five")])).unwrap_err();
    assert_eq!(err.field(), Some(ENV_WINDOW_SECS));
  }

  #[test]
  fn zero_threshold_rejected() {
    let err = Config::from_lookup(lookup(&[(ENV_ALERT_THRESHOLD, "0")])).unwrap_err();
    assert_eq!(err.field(), Some("alert_threshold"));
  }

  #[test]
  fn partial_json_uses_defaults() {
    let config: Config = serde_json::from_str(r#"{"alert_threshold": 10}"#).unwrap();
    assert_eq!(config.alert_threshold, 10);
    assert_eq!(config.window_secs, 300);
  }
}
