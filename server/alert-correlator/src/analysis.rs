//! Prompt construction and reply parsing for LLM root-cause analysis.
//!
//! The HTTP call itself lives with the API service; this module only shapes
//! text in and out so the rules stay testable without a network.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;
use crate::types::Alert;

pub const SYSTEM_PROMPT: &str =
  "You are a senior NOC engineer analyzing system alerts. Always respond with valid JSON.";

/// Confidence assumed when the model omits it or the reply is not JSON.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
  pub root_cause: String,
  pub confidence: f64,
  pub reasoning: String,
}

/// One line per alert: `- SEVERITY: message (at timestamp)`.
pub fn alert_lines(alerts: &[Alert]) -> String {
  alerts
    .iter()
    .map(|a| {
      format!(
        "- {}: {} (at {})",
        a.severity.as_str().to_ascii_uppercase(),
        a.message,
        a.timestamp.to_rfc3339()
      )
    })
    .collect::<Vec<_>>()
    .join("\n")
}

pub fn build_prompt(alerts: &[Alert]) -> Result<String, EngineError> {
  if alerts.is_empty() {
    return Err(EngineError::invalid_state("no alerts provided for analysis"));
  }
  Ok(format!(
    "You are a senior NOC engineer.\n\
     Given these alerts:\n\
     {}\n\n\
     Suggest the most probable root cause in 5 concise sentences.\n\
     Focus on the most likely technical issue causing these alerts.\n\
     Be specific and actionable.\n\n\
     Respond with JSON format:\n\
     {{\"root_cause\": \"...\", \"confidence\": 0.8, \"reasoning\": \"...\"}}",
    alert_lines(alerts)
  ))
}

/// Parse a model reply. Non-JSON replies become the root cause verbatim.
pub fn parse_reply(content: &str) -> Analysis {
  let body = strip_code_fence(content.trim());
  match serde_json::from_str::<Value>(body) {
    Ok(Value::Object(map)) => {
      let text = |key: &str, fallback: &str| {
        map
          .get(key)
          .and_then(Value::as_str)
          .map(str::trim)
          .filter(|s| !s.is_empty())
          .unwrap_or(fallback)
          .to_string()
      };
      let confidence = match map.get("confidence") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(DEFAULT_CONFIDENCE),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(DEFAULT_CONFIDENCE),
        _ => DEFAULT_CONFIDENCE,
      };
      Analysis {
        root_cause: text("root_cause", "Unable to determine root cause"),
        confidence: clamp_confidence(confidence),
        reasoning: text("reasoning", "No reasoning provided"),
      }
    }
    _ => Analysis {
      root_cause: content.trim().to_string(),
      confidence: DEFAULT_CONFIDENCE,
      reasoning: "LLM response could not be parsed as JSON".to_string(),
    },
  }
}

fn clamp_confidence(c: f64) -> f64 {
  if c.is_finite() {
    c.clamp(0.0, 1.0)
  } else {
    DEFAULT_CONFIDENCE
  }
}

// Models often wrap JSON in ```json fences.
fn strip_code_fence(s: &str) -> &str {
  let Some(rest) = s.strip_prefix("```") else {
    return s;
  };
  let rest = rest.strip_prefix("json").unwrap_or(rest);
  rest.strip_suffix("```").unwrap_or(rest).trim()
}
