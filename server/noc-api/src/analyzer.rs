//! Root-cause analysis backends.

use alert_correlator::analysis::{self, Analysis, SYSTEM_PROMPT};
use alert_correlator::Alert;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::LlmSettings;
use crate::error::ApiError;

pub const TEMPERATURE: f64 = 0.3;
pub const MAX_TOKENS: u32 = 500;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait Analyzer: Send + Sync {
  /// Summarize the likely root cause of `alerts` (arrival order).
  async fn analyze(&self, alerts: &[Alert]) -> Result<Analysis, ApiError>;
}

/// OpenAI-compatible chat completions client.
pub struct OpenAiAnalyzer {
  http: reqwest::Client,
  settings: LlmSettings,
}

impl OpenAiAnalyzer {
  pub fn new(settings: LlmSettings) -> Result<Self, ApiError> {
    let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    Ok(Self { http, settings })
  }

  fn endpoint(&self) -> String {
    format!("{}/chat/completions", self.settings.base_url)
  }
}

pub fn chat_request(model: &str, prompt: &str) -> Value {
  json!({
    "model": model,
    "messages": [
      { "role": "system", "content": SYSTEM_PROMPT },
      { "role": "user", "content": prompt },
    ],
    "temperature": TEMPERATURE,
    "max_tokens": MAX_TOKENS,
  })
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
  #[serde(default)]
  choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
  message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
  #[serde(default)]
  content: Option<String>,
}

/// Text of the first choice, if any.
fn completion_text(body: ChatCompletion) -> Option<String> {
  body
    .choices
    .into_iter()
    .next()
    .and_then(|c| c.message.content)
    .filter(|s| !s.trim().is_empty())
}

#[async_trait]
impl Analyzer for OpenAiAnalyzer {
  async fn analyze(&self, alerts: &[Alert]) -> Result<Analysis, ApiError> {
    let prompt = analysis::build_prompt(alerts)?;
    debug!(model = %self.settings.model, alerts = alerts.len(), "requesting analysis");

    let resp = self
      .http
      .post(self.endpoint())
      .bearer_auth(&self.settings.api_key)
      .json(&chat_request(&self.settings.model, &prompt))
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      let text = resp.text().await.unwrap_or_default();
      return Err(ApiError::Analysis(format!("{}: {}", status, text.trim())));
    }

    let body: ChatCompletion = resp.json().await?;
    let content = completion_text(body)
      .ok_or_else(|| ApiError::Analysis("empty completion".into()))?;
    Ok(analysis::parse_reply(&content))
  }
}
