//! Router-level tests: requests go through the full axum stack in memory.

use alert_correlator::analysis::Analysis;
use alert_correlator::zabbix::{ZabbixHost, ZabbixProblem, ZabbixTrigger};
use alert_correlator::{Alert, Config, Engine};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use noc_api::{router, Analyzer, ApiError, AppState, Poller, ProblemSource, SharedState};

struct FixedAnalyzer;

#[async_trait]
impl Analyzer for FixedAnalyzer {
  async fn analyze(&self, alerts: &[Alert]) -> Result<Analysis, ApiError> {
    Ok(Analysis {
      root_cause: format!("{} saturated", alerts[0].host),
      confidence: 0.9,
      reasoning: format!("{} related alerts", alerts.len()),
    })
  }
}

struct FailingAnalyzer;

#[async_trait]
impl Analyzer for FailingAnalyzer {
  async fn analyze(&self, _alerts: &[Alert]) -> Result<Analysis, ApiError> {
    Err(ApiError::Analysis("upstream timeout".into()))
  }
}

/// Serves `problem.get` in the shape Zabbix returns it: no host fields.
struct FakeZabbix {
  problems: Vec<ZabbixProblem>,
  triggers: Vec<ZabbixTrigger>,
}

#[async_trait]
impl ProblemSource for FakeZabbix {
  async fn problems(&mut self) -> Result<Vec<ZabbixProblem>, ApiError> {
    Ok(self.problems.clone())
  }

  async fn trigger_hosts(&mut self, trigger_ids: &[String]) -> Result<Vec<ZabbixTrigger>, ApiError> {
    Ok(
      self
        .triggers
        .iter()
        .filter(|t| trigger_ids.contains(&t.triggerid))
        .cloned()
        .collect(),
    )
  }
}

fn fake_zabbix(problems_json: &str) -> FakeZabbix {
  FakeZabbix {
    problems: serde_json::from_str(problems_json).unwrap(),
    triggers: vec![ZabbixTrigger {
      triggerid: "13491".into(),
      hosts: vec![ZabbixHost {
        host: "web-01".into(),
      }],
    }],
  }
}

fn low_threshold() -> Config {
  Config {
    window_secs: 300,
    alert_threshold: 1,
  }
}

fn setup(config: Config, analyzer: Option<Arc<dyn Analyzer>>) -> (Router, SharedState) {
  let state = Arc::new(AppState::new(Engine::in_memory(config), analyzer));
  (router(state.clone()), state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  send_raw(app, method, uri, body.map(|v| v.to_string())).await
}

async fn send_raw(app: &Router, method: Method, uri: &str, body: Option<String>) -> (StatusCode, Value) {
  let builder = Request::builder().method(method).uri(uri);
  let req = match body {
    Some(text) => builder
      .header("content-type", "application/json")
      .body(Body::from(text))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };
  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  if !status.is_success() {
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("application/json"), "{} -> {}", uri, content_type);
  }
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let json = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, json)
}

fn alert(host: &str, minute: u32) -> Value {
  json!({
    "host": host,
    "severity": "high",
    "message": "CPU utilization above 95%",
    "timestamp": format!("2025-03-01T12:{:02}:00Z", minute),
  })
}

/// Two alerts on one host with threshold 1: returns the opened incident id.
async fn open_incident(app: &Router, host: &str) -> String {
  send(app, Method::POST, "/alerts", Some(alert(host, 0))).await;
  let (status, body) = send(app, Method::POST, "/alerts", Some(alert(host, 1))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["outcome"], "opened");
  body["incident_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_version() {
  let (app, _) = setup(Config::default(), None);
  let (status, body) = send(&app, Method::GET, "/health", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "healthy");
  assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn single_alert_is_pending_and_retrievable() {
  let (app, _) = setup(Config::default(), None);
  let (status, body) = send(&app, Method::POST, "/alerts", Some(alert("web-01", 0))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["outcome"], "pending");

  let id = body["alert_id"].as_str().unwrap();
  let (status, alert) = send(&app, Method::GET, &format!("/alerts/{}", id), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(alert["host"], "web-01");
  assert_eq!(alert["severity"], "high");
  assert_eq!(alert["incident_id"], Value::Null);
}

#[tokio::test]
async fn empty_host_is_rejected_with_field() {
  let (app, _) = setup(Config::default(), None);
  let (status, body) = send(&app, Method::POST, "/alerts", Some(alert("  ", 0))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], true);
  assert_eq!(body["field"], "host");
}

#[tokio::test]
async fn batch_reports_each_record() {
  let (app, _) = setup(Config::default(), None);
  let batch = json!([
    alert("web-01", 0),
    { "severity": "high", "message": "no host", "timestamp": 0 },
    alert("web-01", 1),
  ]);
  let (status, body) = send(&app, Method::POST, "/alerts", Some(batch)).await;
  assert_eq!(status, StatusCode::OK);
  let items = body.as_array().unwrap();
  assert_eq!(items.len(), 3);
  assert_eq!(items[0]["outcome"], "pending");
  assert_eq!(items[1]["error"], true);
  assert!(items[1]["message"].as_str().unwrap().contains("host"));
  assert_eq!(items[2]["outcome"], "pending");

  let (_, alerts) = send(&app, Method::GET, "/alerts?host=web-01", None).await;
  assert_eq!(alerts["total"], 2);
}

#[tokio::test]
async fn incident_lifecycle_over_http() {
  let (app, _) = setup(low_threshold(), None);
  let id = open_incident(&app, "web-01").await;

  let (status, list) = send(&app, Method::GET, "/incidents?status=open", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(list["total"], 1);
  assert_eq!(list["items"][0]["id"], id.as_str());

  let (status, detail) = send(&app, Method::GET, &format!("/incidents/{}", id), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(detail["status"], "open");
  assert_eq!(detail["alerts"].as_array().unwrap().len(), 2);
  assert_eq!(detail["recommended_first_actions"][0], "Follow runbook: High CPU Usage");

  let (status, closed) = send(&app, Method::POST, &format!("/incidents/{}/close", id), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(closed["message"], "Incident closed successfully");
  assert_eq!(closed["incident"]["status"], "closed");

  let (status, again) = send(&app, Method::POST, &format!("/incidents/{}/close", id), None).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(again["error"], true);

  let (_, open) = send(&app, Method::GET, "/incidents?status=open", None).await;
  assert_eq!(open["total"], 0);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
  let (app, _) = setup(Config::default(), Some(Arc::new(FixedAnalyzer)));
  for (method, uri) in [
    (Method::GET, "/alerts/alt-missing"),
    (Method::GET, "/incidents/inc-missing"),
    (Method::POST, "/incidents/inc-missing/close"),
    (Method::POST, "/incidents/inc-missing/analyze"),
  ] {
    let (status, body) = send(&app, method, uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
    assert!(body["message"].as_str().unwrap().contains("not found"));
  }
}

#[tokio::test]
async fn analyze_without_backend_is_unavailable() {
  let (app, _) = setup(low_threshold(), None);
  let id = open_incident(&app, "web-01").await;
  let (status, body) = send(&app, Method::POST, &format!("/incidents/{}/analyze", id), None).await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  assert_eq!(body["error"], true);
}

#[tokio::test]
async fn analyze_records_root_cause() {
  let (app, _) = setup(low_threshold(), Some(Arc::new(FixedAnalyzer)));
  let id = open_incident(&app, "db-02").await;

  let (status, body) = send(&app, Method::POST, &format!("/incidents/{}/analyze", id), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["root_cause"], "db-02 saturated");
  assert_eq!(body["confidence"], 0.9);

  let (_, detail) = send(&app, Method::GET, &format!("/incidents/{}", id), None).await;
  assert_eq!(detail["root_cause_summary"], "db-02 saturated");
  assert_eq!(detail["llm_explanation"], "2 related alerts");
}

#[tokio::test]
async fn analyzer_failure_is_bad_gateway_and_leaves_incident_unchanged() {
  let (app, _) = setup(low_threshold(), Some(Arc::new(FailingAnalyzer)));
  let id = open_incident(&app, "web-01").await;

  let (status, _) = send(&app, Method::POST, &format!("/incidents/{}/analyze", id), None).await;
  assert_eq!(status, StatusCode::BAD_GATEWAY);

  let (_, detail) = send(&app, Method::GET, &format!("/incidents/{}", id), None).await;
  assert_eq!(detail["root_cause_summary"], Value::Null);
}

#[tokio::test]
async fn stats_reflect_correlation() {
  let (app, _) = setup(low_threshold(), None);
  open_incident(&app, "web-01").await;
  send(&app, Method::POST, "/alerts", Some(alert("db-02", 5))).await;

  let (status, stats) = send(&app, Method::GET, "/stats", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(stats["total_alerts"], 3);
  assert_eq!(stats["correlated_alerts"], 2);
  assert_eq!(stats["open_incidents"], 1);
  assert_eq!(stats["correlation_rate"], 66.67);
}

#[tokio::test]
async fn malformed_body_gets_json_error() {
  let (app, _) = setup(Config::default(), None);
  let (status, body) = send_raw(&app, Method::POST, "/alerts", Some("{not json".into())).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], true);
  assert!(!body["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn bad_query_gets_json_error() {
  let (app, _) = setup(Config::default(), None);
  let (status, body) = send(&app, Method::GET, "/alerts?severity=loud", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], true);
  assert!(body["message"].as_str().unwrap().contains("loud"));

  let (status, body) = send(&app, Method::GET, "/incidents?status=maybe", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], true);
}

const PROBLEM_GET_RESULT: &str = r#"[
  {"eventid":"1002","source":"0","object":"0","objectid":"13491","clock":"1740830460","ns":"0","r_eventid":"0","name":"Free disk space is less than 10% on /var","severity":"4","acknowledged":"0","suppressed":"0"},
  {"eventid":"1001","source":"0","object":"0","objectid":"13491","clock":"1740830400","ns":"0","r_eventid":"0","name":"Free disk space is less than 10% on /var","severity":"4","acknowledged":"0","suppressed":"0"}
]"#;

#[tokio::test]
async fn poller_resolves_hosts_through_triggers() {
  let (app, state) = setup(low_threshold(), None);
  let mut poller = Poller::new(fake_zabbix(PROBLEM_GET_RESULT));

  let first = poller.poll_once(&state).await.unwrap();
  assert_eq!(first.fetched, 2);
  assert_eq!(first.ingested, 2);
  assert_eq!(first.rejected, 0);
  assert_eq!(first.opened, 1);

  let second = poller.poll_once(&state).await.unwrap();
  assert_eq!(second.ingested, 0);
  assert_eq!(second.duplicates, 2);

  let (_, alerts) = send(&app, Method::GET, "/alerts?host=web-01", None).await;
  assert_eq!(alerts["total"], 2);
  // Listing is newest first.
  assert_eq!(alerts["items"][1]["external_id"], "1001");
  assert_eq!(alerts["items"][0]["source"], "zabbix");
}

#[tokio::test]
async fn unresolvable_problem_is_rejected_once() {
  let (_, state) = setup(Config::default(), None);
  let mut source = fake_zabbix(
    r#"[{"eventid":"2001","objectid":"77777","clock":"1740830400","name":"Orphaned trigger","severity":"3"}]"#,
  );
  source.triggers.clear();
  let mut poller = Poller::new(source);

  let first = poller.poll_once(&state).await.unwrap();
  assert_eq!(first.rejected, 1);
  assert_eq!(first.ingested, 0);

  let second = poller.poll_once(&state).await.unwrap();
  assert_eq!(second.rejected, 0);
  assert_eq!(second.skipped, 1);
  assert_eq!(state.engine.lock().await.stats().unwrap().total_alerts, 0);
}
