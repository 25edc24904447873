//! Zabbix JSON-RPC shapes and the mapping from problems to inbound alerts.
//!
//! Transport is left to the caller; everything here is plain data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use crate::types::{InboundAlert, Scalar, Severity};

pub const SOURCE: &str = "zabbix";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZabbixHost {
  #[serde(default)]
  pub host: String,
}

/// One entry of a `problem.get` result. Zabbix sends every field as a string.
///
/// `problem.get` carries no host; `hosts` is filled from the problem's
/// trigger (`objectid`) via [`attach_trigger_hosts`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZabbixProblem {
  pub eventid: String,
  #[serde(default)]
  pub objectid: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub severity: String,
  #[serde(default)]
  pub hosts: Vec<ZabbixHost>,
  #[serde(default)]
  pub clock: String,
  #[serde(default)]
  pub value: String,
  #[serde(default)]
  pub acknowledged: String,
  #[serde(default)]
  pub status: String,
}

/// Unknown or missing codes map to information.
pub fn severity_from_code(code: &str) -> Severity {
  code
    .trim()
    .parse::<i64>()
    .ok()
    .and_then(Severity::from_code)
    .unwrap_or(Severity::Information)
}

impl ZabbixProblem {
  /// First non-blank host name, or "" when none is known yet.
  pub fn host_name(&self) -> &str {
    self
      .hosts
      .iter()
      .map(|h| h.host.trim())
      .find(|h| !h.is_empty())
      .unwrap_or("")
  }

  fn clock_secs(&self) -> Option<i64> {
    self.clock.trim().parse().ok()
  }

  /// Inbound alert for this problem. A missing clock falls back to `now`.
  pub fn to_inbound(&self, now: DateTime<Utc>) -> InboundAlert {
    let timestamp = match self.clock_secs() {
      Some(secs) => Scalar::Int(secs),
      None => Scalar::Int(now.timestamp()),
    };

    let mut raw_payload = Map::new();
    raw_payload.insert("eventid".into(), Value::String(self.eventid.clone()));
    raw_payload.insert("objectid".into(), Value::String(self.objectid.clone()));
    raw_payload.insert("acknowledged".into(), Value::String(self.acknowledged.clone()));
    raw_payload.insert("status".into(), Value::String(self.status.clone()));

    InboundAlert {
      source: SOURCE.to_string(),
      external_id: Some(self.eventid.clone()),
      host: self.host_name().to_string(),
      severity: Scalar::Text(severity_from_code(&self.severity).as_str().to_string()),
      message: self.name.clone(),
      timestamp,
      raw_payload,
    }
  }
}

/// Oldest first: by clock, then numeric eventid. Keeps batch correlation reproducible.
pub fn sort_oldest_first(problems: &mut [ZabbixProblem]) {
  problems.sort_by(|a, b| {
    let key = |p: &ZabbixProblem| {
      (
        p.clock_secs().unwrap_or(i64::MAX),
        p.eventid.parse::<u64>().unwrap_or(u64::MAX),
      )
    };
    key(a).cmp(&key(b)).then_with(|| a.eventid.cmp(&b.eventid))
  });
}

/// One entry of a `trigger.get` result with `selectHosts`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZabbixTrigger {
  pub triggerid: String,
  #[serde(default)]
  pub hosts: Vec<ZabbixHost>,
}

/// Trigger ids of problems without a host, deduplicated, first-seen order.
pub fn unresolved_trigger_ids(problems: &[ZabbixProblem]) -> Vec<String> {
  let mut ids: Vec<String> = Vec::new();
  for p in problems {
    let id = p.objectid.trim();
    if p.host_name().is_empty() && !id.is_empty() && !ids.iter().any(|seen| seen == id) {
      ids.push(id.to_string());
    }
  }
  ids
}

/// Copies each trigger's hosts onto the problems it raised (`objectid == triggerid`).
/// Problems that already name a host are left alone.
pub fn attach_trigger_hosts(problems: &mut [ZabbixProblem], triggers: &[ZabbixTrigger]) {
  let by_id: HashMap<&str, &ZabbixTrigger> = triggers
    .iter()
    .map(|t| (t.triggerid.trim(), t))
    .collect();
  for p in problems.iter_mut().filter(|p| p.host_name().is_empty()) {
    if let Some(trigger) = by_id.get(p.objectid.trim()) {
      p.hosts = trigger.hosts.clone();
    }
  }
}

// ---------------------------------------------------------------------------
// JSON-RPC envelopes
// ---------------------------------------------------------------------------

pub fn rpc_request(method: &str, params: Value, auth: Option<&str>, id: u64) -> Value {
  let mut req = json!({
    "jsonrpc": "2.0",
    "method": method,
    "params": params,
    "id": id,
  });
  if let Some(token) = auth {
    req["auth"] = Value::String(token.to_string());
  }
  req
}

pub fn login_request(user: &str, password: &str, id: u64) -> Value {
  rpc_request(
    "user.login",
    json!({ "username": user, "password": password }),
    None,
    id,
  )
}

pub fn problems_request(auth: &str, id: u64) -> Value {
  rpc_request(
    "problem.get",
    json!({
      "output": "extend",
      "selectAcknowledges": "extend",
      "selectTags": "extend",
      "recent": "true",
      "sortfield": ["eventid"],
      "sortorder": "DESC",
    }),
    Some(auth),
    id,
  )
}

pub fn triggers_request(auth: &str, trigger_ids: &[String], id: u64) -> Value {
  rpc_request(
    "trigger.get",
    json!({
      "triggerids": trigger_ids,
      "output": ["triggerid"],
      "selectHosts": ["host"],
    }),
    Some(auth),
    id,
  )
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcError {
  pub code: i64,
  #[serde(default)]
  pub message: String,
  #[serde(default)]
  pub data: String,
}

impl std::fmt::Display for RpcError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "zabbix rpc error {}: {} {}", self.code, self.message, self.data)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse<T> {
  pub result: Option<T>,
  pub error: Option<RpcError>,
}

impl<T> RpcResponse<T> {
  pub fn into_result(self) -> Result<T, RpcError> {
    match (self.result, self.error) {
      (_, Some(err)) => Err(err),
      (Some(result), None) => Ok(result),
      (None, None) => Err(RpcError {
        code: 0,
        message: "empty response".into(),
        data: String::new(),
      }),
    }
  }
}
