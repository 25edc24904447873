//! Zabbix client and the background poll loop.

use alert_correlator::zabbix::{self, RpcError, RpcResponse, ZabbixProblem, ZabbixTrigger};
use alert_correlator::{InboundAlert, Outcome};
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::analyzer::REQUEST_TIMEOUT;
use crate::config::ZabbixSettings;
use crate::error::ApiError;
use crate::state::AppState;

/// Read access to a Zabbix server.
#[async_trait]
pub trait ProblemSource: Send {
  /// Current problems (`problem.get`). These carry no host name.
  async fn problems(&mut self) -> Result<Vec<ZabbixProblem>, ApiError>;

  /// Hosts of the given triggers (`trigger.get` with `selectHosts`).
  async fn trigger_hosts(&mut self, trigger_ids: &[String]) -> Result<Vec<ZabbixTrigger>, ApiError>;
}

pub struct ZabbixClient {
  http: reqwest::Client,
  settings: ZabbixSettings,
  auth: Option<String>,
  request_id: u64,
}

impl ZabbixClient {
  pub fn new(settings: ZabbixSettings) -> Result<Self, ApiError> {
    let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    Ok(Self {
      http,
      settings,
      auth: None,
      request_id: 0,
    })
  }

  fn next_id(&mut self) -> u64 {
    self.request_id += 1;
    self.request_id
  }

  async fn call<T: DeserializeOwned>(&self, body: &Value) -> Result<Result<T, RpcError>, ApiError> {
    let reply: RpcResponse<T> = self
      .http
      .post(&self.settings.url)
      .json(body)
      .send()
      .await?
      .error_for_status()?
      .json()
      .await?;
    Ok(reply.into_result())
  }

  async fn login(&mut self) -> Result<String, ApiError> {
    let id = self.next_id();
    let req = zabbix::login_request(&self.settings.user, &self.settings.password, id);
    let token: String = self
      .call(&req)
      .await?
      .map_err(|e| ApiError::Zabbix(format!("login failed: {}", e)))?;
    info!(url = %self.settings.url, "authenticated with zabbix");
    self.auth = Some(token.clone());
    Ok(token)
  }

  /// Authenticated call. On an RPC error the session may have expired:
  /// log in again and retry once.
  async fn authed<T, F>(&mut self, method: &str, build: F) -> Result<T, ApiError>
  where
    T: DeserializeOwned,
    F: Fn(&str, u64) -> Value + Send + Sync,
  {
    let token = match self.auth.clone() {
      Some(token) => token,
      None => self.login().await?,
    };
    let id = self.next_id();
    match self.call::<T>(&build(&token, id)).await? {
      Ok(result) => Ok(result),
      Err(rpc) => {
        warn!(method, error = %rpc, "zabbix call failed, re-authenticating");
        self.auth = None;
        let token = self.login().await?;
        let id = self.next_id();
        self
          .call::<T>(&build(&token, id))
          .await?
          .map_err(|e| ApiError::Zabbix(e.to_string()))
      }
    }
  }
}

#[async_trait]
impl ProblemSource for ZabbixClient {
  async fn problems(&mut self) -> Result<Vec<ZabbixProblem>, ApiError> {
    self.authed("problem.get", zabbix::problems_request).await
  }

  async fn trigger_hosts(&mut self, trigger_ids: &[String]) -> Result<Vec<ZabbixTrigger>, ApiError> {
    self
      .authed("trigger.get", |auth, id| zabbix::triggers_request(auth, trigger_ids, id))
      .await
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
  pub fetched: usize,
  pub ingested: usize,
  pub duplicates: usize,
  pub opened: usize,
  pub rejected: usize,
  /// Previously rejected problems, not retried.
  pub skipped: usize,
}

/// Feeds a [`ProblemSource`] into the engine. Remembers rejected event ids
/// so a bad problem is reported once, not on every poll.
pub struct Poller<P> {
  source: P,
  rejected: HashSet<String>,
}

impl<P: ProblemSource> Poller<P> {
  pub fn new(source: P) -> Self {
    Self {
      source,
      rejected: HashSet::new(),
    }
  }

  /// Fetch once, resolve hosts through the problems' triggers, and feed the
  /// problems oldest first through the engine.
  pub async fn poll_once(&mut self, state: &AppState) -> Result<PollSummary, ApiError> {
    let mut problems = self.source.problems().await?;
    let fetched = problems.len();
    problems.retain(|p| !self.rejected.contains(&p.eventid));
    let mut summary = PollSummary {
      fetched,
      skipped: fetched - problems.len(),
      ..PollSummary::default()
    };

    let trigger_ids = zabbix::unresolved_trigger_ids(&problems);
    if !trigger_ids.is_empty() {
      let triggers = self.source.trigger_hosts(&trigger_ids).await?;
      zabbix::attach_trigger_hosts(&mut problems, &triggers);
    }
    zabbix::sort_oldest_first(&mut problems);

    let now = Utc::now();
    let inbound: Vec<InboundAlert> = problems.iter().map(|p| p.to_inbound(now)).collect();
    let results = state.engine.lock().await.ingest_batch(&inbound);

    for (problem, result) in problems.iter().zip(results) {
      match result {
        Ok(Outcome::Duplicate { .. }) => summary.duplicates += 1,
        Ok(Outcome::Opened { .. }) => {
          summary.ingested += 1;
          summary.opened += 1;
        }
        Ok(_) => summary.ingested += 1,
        Err(e) => {
          summary.rejected += 1;
          warn!(eventid = %problem.eventid, error = %e, "zabbix problem rejected");
          self.rejected.insert(problem.eventid.clone());
        }
      }
    }
    Ok(summary)
  }
}

impl<P: ProblemSource + 'static> Poller<P> {
  pub fn spawn(mut self, state: Arc<AppState>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(every);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
      info!(every_secs = every.as_secs(), "zabbix poller started");
      loop {
        ticker.tick().await;
        match self.poll_once(&state).await {
          Ok(s) if s.ingested > 0 || s.rejected > 0 => info!(
            fetched = s.fetched,
            ingested = s.ingested,
            opened = s.opened,
            rejected = s.rejected,
            "zabbix poll"
          ),
          Ok(s) => debug!(fetched = s.fetched, duplicates = s.duplicates, "zabbix poll, nothing new"),
          Err(e) => warn!(error = %e, "zabbix poll failed"),
        }
      }
    })
  }
}
