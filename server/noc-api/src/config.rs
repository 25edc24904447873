//! Service settings read from the environment.

use alert_correlator::Config;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::ApiError;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_POLL_SECS: u64 = 60;
pub const DEFAULT_LLM_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, PartialEq)]
pub struct ZabbixSettings {
  /// JSON-RPC endpoint, e.g. `https://zabbix.example.com/api_jsonrpc.php`.
  pub url: String,
  pub user: String,
  pub password: String,
  pub poll_interval: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
  pub api_key: String,
  pub model: String,
  pub base_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
  pub host: IpAddr,
  pub port: u16,
  pub correlation: Config,
  /// Poller is disabled when `ZABBIX_URL` is unset.
  pub zabbix: Option<ZabbixSettings>,
  /// Analyze action is disabled when `OPENAI_API_KEY` is unset.
  pub llm: Option<LlmSettings>,
}

impl Settings {
  pub fn from_env() -> Result<Self, ApiError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
    let get = |key: &str| {
      lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
    };

    let host = match get("HOST") {
      Some(v) => v
        .parse()
        .map_err(|_| ApiError::config("HOST", "expected an IP address"))?,
      None => IpAddr::V4(Ipv4Addr::LOCALHOST),
    };
    let port = match get("PORT") {
      Some(v) => v
        .parse()
        .map_err(|_| ApiError::config("PORT", "must be a valid u16"))?,
      None => DEFAULT_PORT,
    };

    let correlation = Config::from_lookup(&lookup)?;

    let zabbix = match get("ZABBIX_URL") {
      Some(url) => {
        let user = get("ZABBIX_USER")
          .ok_or_else(|| ApiError::config("ZABBIX_USER", "required when ZABBIX_URL is set"))?;
        let password = get("ZABBIX_PASSWORD")
          .ok_or_else(|| ApiError::config("ZABBIX_PASSWORD", "required when ZABBIX_URL is set"))?;
        let secs = match get("ZABBIX_POLL_SECS") {
          Some(v) => v
            .parse::<u64>()
            .ok()
            .filter(|s| *s > 0)
            .ok_or_else(|| ApiError::config("ZABBIX_POLL_SECS", "expected positive seconds"))?,
          None => DEFAULT_POLL_SECS,
        };
        Some(ZabbixSettings {
          url,
          user,
          password,
          poll_interval: Duration::from_secs(secs),
        })
      }
      None => None,
    };

    let llm = get("OPENAI_API_KEY").map(|api_key| LlmSettings {
      api_key,
      model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.into()),
      base_url: get("LLM_BASE_URL")
        .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.into())
        .trim_end_matches('/')
        .to_string(),
    });

    Ok(Self {
      host,
      port,
      correlation,
      zabbix,
      llm,
    })
  }

  pub fn addr(&self) -> SocketAddr {
    SocketAddr::new(self.host, self.port)
  }
}
