//! Binary entrypoint for the NOC API.

use alert_correlator::Engine;
use std::sync::Arc;
use tracing::{info, warn};

use noc_api::{logging, Analyzer, AppState, OpenAiAnalyzer, Poller, Settings, ZabbixClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  logging::init_logging();

  let settings = Settings::from_env()?;

  let analyzer = match &settings.llm {
    Some(llm) => {
      info!(model = %llm.model, "analysis enabled");
      Some(Arc::new(OpenAiAnalyzer::new(llm.clone())?) as Arc<dyn Analyzer>)
    }
    None => {
      warn!("OPENAI_API_KEY not set, analyze action disabled");
      None
    }
  };

  let engine = Engine::in_memory(settings.correlation.clone());
  let state = Arc::new(AppState::new(engine, analyzer));

  let poll_task = match &settings.zabbix {
    Some(zbx) => {
      let client = ZabbixClient::new(zbx.clone())?;
      Some(Poller::new(client).spawn(state.clone(), zbx.poll_interval))
    }
    None => {
      info!("ZABBIX_URL not set, poller disabled");
      None
    }
  };

  let app = noc_api::router(state);
  let addr = settings.addr();
  info!(
    window_secs = settings.correlation.window_secs,
    threshold = settings.correlation.alert_threshold,
    "noc-api listening on http://{}",
    addr
  );

  let listener = tokio::net::TcpListener::bind(addr).await?;
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  if let Some(task) = poll_task {
    task.abort();
  }
  info!("noc-api stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
}
