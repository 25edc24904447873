//! HTTP handlers for the NOC API.

use alert_correlator::types::ErrorOutput;
use alert_correlator::{
  Alert, AlertFilter, AlertId, CorrelationStats, IncidentDetail, IncidentFilter, IncidentId, Page,
};
use axum::{
  extract::{
    rejection::{JsonRejection, QueryRejection},
    Path, Query, State,
  },
  response::{IntoResponse, Response},
  Json,
};
use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::SharedState;
use crate::types::{decode_alert, AlertBatch, AnalyzeResponse, BatchItem, CloseResponse, Health};

pub async fn health() -> Json<Health> {
  Json(Health {
    status: "healthy",
    version: env!("CARGO_PKG_VERSION"),
  })
}

pub async fn ingest_alerts(
  State(state): State<SharedState>,
  body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
  let Json(body) = body?;
  let mut engine = state.engine.lock().await;
  match AlertBatch::from(body) {
    AlertBatch::One(value) => {
      let raw = decode_alert(value)?;
      Ok(Json(engine.ingest(&raw)?).into_response())
    }
    AlertBatch::Many(values) => {
      let items: Vec<BatchItem> = values
        .into_iter()
        .map(|value| decode_alert(value).and_then(|raw| engine.ingest(&raw)))
        .map(|result| match result {
          Ok(outcome) => BatchItem::Ok(outcome),
          Err(e) => {
            warn!(error = %e, "alert rejected");
            BatchItem::Err(ErrorOutput::from(&e))
          }
        })
        .collect();
      Ok(Json(items).into_response())
    }
  }
}

pub async fn list_alerts(
  State(state): State<SharedState>,
  filter: Result<Query<AlertFilter>, QueryRejection>,
) -> Result<Json<Page<Alert>>, ApiError> {
  let Query(filter) = filter?;
  Ok(Json(state.engine.lock().await.alerts(&filter)?))
}

pub async fn get_alert(
  State(state): State<SharedState>,
  Path(id): Path<String>,
) -> Result<Json<Alert>, ApiError> {
  Ok(Json(state.engine.lock().await.alert(&AlertId(id))?))
}

pub async fn list_incidents(
  State(state): State<SharedState>,
  filter: Result<Query<IncidentFilter>, QueryRejection>,
) -> Result<Json<Page<IncidentDetail>>, ApiError> {
  let Query(filter) = filter?;
  Ok(Json(state.engine.lock().await.incidents(&filter)?))
}

pub async fn get_incident(
  State(state): State<SharedState>,
  Path(id): Path<String>,
) -> Result<Json<IncidentDetail>, ApiError> {
  Ok(Json(state.engine.lock().await.incident(&IncidentId(id))?))
}

/// The engine lock is released while the analyzer runs.
pub async fn analyze_incident(
  State(state): State<SharedState>,
  Path(id): Path<String>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
  let id = IncidentId(id);
  let alerts = state.engine.lock().await.analysis_input(&id)?;
  let analyzer = state.analyzer.clone().ok_or(ApiError::AnalysisUnavailable)?;

  let analysis = analyzer.analyze(&alerts).await?;
  let incident = state
    .engine
    .lock()
    .await
    .record_analysis(&id, &analysis, Utc::now())?;

  Ok(Json(AnalyzeResponse {
    message: "Analysis completed",
    root_cause: analysis.root_cause,
    confidence: analysis.confidence,
    incident,
  }))
}

pub async fn close_incident(
  State(state): State<SharedState>,
  Path(id): Path<String>,
) -> Result<Json<CloseResponse>, ApiError> {
  let incident = state
    .engine
    .lock()
    .await
    .close(&IncidentId(id), Utc::now())?;
  info!(incident = %incident.id, "closed via api");
  Ok(Json(CloseResponse {
    message: "Incident closed successfully",
    incident,
  }))
}

pub async fn stats(State(state): State<SharedState>) -> Result<Json<CorrelationStats>, ApiError> {
  Ok(Json(state.engine.lock().await.stats()?))
}
