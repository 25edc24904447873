//! Route table.

use axum::{
  routing::{get, post},
  Router,
};
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::state::SharedState;

pub fn router(state: SharedState) -> Router {
  Router::new()
    .route("/health", get(handlers::health))
    .route("/alerts", get(handlers::list_alerts).post(handlers::ingest_alerts))
    .route("/alerts/:id", get(handlers::get_alert))
    .route("/incidents", get(handlers::list_incidents))
    .route("/incidents/:id", get(handlers::get_incident))
    .route("/incidents/:id/analyze", post(handlers::analyze_incident))
    .route("/incidents/:id/close", post(handlers::close_incident))
    .route("/stats", get(handlers::stats))
    .layer(CorsLayer::permissive())
    .with_state(state)
}
