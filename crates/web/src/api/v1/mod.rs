use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::{common::route_not_found, WebState};

pub mod gvi;
pub mod routes;
pub mod sites;

pub fn routes(state: WebState) -> Router {
    Router::new()
        .route("/plan-routes", post(routes::plan_routes))
        .route("/available-months", get(gvi::available_months))
        .route("/dgvi-stats/:month", get(gvi::dgvi_stats))
        .route("/gvi-points/:month", get(gvi::gvi_points))
        .route("/nearby-sites", get(sites::nearby_sites))
        .route("/update-dgvi", post(gvi::update_dgvi))
        .route("/add-gvi-points", post(gvi::add_gvi_points))
        .route("/health", get(health))
        .with_state(state)
        .fallback(route_not_found)
}

async fn health(
    State(WebState { store, .. }): State<WebState>,
) -> (StatusCode, Json<serde_json::Value>) {
    match store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "database": "reachable" })),
        ),
        Err(why) => {
            log::error!("health probe failed: {why}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "database": "unreachable" })),
            )
        }
    }
}
