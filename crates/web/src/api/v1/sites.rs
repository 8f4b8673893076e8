use axum::{
    extract::{Query, State},
    Json,
};
use model::{Location, NearbySite};
use serde::{Deserialize, Serialize};

use crate::{common::RouteResult, WebState};

#[derive(Debug, Deserialize)]
pub struct NearbySitesQuery {
    pub lat: f64,
    pub lon: f64,
    /// Meters; defaults to the planner's walking radius.
    pub max_distance: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct NearbySitesResponse {
    pub total_sites: usize,
    pub sites: Vec<NearbySite>,
}

pub async fn nearby_sites(
    State(WebState { planner, .. }): State<WebState>,
    Query(params): Query<NearbySitesQuery>,
) -> RouteResult<NearbySitesResponse> {
    let max_distance = params
        .max_distance
        .unwrap_or_else(|| planner.config().max_walking_distance_m());
    let sites = planner
        .nearby_sites(Location::new(params.lat, params.lon), max_distance)
        .await?;
    Ok(Json(NearbySitesResponse {
        total_sites: sites.len(),
        sites,
    }))
}
