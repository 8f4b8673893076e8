//! Greenness data endpoints: month listing, per-month statistics and point
//! layers, the DGVI rebuild trigger, and point ingestion through the
//! external scoring service.

use axum::{
    extract::{Path, State},
    Json,
};
use model::{DgviStats, GviMonth, GviPoint, Location};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{
    common::{RouteErrorResponse, RouteResult},
    WebState,
};

fn parse_month(raw: &str) -> Result<GviMonth, RouteErrorResponse> {
    GviMonth::parse(raw).map_err(|why| RouteErrorResponse::bad_request(why.to_string()))
}

#[derive(Debug, Serialize)]
pub struct MonthsResponse {
    pub months: Vec<String>,
    pub recommended: Option<String>,
}

pub async fn available_months(
    State(WebState { planner, .. }): State<WebState>,
) -> RouteResult<MonthsResponse> {
    let months = planner.available_months().await?;
    Ok(Json(MonthsResponse {
        recommended: months.first().map(GviMonth::to_string),
        months: months.iter().map(GviMonth::to_string).collect(),
    }))
}

pub async fn dgvi_stats(
    State(WebState { planner, .. }): State<WebState>,
    Path(month): Path<String>,
) -> RouteResult<DgviStats> {
    let month = parse_month(&month)?;
    let stats = planner.dgvi_stats(&month).await?;
    Ok(Json(stats))
}

#[derive(Debug, Serialize)]
pub struct GviPointsResponse {
    pub month: String,
    pub total_points: usize,
    pub points: Vec<GviPoint>,
}

pub async fn gvi_points(
    State(WebState { planner, .. }): State<WebState>,
    Path(month): Path<String>,
) -> RouteResult<GviPointsResponse> {
    let month = parse_month(&month)?;
    let points = planner.gvi_points(&month).await?;
    Ok(Json(GviPointsResponse {
        month: month.to_string(),
        total_points: points.len(),
        points,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateDgviBody {
    pub month: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateDgviResponse {
    pub month: String,
    pub roads_updated: u64,
}

pub async fn update_dgvi(
    State(WebState { planner, .. }): State<WebState>,
    Json(body): Json<UpdateDgviBody>,
) -> RouteResult<UpdateDgviResponse> {
    let month = parse_month(&body.month)?;
    let roads_updated = planner
        .update_dgvi(&month, &CancellationToken::new())
        .await?;
    Ok(Json(UpdateDgviResponse {
        month: month.to_string(),
        roads_updated,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AddGviPointsBody {
    pub month: String,
    pub points: Vec<super::routes::ApiPoint>,
}

#[derive(Debug, Serialize)]
pub struct AddGviPointsResponse {
    pub month: String,
    pub inserted: u64,
}

pub async fn add_gvi_points(
    State(WebState {
        planner, greenness, ..
    }): State<WebState>,
    Json(body): Json<AddGviPointsBody>,
) -> RouteResult<AddGviPointsResponse> {
    let month = parse_month(&body.month)?;
    if body.points.is_empty() {
        return Err(RouteErrorResponse::bad_request("no points submitted"));
    }
    if body.points.len() > gvi_service::MAX_POINTS_PER_CALL {
        return Err(RouteErrorResponse::bad_request(format!(
            "at most {} points per call",
            gvi_service::MAX_POINTS_PER_CALL
        )));
    }

    let locations: Vec<Location> = body
        .points
        .iter()
        .map(|point| Location::new(point.lat, point.lon))
        .collect();

    let values = greenness.score_points(&locations).await.map_err(|why| {
        RouteErrorResponse::from(planner::PlanError::TransientUpstream(
            why.to_string(),
        ))
    })?;

    let points: Vec<GviPoint> = locations
        .into_iter()
        .zip(values)
        .map(|(location, value)| GviPoint {
            // Ids are assigned by the store on insert.
            id: 0,
            location,
            month: month.clone(),
            value,
        })
        .collect();

    let inserted = planner.add_gvi_points(&points).await?;
    Ok(Json(AddGviPointsResponse {
        month: month.to_string(),
        inserted,
    }))
}
