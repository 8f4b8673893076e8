//! Greenness accumulation along road geometry.
//!
//! DGVI integrates `(gvi − 1)` over an edge, so a street with no vegetation
//! contributes `−length` and the metric rewards any surplus above the
//! baseline. Bus-ride geometry is deliberately never evaluated here: riders
//! do not perceive streetscape greenness from a moving bus, so only walking
//! and waiting segments accumulate.

use model::{GviMonth, Location, MatchedGviPoint};
use tokio_util::sync::CancellationToken;

use crate::{
    store::{SpatialStore, StoreResult},
    PlanError, PlanResult,
};

/// Integral of `(avg gvi − 1) · length` over one edge from its matched,
/// line-projected GVI samples. An edge with no matched samples scores 0.
///
/// Endpoints are synthesized from the nearest matched value so the
/// integration always spans the full parameter range.
pub fn integrate_edge(length_m: f64, matched: &[MatchedGviPoint]) -> f64 {
    if matched.is_empty() {
        return 0.0;
    }

    let mut points = matched.to_vec();
    points.sort_by(|a, b| a.parameter.total_cmp(&b.parameter));

    if points.first().map(|p| p.parameter) != Some(0.0) {
        let value = points.first().map(|p| p.value).unwrap_or(0.0);
        points.insert(
            0,
            MatchedGviPoint {
                parameter: 0.0,
                value,
            },
        );
    }
    if points.last().map(|p| p.parameter) != Some(1.0) {
        let value = points.last().map(|p| p.value).unwrap_or(0.0);
        points.push(MatchedGviPoint {
            parameter: 1.0,
            value,
        });
    }

    points
        .windows(2)
        .map(|pair| {
            let span = pair[1].parameter - pair[0].parameter;
            let mean = (pair[0].value + pair[1].value) / 2.0;
            span * length_m * (mean - 1.0)
        })
        .sum()
}

/// Contribution of one edge to the waiting buffer around a stop:
/// `length · avg_gvi − length`, with `avg_gvi = 0` when nothing matched.
pub fn waiting_edge_value(length_m: f64, matched: &[MatchedGviPoint]) -> f64 {
    let avg = if matched.is_empty() {
        0.0
    } else {
        matched.iter().map(|p| p.value).sum::<f64>() / matched.len() as f64
    };
    length_m * avg - length_m
}

pub struct DgviEvaluator<'a, S: SpatialStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: SpatialStore + ?Sized> DgviEvaluator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn edge_dgvi(&self, edge_id: i64, month: &GviMonth) -> StoreResult<f64> {
        let Some((_, length_m)) =
            self.store.edge_geometry_and_length(edge_id).await?
        else {
            return Ok(0.0);
        };
        let matched = self
            .store
            .matched_gvi_points_for_edge(edge_id, month)
            .await?;
        Ok(integrate_edge(length_m, &matched))
    }

    /// Sum over a path's edge list. Duplicate ids are counted as often as
    /// they appear. A failing edge contributes 0 and the route survives.
    pub async fn walking_dgvi(&self, edge_ids: &[i64], month: &GviMonth) -> f64 {
        let mut total = 0.0;
        for &edge_id in edge_ids {
            match self.edge_dgvi(edge_id, month).await {
                Ok(value) => total += value,
                Err(why) => {
                    log::warn!("DGVI for edge {edge_id} failed, counting 0: {why}");
                }
            }
        }
        total
    }

    /// Accumulation over all edges inside the circular buffer around a
    /// waiting stop.
    pub async fn waiting_dgvi(
        &self,
        stop: &Location,
        month: &GviMonth,
        radius_m: f64,
    ) -> f64 {
        let edge_ids = match self.store.edges_within(stop, radius_m).await {
            Ok(ids) => ids,
            Err(why) => {
                log::warn!("waiting-DGVI buffer query failed, counting 0: {why}");
                return 0.0;
            }
        };
        let mut total = 0.0;
        for edge_id in edge_ids {
            let value = async {
                let Some((_, length_m)) =
                    self.store.edge_geometry_and_length(edge_id).await?
                else {
                    return Ok(0.0);
                };
                let matched = self
                    .store
                    .matched_gvi_points_for_edge(edge_id, month)
                    .await?;
                StoreResult::Ok(waiting_edge_value(length_m, &matched))
            }
            .await;
            match value {
                Ok(value) => total += value,
                Err(why) => {
                    log::warn!("DGVI for edge {edge_id} failed, counting 0: {why}");
                }
            }
        }
        total
    }

    /// Recomputes the full (road, month) DGVI table in bounded batches and
    /// renormalizes the month afterwards. Idempotent; safe to re-run after
    /// a partial failure.
    pub async fn rebuild_month(
        &self,
        month: &GviMonth,
        batch_size: usize,
        cancel: &CancellationToken,
    ) -> PlanResult<u64> {
        let road_ids = self.store.road_ids().await?;
        let total = road_ids.len();
        let mut written: u64 = 0;

        for (index, chunk) in road_ids.chunks(batch_size.max(1)).enumerate() {
            if cancel.is_cancelled() {
                return Err(PlanError::ResourceExhausted(
                    "DGVI rebuild cancelled".to_owned(),
                ));
            }
            let mut rows = Vec::with_capacity(chunk.len());
            for &road_id in chunk {
                let value = self.edge_dgvi(road_id, month).await?;
                rows.push((road_id, value));
            }
            self.store.upsert_road_dgvi(month, &rows).await?;
            written += rows.len() as u64;
            log::info!(
                "DGVI rebuild {month}: batch {} done ({written}/{total} roads)",
                index + 1
            );
        }

        self.store.normalize_month(month).await?;
        Ok(written)
    }
}
