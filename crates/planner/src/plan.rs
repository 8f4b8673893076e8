//! Top-level request orchestration: walking and bus branches, category
//! scoring, and the admin/read operations behind the HTTP surface.

use std::sync::Arc;

use chrono::Local;
use itertools::Itertools;
use model::{
    DgviStats, GviMonth, GviPoint, Location, NearbySite, Preferences, RoutePlan,
    Segment,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{
    config::PlannerConfig,
    dgvi::DgviEvaluator,
    feed::{batch_departures, DepartureFeed},
    scoring,
    store::SpatialStore,
    transfer, transit, walking, PlanError, PlanResult,
};

/// Winners kept per category (walking vs bus) after scoring.
const RESULTS_PER_CATEGORY: usize = 2;

fn default_max_results() -> usize {
    4
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub origin: Location,
    pub destination: Location,
    /// Defaults to the most recent month with DGVI data.
    #[serde(default)]
    pub month: Option<GviMonth>,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOutcome {
    pub month: GviMonth,
    pub routes: Vec<RoutePlan>,
}

pub struct Planner<S, F> {
    store: Arc<S>,
    feed: Arc<F>,
    config: PlannerConfig,
}

impl<S, F> Clone for Planner<S, F> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            feed: self.feed.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S, F> Planner<S, F>
where
    S: SpatialStore,
    F: DepartureFeed,
{
    pub fn new(store: Arc<S>, feed: Arc<F>, config: PlannerConfig) -> Self {
        Self {
            store,
            feed,
            config,
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plans up to `max_results` routes. Candidate failures degrade the
    /// result set; only request-level problems surface as errors. An empty
    /// result list is a successful outcome.
    pub async fn plan_routes(
        &self,
        request: PlanRequest,
        cancel: CancellationToken,
    ) -> PlanResult<PlanOutcome> {
        if !request.origin.is_valid() || !request.destination.is_valid() {
            return Err(PlanError::InvalidInput(
                "coordinates out of range".to_owned(),
            ));
        }
        if !request.preferences.is_valid() {
            return Err(PlanError::InvalidInput(
                "preference weights must be non-negative and sum to 1".to_owned(),
            ));
        }

        let month = self.resolve_month(request.month.clone()).await?;

        tokio::time::timeout(
            self.config.request_deadline,
            self.plan_inner(&request, month, cancel),
        )
        .await
        .map_err(|_| {
            PlanError::ResourceExhausted("planning deadline exceeded".to_owned())
        })?
    }

    async fn plan_inner(
        &self,
        request: &PlanRequest,
        month: GviMonth,
        cancel: CancellationToken,
    ) -> PlanResult<PlanOutcome> {
        let now = Local::now();

        let (walking_routes, bus_routes) = tokio::join!(
            self.walking_branch(request, &month),
            self.bus_branch(request, &month, now, &cancel),
        );

        // Partial results are discarded when the caller gave up.
        if cancel.is_cancelled() {
            return Err(PlanError::ResourceExhausted(
                "request cancelled".to_owned(),
            ));
        }

        let mut routes = walking_routes;
        routes.extend(bus_routes);
        routes.truncate(request.max_results);

        crate::enrich::enrich_routes(&*self.store, &self.config, &mut routes).await;

        log::info!(
            "planned {} routes ({} walking, {} bus) for month {month}",
            routes.len(),
            routes
                .iter()
                .filter(|r| r.route_type == model::RouteType::Walking)
                .count(),
            routes
                .iter()
                .filter(|r| r.route_type != model::RouteType::Walking)
                .count(),
        );
        Ok(PlanOutcome { month, routes })
    }

    async fn walking_branch(
        &self,
        request: &PlanRequest,
        month: &GviMonth,
    ) -> Vec<RoutePlan> {
        let mut candidates = walking::walking_candidates(
            &*self.store,
            &self.config,
            request.origin,
            request.destination,
            request.preferences,
            month,
        )
        .await;

        let evaluator = DgviEvaluator::new(&*self.store);
        for route in candidates.iter_mut() {
            let edge_ids: Vec<i64> = route
                .segments
                .iter()
                .filter_map(|segment| match segment {
                    Segment::Walking { edge_ids, .. } => {
                        Some(edge_ids.iter().copied())
                    }
                    _ => None,
                })
                .flatten()
                .collect();
            route.total_ac_dgvi = evaluator.walking_dgvi(&edge_ids, month).await;
        }

        scoring::score_and_rank(candidates, request.preferences, RESULTS_PER_CATEGORY)
    }

    /// Direct and one-transfer bus candidates. Any upstream failure in this
    /// branch degrades to an empty list; the request then returns
    /// walking-only results.
    async fn bus_branch(
        &self,
        request: &PlanRequest,
        month: &GviMonth,
        now: chrono::DateTime<Local>,
        cancel: &CancellationToken,
    ) -> Vec<RoutePlan> {
        let origin_sites = match transit::nearby_sites(
            &*self.store,
            &self.config,
            &request.origin,
        )
        .await
        {
            Ok(sites) => sites,
            Err(why) => {
                log::warn!("origin site lookup failed, skipping bus search: {why}");
                return vec![];
            }
        };
        let dest_sites = match transit::nearby_sites(
            &*self.store,
            &self.config,
            &request.destination,
        )
        .await
        {
            Ok(sites) => sites,
            Err(why) => {
                log::warn!(
                    "destination site lookup failed, skipping bus search: {why}"
                );
                return vec![];
            }
        };
        if origin_sites.is_empty() || dest_sites.is_empty() {
            return vec![];
        }
        if cancel.is_cancelled() {
            return vec![];
        }

        let site_ids: Vec<i64> = origin_sites
            .iter()
            .chain(dest_sites.iter())
            .map(|site| site.site.id)
            .unique()
            .collect();
        let departures = batch_departures(
            &*self.feed,
            &site_ids,
            self.config.departure_forecast,
            self.config.api_delay,
        )
        .await;

        let context = transit::BusSearchContext {
            origin: request.origin,
            destination: request.destination,
            origin_sites,
            dest_sites,
            departures,
        };
        let mut stops = transit::StopCache::default();

        let mut timed = transit::direct_candidates(
            &*self.store,
            &self.config,
            &context,
            &mut stops,
            request.preferences,
            month,
            now,
        )
        .await;
        timed.extend(
            transfer::transfer_candidates(
                &*self.store,
                &*self.feed,
                &self.config,
                &context,
                &mut stops,
                request.preferences,
                month,
                now,
                cancel,
            )
            .await,
        );

        // Earliest arrival first; only the head of the list is worth the
        // DGVI queries.
        timed.sort_by_key(|candidate| candidate.arrival);
        timed.truncate(self.config.bus_scoring_candidates);

        let mut plans: Vec<RoutePlan> =
            timed.into_iter().map(|candidate| candidate.plan).collect();

        let evaluator = DgviEvaluator::new(&*self.store);
        for plan in plans.iter_mut() {
            let mut total = 0.0;
            for segment in &plan.segments {
                if let Segment::BusWaiting { location, .. } = segment {
                    total += evaluator
                        .waiting_dgvi(
                            location,
                            month,
                            self.config.waiting_dgvi_radius_m,
                        )
                        .await;
                }
            }
            plan.total_ac_dgvi = total;
        }

        scoring::score_and_rank(plans, request.preferences, RESULTS_PER_CATEGORY)
    }

    async fn resolve_month(&self, requested: Option<GviMonth>) -> PlanResult<GviMonth> {
        let months = self.store.available_months().await?;
        match requested {
            Some(month) => {
                if months.contains(&month) {
                    Ok(month)
                } else {
                    Err(PlanError::NoDataForMonth(month.to_string()))
                }
            }
            None => months.into_iter().next().ok_or_else(|| {
                PlanError::NoDataForMonth("no DGVI months ingested".to_owned())
            }),
        }
    }

    // ── Admin and read-only operations ──────────────────────────────────

    /// Recomputes the DGVI table for one month. Idempotent; restartable
    /// after partial failure.
    pub async fn update_dgvi(
        &self,
        month: &GviMonth,
        cancel: &CancellationToken,
    ) -> PlanResult<u64> {
        DgviEvaluator::new(&*self.store)
            .rebuild_month(month, self.config.dgvi_batch_size, cancel)
            .await
    }

    /// Months with DGVI rows, newest first.
    pub async fn available_months(&self) -> PlanResult<Vec<GviMonth>> {
        Ok(self.store.available_months().await?)
    }

    /// The month new requests default to.
    pub async fn recommended_month(&self) -> PlanResult<Option<GviMonth>> {
        Ok(self.store.available_months().await?.into_iter().next())
    }

    pub async fn dgvi_stats(&self, month: &GviMonth) -> PlanResult<DgviStats> {
        self.store
            .dgvi_stats(month)
            .await?
            .ok_or_else(|| PlanError::NoDataForMonth(month.to_string()))
    }

    pub async fn gvi_points(&self, month: &GviMonth) -> PlanResult<Vec<GviPoint>> {
        Ok(self
            .store
            .gvi_points(month, self.config.gvi_points_limit)
            .await?)
    }

    pub async fn nearby_sites(
        &self,
        point: Location,
        max_distance_m: f64,
    ) -> PlanResult<Vec<NearbySite>> {
        if !point.is_valid() {
            return Err(PlanError::InvalidInput(
                "coordinates out of range".to_owned(),
            ));
        }
        Ok(self
            .store
            .sites_within_and_nearest(
                &point,
                max_distance_m,
                self.config.nearest_site_count,
                self.config.nearby_site_limit,
            )
            .await?)
    }

    /// Persists externally scored GVI points.
    pub async fn add_gvi_points(&self, points: &[GviPoint]) -> PlanResult<u64> {
        if points.iter().any(|point| !point.location.is_valid()) {
            return Err(PlanError::InvalidInput(
                "coordinates out of range".to_owned(),
            ));
        }
        Ok(self.store.insert_gvi_points(points).await?)
    }
}
