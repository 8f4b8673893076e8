//! Direct (seat-through) bus candidates: correlate journey ids observed at
//! origin sites against destination sites within the same forecast batch.

use std::collections::HashMap;

use chrono::{DateTime, Duration as ChronoDuration, Local};
use indexmap::IndexMap;
use model::{
    Departure, GviMonth, IntraSiteTransfer, Location, NearbySite, Polyline,
    Preferences, RoutePlan, RouteType, Segment, StopPoint, StopRef, TransferDetails,
};

use crate::{
    config::PlannerConfig,
    solver,
    store::{SpatialStore, StoreResult},
};

/// Shared inputs of the direct and transfer searches.
pub(crate) struct BusSearchContext {
    pub origin: Location,
    pub destination: Location,
    pub origin_sites: Vec<NearbySite>,
    pub dest_sites: Vec<NearbySite>,
    /// Departure batch for the union of origin and destination sites,
    /// keyed by site id in fetch order.
    pub departures: IndexMap<i64, Vec<Departure>>,
}

/// A candidate route together with its estimated final arrival, used for
/// the earliest-arrival cut before scoring.
pub(crate) struct TimedPlan {
    pub arrival: DateTime<Local>,
    pub plan: RoutePlan,
}

/// Request-scoped stop point lookup cache.
#[derive(Default)]
pub(crate) struct StopCache {
    cache: HashMap<i64, Option<StopPoint>>,
}

impl StopCache {
    pub async fn get<S: SpatialStore + ?Sized>(
        &mut self,
        store: &S,
        id: i64,
    ) -> Option<StopPoint> {
        if let Some(cached) = self.cache.get(&id) {
            return cached.clone();
        }
        let fetched = match store.stop_point(id).await {
            Ok(stop) => stop,
            Err(why) => {
                log::warn!("stop point {id} lookup failed: {why}");
                None
            }
        };
        self.cache.insert(id, fetched.clone());
        fetched
    }
}

pub(crate) fn stop_ref(stop: &StopPoint) -> StopRef {
    StopRef {
        stop_point_id: stop.id,
        site_id: stop.site_id,
        name: stop.name.clone(),
        location: stop.location,
    }
}

/// Sites considered around one endpoint: everything within the walking
/// radius plus the nearest few overall, capped.
pub(crate) async fn nearby_sites<S: SpatialStore + ?Sized>(
    store: &S,
    config: &PlannerConfig,
    point: &Location,
) -> StoreResult<Vec<NearbySite>> {
    store
        .sites_within_and_nearest(
            point,
            config.max_walking_distance_m(),
            config.nearest_site_count,
            config.nearby_site_limit,
        )
        .await
}

/// A walking leg solved on the road graph: `None` when unsolvable, and no
/// segment (but zero duration) when both points snap to the same vertex.
pub(crate) async fn walking_leg<S: SpatialStore + ?Sized>(
    store: &S,
    config: &PlannerConfig,
    from: &Location,
    to: &Location,
    preferences: Preferences,
    month: &GviMonth,
) -> Option<(Option<Segment>, f64)> {
    let path = match solver::walk_path(store, from, to, preferences, month).await {
        Ok(Some(path)) => path,
        Ok(None) => return None,
        Err(why) => {
            log::warn!("walking leg failed: {why}");
            return None;
        }
    };
    if path.edge_ids.is_empty() {
        return Some((None, 0.0));
    }
    let duration_s = path.total_length_m / config.walking_speed;
    Some((
        Some(Segment::Walking {
            duration_s,
            distance_m: path.total_length_m,
            edge_ids: path.edge_ids,
            geometry: path.geometry,
            intra_site: None,
        }),
        duration_s,
    ))
}

/// Can a passenger starting now reach the stop before the bus leaves, with
/// the boarding margin to spare?
pub(crate) fn boarding_feasible(
    config: &PlannerConfig,
    walking_distance_m: f64,
    expected: DateTime<Local>,
    now: DateTime<Local>,
) -> bool {
    let walking_time_s = walking_distance_m / config.walking_speed;
    let slack_s = (expected - now).num_seconds() as f64;
    walking_time_s + config.boarding_margin.as_secs_f64() <= slack_s
}

/// One bus leg of an assembled plan, plus the connection boarded after it
/// when the route transfers.
pub(crate) struct RidePart {
    pub alighting_stop: StopPoint,
    pub duration_s: f64,
    pub arrival: DateTime<Local>,
    pub transfer: Option<TransferPart>,
}

pub(crate) struct TransferPart {
    pub departure: Departure,
    pub boarding_stop: StopPoint,
    pub margin_s: f64,
}

pub(crate) struct BusPlanParts {
    pub id: String,
    pub route_type: RouteType,
    pub boarding_stop: StopPoint,
    pub boarding: Departure,
    pub rides: Vec<RidePart>,
    pub approximate: bool,
    pub now: DateTime<Local>,
}

/// Builds the full segment chain — access walk, waiting, rides with
/// transfer glue, egress walk — for one bus candidate. `None` drops the
/// candidate (unsolvable walking leg), never the request.
pub(crate) async fn assemble_bus_plan<S: SpatialStore + ?Sized>(
    store: &S,
    config: &PlannerConfig,
    context: &BusSearchContext,
    parts: BusPlanParts,
    preferences: Preferences,
    month: &GviMonth,
) -> Option<TimedPlan> {
    let (access_segment, access_duration_s) = walking_leg(
        store,
        config,
        &context.origin,
        &parts.boarding_stop.location,
        preferences,
        month,
    )
    .await?;

    let mut segments = vec![];
    if let Some(segment) = access_segment {
        segments.push(segment);
    }

    let waiting_s = ((parts.boarding.expected - parts.now).num_seconds() as f64
        - access_duration_s)
        .max(0.0);
    segments.push(Segment::BusWaiting {
        duration_s: waiting_s,
        stop_point_id: parts.boarding_stop.id,
        site_id: parts.boarding_stop.site_id,
        location: parts.boarding_stop.location,
        line_id: parts.boarding.line_id,
        line_designation: parts.boarding.line_designation.clone(),
        direction_code: parts.boarding.direction_code,
        expected_departure: parts.boarding.expected,
        transfer: None,
    });

    let mut current_stop = parts.boarding_stop.clone();
    let mut current_departure = parts.boarding.clone();
    let mut last_arrival = parts.boarding.expected;

    for ride in &parts.rides {
        segments.push(Segment::BusRide {
            duration_s: ride.duration_s,
            from_stop: stop_ref(&current_stop),
            to_stop: stop_ref(&ride.alighting_stop),
            line_id: current_departure.line_id,
            line_designation: current_departure.line_designation.clone(),
            direction_code: current_departure.direction_code,
            expected_departure: current_departure.expected,
            expected_arrival: ride.arrival,
            geometry: Polyline::default(),
            edge_ids: vec![],
            intermediate_stops: vec![],
        });
        last_arrival = ride.arrival;

        if let Some(transfer) = &ride.transfer {
            let intra_site_walk = transfer.boarding_stop.id != ride.alighting_stop.id;
            let mut intra_walk_s = 0.0;
            if intra_site_walk {
                let distance_m = ride
                    .alighting_stop
                    .location
                    .distance_to(&transfer.boarding_stop.location);
                intra_walk_s = distance_m / config.walking_speed;
                segments.push(Segment::Walking {
                    duration_s: intra_walk_s,
                    distance_m,
                    edge_ids: vec![],
                    geometry: Polyline::new(vec![
                        [
                            ride.alighting_stop.location.longitude,
                            ride.alighting_stop.location.latitude,
                        ],
                        [
                            transfer.boarding_stop.location.longitude,
                            transfer.boarding_stop.location.latitude,
                        ],
                    ]),
                    intra_site: Some(IntraSiteTransfer {
                        from_stop_point: ride.alighting_stop.id,
                        to_stop_point: transfer.boarding_stop.id,
                        site_id: transfer.boarding_stop.site_id,
                    }),
                });
            }
            let waiting_s = ((transfer.departure.expected - ride.arrival)
                .num_seconds() as f64
                - intra_walk_s)
                .max(0.0);
            segments.push(Segment::BusWaiting {
                duration_s: waiting_s,
                stop_point_id: transfer.boarding_stop.id,
                site_id: transfer.boarding_stop.site_id,
                location: transfer.boarding_stop.location,
                line_id: transfer.departure.line_id,
                line_designation: transfer.departure.line_designation.clone(),
                direction_code: transfer.departure.direction_code,
                expected_departure: transfer.departure.expected,
                transfer: Some(TransferDetails {
                    waiting_seconds: waiting_s,
                    from_line: current_departure.line_designation.clone(),
                    to_line: transfer.departure.line_designation.clone(),
                    intra_site_walk,
                    transfer_margin_seconds: transfer.margin_s,
                }),
            });
            current_stop = transfer.boarding_stop.clone();
            current_departure = transfer.departure.clone();
        } else {
            current_stop = ride.alighting_stop.clone();
        }
    }

    let (egress_segment, egress_duration_s) = walking_leg(
        store,
        config,
        &current_stop.location,
        &context.destination,
        preferences,
        month,
    )
    .await?;
    if let Some(segment) = egress_segment {
        segments.push(segment);
    }

    let mut plan = RoutePlan::new(
        parts.id,
        parts.route_type,
        context.origin,
        context.destination,
        segments,
        month.clone(),
    );
    plan.approximate = parts.approximate;
    Some(TimedPlan {
        arrival: last_arrival
            + ChronoDuration::seconds(egress_duration_s.round() as i64),
        plan,
    })
}

struct DirectMatch {
    boarding: Departure,
    alighting: Departure,
}

pub(crate) async fn direct_candidates<S: SpatialStore + ?Sized>(
    store: &S,
    config: &PlannerConfig,
    context: &BusSearchContext,
    stops: &mut StopCache,
    preferences: Preferences,
    month: &GviMonth,
    now: DateTime<Local>,
) -> Vec<TimedPlan> {
    // Journey ids observed at origin sites; the nearest site wins when the
    // same journey is visible from several.
    let mut origin_journeys: HashMap<i64, (NearbySite, Departure)> = HashMap::new();
    for site in &context.origin_sites {
        for departure in context.departures.get(&site.site.id).into_iter().flatten()
        {
            origin_journeys
                .entry(departure.journey_id)
                .or_insert_with(|| (site.clone(), departure.clone()));
        }
    }

    let mut matches = vec![];
    for dest_site in &context.dest_sites {
        for alighting in context
            .departures
            .get(&dest_site.site.id)
            .into_iter()
            .flatten()
        {
            let Some((origin_site, boarding)) =
                origin_journeys.get(&alighting.journey_id)
            else {
                continue;
            };
            // The same journey id at both endpoints only implies a
            // seat-through itinerary when line and direction agree.
            if boarding.line_id != alighting.line_id
                || boarding.direction_code != alighting.direction_code
                || origin_site.site.id == dest_site.site.id
            {
                continue;
            }
            if !boarding_feasible(
                config,
                origin_site.walking_distance_m,
                boarding.expected,
                now,
            ) {
                continue;
            }
            let ride_s = (alighting.expected - boarding.expected).num_seconds();
            if ride_s <= 0 || ride_s > config.bus_search_max_duration.as_secs() as i64
            {
                continue;
            }
            matches.push(DirectMatch {
                boarding: boarding.clone(),
                alighting: alighting.clone(),
            });
        }
    }

    let mut plans = vec![];
    for candidate in matches {
        let Some(boarding_stop) =
            stops.get(store, candidate.boarding.stop_point_id).await
        else {
            continue;
        };
        let Some(alighting_stop) =
            stops.get(store, candidate.alighting.stop_point_id).await
        else {
            continue;
        };
        let parts = BusPlanParts {
            id: format!(
                "bus-{}-{}",
                candidate.boarding.journey_id, alighting_stop.site_id
            ),
            route_type: RouteType::DirectBus,
            boarding_stop,
            boarding: candidate.boarding.clone(),
            rides: vec![RidePart {
                alighting_stop: alighting_stop.clone(),
                duration_s: (candidate.alighting.expected
                    - candidate.boarding.expected)
                    .num_seconds() as f64,
                arrival: candidate.alighting.expected,
                transfer: None,
            }],
            approximate: false,
            now,
        };
        match assemble_bus_plan(store, config, context, parts, preferences, month)
            .await
        {
            Some(plan) => plans.push(plan),
            None => log::info!(
                "dropping direct candidate for journey {}",
                candidate.boarding.journey_id
            ),
        }
    }
    plans
}
