//! One-transfer search. Each feasible origin departure spawns a query
//! agent — a virtual passenger riding forward along its (line, direction)
//! through the stop-sequence graph. At every reached site the agent checks
//! the departure board for connections that go on to a destination site.
//!
//! Arrival times beyond the feed's forecast window are estimated with a
//! fixed average inter-stop time; routes built this way are marked
//! approximate.

use std::collections::HashMap;

use chrono::{DateTime, Duration as ChronoDuration, Local};
use model::{Departure, GviMonth, NextStop, Preferences, StopPoint};
use tokio_util::sync::CancellationToken;

use crate::{
    config::PlannerConfig,
    feed::DepartureFeed,
    store::SpatialStore,
    transit::{
        assemble_bus_plan, boarding_feasible, BusPlanParts, BusSearchContext,
        RidePart, StopCache, TimedPlan, TransferPart,
    },
};

/// A virtual passenger who boarded one origin departure.
struct QueryAgent {
    boarding: Departure,
    boarding_stop: StopPoint,
}

/// Departure boards fetched during the transfer search, keyed by site id.
/// Seeded from the origin/destination batch; misses go to the feed with the
/// same pacing discipline as the batch fetch.
struct DepartureBoards<'a, F: DepartureFeed + ?Sized> {
    feed: &'a F,
    config: &'a PlannerConfig,
    cache: HashMap<i64, Vec<Departure>>,
}

impl<'a, F: DepartureFeed + ?Sized> DepartureBoards<'a, F> {
    async fn get(&mut self, site_id: i64) -> &[Departure] {
        if !self.cache.contains_key(&site_id) {
            tokio::time::sleep(self.config.api_delay).await;
            let mut departures = self
                .feed
                .departures(site_id, self.config.departure_forecast)
                .await;
            departures.sort_by_key(|departure| departure.expected);
            self.cache.insert(site_id, departures);
        }
        &self.cache[&site_id]
    }
}

type NextStopKey = (i64, i32, i64);

/// Request-scoped successor cache over the stop-sequence relation.
#[derive(Default)]
struct NextStopCache {
    cache: HashMap<NextStopKey, Option<NextStop>>,
}

impl NextStopCache {
    async fn get<S: SpatialStore + ?Sized>(
        &mut self,
        store: &S,
        line_id: i64,
        direction_code: i32,
        stop_point_id: i64,
    ) -> Option<NextStop> {
        let key = (line_id, direction_code, stop_point_id);
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }
        let fetched = match store
            .next_stop(line_id, direction_code, stop_point_id)
            .await
        {
            Ok(next) => next,
            Err(why) => {
                log::warn!("next-stop lookup failed for {key:?}: {why}");
                None
            }
        };
        self.cache.insert(key, fetched.clone());
        fetched
    }
}

pub(crate) async fn transfer_candidates<S, F>(
    store: &S,
    feed: &F,
    config: &PlannerConfig,
    context: &BusSearchContext,
    stops: &mut StopCache,
    preferences: Preferences,
    month: &GviMonth,
    now: DateTime<Local>,
    cancel: &CancellationToken,
) -> Vec<TimedPlan>
where
    S: SpatialStore + ?Sized,
    F: DepartureFeed + ?Sized,
{
    let dest_site_ids: Vec<i64> = context
        .dest_sites
        .iter()
        .map(|site| site.site.id)
        .collect();

    // One agent per feasible origin journey; the nearest site's sighting
    // wins when a journey is visible from several origin sites.
    let mut agents: Vec<QueryAgent> = vec![];
    for site in &context.origin_sites {
        for departure in context.departures.get(&site.site.id).into_iter().flatten()
        {
            if agents
                .iter()
                .any(|agent| agent.boarding.journey_id == departure.journey_id)
            {
                continue;
            }
            if !boarding_feasible(
                config,
                site.walking_distance_m,
                departure.expected,
                now,
            ) {
                continue;
            }
            let Some(boarding_stop) = stops.get(store, departure.stop_point_id).await
            else {
                continue;
            };
            agents.push(QueryAgent {
                boarding: departure.clone(),
                boarding_stop,
            });
        }
    }

    let mut boards = DepartureBoards {
        feed,
        config,
        cache: context
            .departures
            .iter()
            .map(|(site_id, departures)| {
                let mut sorted = departures.clone();
                sorted.sort_by_key(|departure| departure.expected);
                (*site_id, sorted)
            })
            .collect(),
    };
    let mut next_stops = NextStopCache::default();

    let mut plans: Vec<TimedPlan> = vec![];
    'agents: for agent in &agents {
        let mut emitted_for_agent = 0;
        let mut current_stop_id = agent.boarding.stop_point_id;
        let mut estimated_arrival = agent.boarding.expected;

        for hop in 1..=config.transfer_search_depth {
            if cancel.is_cancelled() {
                break 'agents;
            }
            let Some(next) = next_stops
                .get(
                    store,
                    agent.boarding.line_id,
                    agent.boarding.direction_code,
                    current_stop_id,
                )
                .await
            else {
                break;
            };
            current_stop_id = next.stop_point_id;
            estimated_arrival +=
                ChronoDuration::seconds(config.transfer_inter_stop_avg.as_secs() as i64);

            let connections = select_connections(
                boards.get(next.site_id).await,
                agent,
                estimated_arrival,
                config,
            );
            for connection in connections {
                let reachable = match store
                    .reachable_sites_from(
                        connection.line_id,
                        connection.direction_code,
                        connection.stop_point_id,
                        &dest_site_ids,
                        config.destination_search_depth,
                    )
                    .await
                {
                    Ok(sites) => sites,
                    Err(why) => {
                        log::warn!("reachability probe failed: {why}");
                        continue;
                    }
                };
                if reachable.is_empty() {
                    continue;
                }
                let Some((final_stop, hops_to_dest)) = ride_to_destination(
                    store,
                    stops,
                    &mut next_stops,
                    &connection,
                    &dest_site_ids,
                    config.destination_search_depth,
                )
                .await
                else {
                    continue;
                };

                let Some(transfer_stop) = stops.get(store, current_stop_id).await
                else {
                    continue;
                };
                let Some(connection_stop) =
                    stops.get(store, connection.stop_point_id).await
                else {
                    continue;
                };

                let second_ride_s = hops_to_dest as f64
                    * config.transfer_inter_stop_avg.as_secs_f64();
                let second_arrival = connection.expected
                    + ChronoDuration::seconds(second_ride_s as i64);

                let parts = BusPlanParts {
                    id: format!(
                        "transfer-{}-{}",
                        agent.boarding.journey_id, connection.journey_id
                    ),
                    route_type: model::RouteType::TransferBus,
                    boarding_stop: agent.boarding_stop.clone(),
                    boarding: agent.boarding.clone(),
                    rides: vec![
                        RidePart {
                            alighting_stop: transfer_stop,
                            duration_s: hop as f64
                                * config.transfer_inter_stop_avg.as_secs_f64(),
                            arrival: estimated_arrival,
                            transfer: Some(TransferPart {
                                departure: connection.clone(),
                                boarding_stop: connection_stop,
                                margin_s: config.transfer_margin.as_secs_f64(),
                            }),
                        },
                        RidePart {
                            alighting_stop: final_stop,
                            duration_s: second_ride_s,
                            arrival: second_arrival,
                            transfer: None,
                        },
                    ],
                    approximate: true,
                    now,
                };
                if let Some(plan) = assemble_bus_plan(
                    store,
                    config,
                    context,
                    parts,
                    preferences,
                    month,
                )
                .await
                {
                    plans.push(plan);
                    emitted_for_agent += 1;
                    if plans.len() >= config.max_transfer_routes {
                        break 'agents;
                    }
                    if emitted_for_agent >= config.max_routes_per_agent {
                        continue 'agents;
                    }
                }
            }
        }
    }
    plans
}

/// Connections at one board the agent could switch to: departing after the
/// estimated arrival plus margin, on a different journey and a different
/// (line, direction). Consecutive board entries on the same
/// (stop point, direction) are collapsed to the first.
fn select_connections(
    board: &[Departure],
    agent: &QueryAgent,
    estimated_arrival: DateTime<Local>,
    config: &PlannerConfig,
) -> Vec<Departure> {
    let earliest = estimated_arrival
        + ChronoDuration::seconds(config.transfer_margin.as_secs() as i64);
    let mut previous: Option<(i64, i32)> = None;
    let mut selected = vec![];
    for departure in board {
        let key = (departure.stop_point_id, departure.direction_code);
        let duplicate = previous == Some(key);
        previous = Some(key);
        if duplicate {
            continue;
        }
        if departure.journey_id == agent.boarding.journey_id {
            continue;
        }
        if departure.line_id == agent.boarding.line_id
            && departure.direction_code == agent.boarding.direction_code
        {
            continue;
        }
        if departure.expected < earliest {
            continue;
        }
        selected.push(departure.clone());
    }
    selected
}

/// Rides the connection forward until it enters a destination site.
/// Returns the alighting stop and the hop count used for the duration
/// estimate.
async fn ride_to_destination<S: SpatialStore + ?Sized>(
    store: &S,
    stops: &mut StopCache,
    next_stops: &mut NextStopCache,
    connection: &Departure,
    dest_site_ids: &[i64],
    max_depth: u32,
) -> Option<(StopPoint, u32)> {
    let mut current = connection.stop_point_id;
    for hop in 1..=max_depth {
        let next = next_stops
            .get(
                store,
                connection.line_id,
                connection.direction_code,
                current,
            )
            .await?;
        current = next.stop_point_id;
        if dest_site_ids.contains(&next.site_id) {
            return stops.get(store, current).await.map(|stop| (stop, hop));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use model::{Location, RouteType, Segment};

    use super::*;
    use crate::feed::batch_departures;
    use crate::test_support::{
        corridor_fixture_store, departure, StubFeed, StubStore, FIXTURE_MONTH,
    };

    fn month() -> GviMonth {
        GviMonth::parse(FIXTURE_MONTH).unwrap()
    }

    async fn context(store: &StubStore, feed: &StubFeed) -> BusSearchContext {
        let config = PlannerConfig::default();
        let origin = Location::new(0.0, 0.0005);
        let destination = Location::new(0.0, 0.0495);
        let origin_sites =
            crate::transit::nearby_sites(store, &config, &origin).await.unwrap();
        let dest_sites = crate::transit::nearby_sites(store, &config, &destination)
            .await
            .unwrap();
        let site_ids: Vec<i64> = origin_sites
            .iter()
            .chain(dest_sites.iter())
            .map(|site| site.site.id)
            .collect();
        let departures = batch_departures(
            feed,
            &site_ids,
            Duration::from_secs(1200),
            Duration::ZERO,
        )
        .await;
        BusSearchContext {
            origin,
            destination,
            origin_sites,
            dest_sites,
            departures,
        }
    }

    fn transfer_feed() -> StubFeed {
        let mut feed = StubFeed::default();
        // Line 4 leaves the west end; line 7 leaves the midtown transfer
        // site towards the east end.
        feed.push_departure(101, departure(901, 4, 1, 1011, 300));
        feed.push_departure(103, departure(902, 7, 1, 1032, 600));
        feed
    }

    #[tokio::test]
    async fn forward_simulation_finds_one_transfer_route() {
        let store = corridor_fixture_store();
        let config = PlannerConfig::default();
        let mut config = config;
        config.api_delay = Duration::ZERO;
        let feed = transfer_feed();
        let context = context(&store, &feed).await;
        let mut stops = StopCache::default();

        let plans = transfer_candidates(
            &store,
            &feed,
            &config,
            &context,
            &mut stops,
            Preferences::default(),
            &month(),
            Local::now(),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(plans.len(), 1);
        let plan = &plans[0].plan;
        assert_eq!(plan.route_type, RouteType::TransferBus);
        assert_eq!(plan.ride_count(), 2);
        assert!(plan.approximate);
        assert!(plan.segments_consistent());

        // The transfer happens across two stop points of the same site, so
        // an intra-site walking segment separates the rides.
        assert!(plan.segments.iter().any(Segment::is_intra_site_walk));

        // Second ride: one hop at the inter-stop average.
        let ride_durations: Vec<f64> = plan
            .segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::BusRide { duration_s, .. } => Some(*duration_s),
                _ => None,
            })
            .collect();
        assert_eq!(ride_durations.len(), 2);
        assert_eq!(ride_durations[1], 90.0);
    }

    #[tokio::test]
    async fn connection_before_margin_is_skipped() {
        let store = corridor_fixture_store();
        let mut config = PlannerConfig::default();
        config.api_delay = Duration::ZERO;
        let mut feed = StubFeed::default();
        feed.push_departure(101, departure(901, 4, 1, 1011, 300));
        // Agent reaches midtown at ~390 s; margin demands 450 s, this
        // connection leaves at 400 s.
        feed.push_departure(103, departure(902, 7, 1, 1032, 400));
        let context = context(&store, &feed).await;
        let mut stops = StopCache::default();

        let plans = transfer_candidates(
            &store,
            &feed,
            &config,
            &context,
            &mut stops,
            Preferences::default(),
            &month(),
            Local::now(),
            &CancellationToken::new(),
        )
        .await;
        assert!(plans.is_empty());
    }

    #[tokio::test]
    async fn connection_without_destination_reach_is_skipped() {
        let mut store = corridor_fixture_store();
        // Cut line 7 so it no longer reaches the east end.
        store.successors.remove(&(7, 1, 1032));
        let mut config = PlannerConfig::default();
        config.api_delay = Duration::ZERO;
        let feed = transfer_feed();
        let context = context(&store, &feed).await;
        let mut stops = StopCache::default();

        let plans = transfer_candidates(
            &store,
            &feed,
            &config,
            &context,
            &mut stops,
            Preferences::default(),
            &month(),
            Local::now(),
            &CancellationToken::new(),
        )
        .await;
        assert!(plans.is_empty());
    }

    #[tokio::test]
    async fn consecutive_duplicate_connections_are_suppressed() {
        let store = corridor_fixture_store();
        let mut config = PlannerConfig::default();
        config.api_delay = Duration::ZERO;
        let feed = {
            let mut feed = transfer_feed();
            // Same stop point and direction as journey 902, right after it
            // on the board: collapsed to the first entry.
            feed.push_departure(103, departure(903, 7, 1, 1032, 900));
            feed
        };
        let context = context(&store, &feed).await;
        let mut stops = StopCache::default();

        let plans = transfer_candidates(
            &store,
            &feed,
            &config,
            &context,
            &mut stops,
            Preferences::default(),
            &month(),
            Local::now(),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].plan.id, "transfer-901-902");
    }

    #[tokio::test]
    async fn emission_caps_bound_the_search() {
        let mut store = corridor_fixture_store();
        // A second connecting line from its own platform at the transfer
        // site, so the duplicate suppression does not interfere.
        store.add_stop_point(1033, 103, 1, 0.0, 0.03);
        store.add_successor(8, 1, 1033, 1021);
        let mut config = PlannerConfig::default();
        config.api_delay = Duration::ZERO;
        config.max_routes_per_agent = 1;
        let mut feed = StubFeed::default();
        feed.push_departure(101, departure(901, 4, 1, 1011, 300));
        // Two viable connections; the per-agent cap keeps only the first.
        feed.push_departure(103, departure(902, 7, 1, 1032, 600));
        feed.push_departure(103, departure(903, 8, 1, 1033, 900));
        let context = context(&store, &feed).await;
        let mut stops = StopCache::default();

        let plans = transfer_candidates(
            &store,
            &feed,
            &config,
            &context,
            &mut stops,
            Preferences::default(),
            &month(),
            Local::now(),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].plan.id, "transfer-901-902");
    }
}
