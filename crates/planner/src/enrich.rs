//! Visualization enrichment for surviving routes: reconstruct bus-ride
//! geometry over the road graph (pure length cost) and enumerate the named
//! intermediate stops. Failures leave the segment bare; the route survives.

use model::{RoutePlan, Segment};

use crate::{config::PlannerConfig, solver, store::SpatialStore};

pub(crate) async fn enrich_routes<S: SpatialStore + ?Sized>(
    store: &S,
    config: &PlannerConfig,
    routes: &mut [RoutePlan],
) {
    for route in routes.iter_mut() {
        for segment in route.segments.iter_mut() {
            let Segment::BusRide {
                from_stop,
                to_stop,
                line_id,
                direction_code,
                geometry,
                edge_ids,
                intermediate_stops,
                ..
            } = segment
            else {
                continue;
            };

            match solver::ride_geometry(store, &from_stop.location, &to_stop.location)
                .await
            {
                Ok(Some(path)) => {
                    *geometry = path.geometry;
                    *edge_ids = path.edge_ids;
                }
                Ok(None) => log::info!(
                    "no ride geometry between stops {} and {}",
                    from_stop.stop_point_id,
                    to_stop.stop_point_id
                ),
                Err(why) => log::warn!("ride geometry reconstruction failed: {why}"),
            }

            match store
                .stops_along(
                    *line_id,
                    *direction_code,
                    from_stop.stop_point_id,
                    to_stop.stop_point_id,
                    config.stops_along_depth,
                )
                .await
            {
                Ok(stops) => {
                    // Endpoints are already named on the segment.
                    *intermediate_stops = stops
                        .iter()
                        .filter(|stop| {
                            stop.id != from_stop.stop_point_id
                                && stop.id != to_stop.stop_point_id
                        })
                        .map(|stop| stop.name.clone())
                        .collect();
                }
                Err(why) => log::warn!("intermediate stop listing failed: {why}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Local;
    use model::{GviMonth, Location, Polyline, RouteType, StopPoint};

    use super::*;
    use crate::test_support::{corridor_fixture_store, FIXTURE_MONTH};

    fn ride_plan() -> RoutePlan {
        let from = StopPoint {
            id: 1011,
            site_id: 101,
            name: "stop 1011".into(),
            direction_code: 1,
            location: Location::new(0.0, 0.0),
        };
        let to = StopPoint {
            id: 1031,
            site_id: 103,
            name: "stop 1031".into(),
            direction_code: 1,
            location: Location::new(0.0, 0.03),
        };
        let now = Local::now();
        RoutePlan::new(
            "bus-900-103".into(),
            RouteType::DirectBus,
            from.location,
            to.location,
            vec![Segment::BusRide {
                duration_s: 300.0,
                from_stop: crate::transit::stop_ref(&from),
                to_stop: crate::transit::stop_ref(&to),
                line_id: 4,
                line_designation: "4".into(),
                direction_code: 1,
                expected_departure: now,
                expected_arrival: now + chrono::Duration::seconds(300),
                geometry: Polyline::default(),
                edge_ids: vec![],
                intermediate_stops: vec![],
            }],
            GviMonth::parse(FIXTURE_MONTH).unwrap(),
        )
    }

    #[tokio::test]
    async fn ride_geometry_and_stops_are_filled_in() {
        let mut store = corridor_fixture_store();
        // Put an intermediate stop on line 4 between the endpoints.
        store.add_stop_point(1015, 101, 1, 0.0, 0.01);
        store.successors.remove(&(4, 1, 1011));
        store.add_successor(4, 1, 1011, 1015);
        store.add_successor(4, 1, 1015, 1031);

        let config = PlannerConfig::default();
        let mut routes = vec![ride_plan()];
        enrich_routes(&store, &config, &mut routes).await;

        let Segment::BusRide {
            geometry,
            edge_ids,
            intermediate_stops,
            ..
        } = &routes[0].segments[0]
        else {
            panic!("expected a ride segment");
        };
        // Pure-length path over the corridor: edges 1-2-3.
        assert_eq!(edge_ids, &vec![1, 2, 3]);
        assert!(!geometry.is_empty());
        assert_eq!(intermediate_stops, &vec!["stop 1015".to_owned()]);
    }

    #[tokio::test]
    async fn missing_sequence_leaves_segment_bare() {
        let mut store = corridor_fixture_store();
        store.successors.clear();
        let config = PlannerConfig::default();
        let mut routes = vec![ride_plan()];
        enrich_routes(&store, &config, &mut routes).await;

        let Segment::BusRide {
            intermediate_stops, ..
        } = &routes[0].segments[0]
        else {
            panic!("expected a ride segment");
        };
        assert!(intermediate_stops.is_empty());
    }
}
