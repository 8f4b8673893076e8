//! End-to-end walking candidates under three preference strategies.

use model::{GviMonth, Location, Polyline, Preferences, RoutePlan, RouteType, Segment};

use crate::{config::PlannerConfig, solver, store::SpatialStore};

const STRATEGIES: [&str; 3] = ["user", "fastest", "greenest"];

/// Runs the solver once per strategy (caller's weights, pure-time,
/// pure-green), deduplicates by edge fingerprint, and keeps the first
/// survivors in strategy-priority order. A strategy whose endpoints cannot
/// be snapped simply drops out.
pub(crate) async fn walking_candidates<S: SpatialStore + ?Sized>(
    store: &S,
    config: &PlannerConfig,
    origin: Location,
    destination: Location,
    preferences: Preferences,
    month: &GviMonth,
) -> Vec<RoutePlan> {
    let weights = [
        preferences,
        Preferences::time_only(),
        Preferences::green_only(),
    ];

    let solved = futures::future::join_all(weights.iter().map(|&strategy_weights| {
        solver::walk_path(store, &origin, &destination, strategy_weights, month)
    }))
    .await;

    let mut candidates = vec![];
    for (strategy, solved) in STRATEGIES.iter().zip(solved) {
        let path = match solved {
            Ok(Some(path)) => path,
            Ok(None) => {
                log::info!("walking strategy '{strategy}' found no path");
                continue;
            }
            Err(why) => {
                log::warn!("walking strategy '{strategy}' failed: {why}");
                continue;
            }
        };
        // Both endpoints snapped to one vertex: nothing to walk.
        if path.edge_ids.is_empty() {
            continue;
        }
        candidates.push(build_plan(
            strategy,
            config,
            origin,
            destination,
            month.clone(),
            path.edge_ids,
            path.total_length_m,
            path.geometry,
        ));
    }

    dedup_by_fingerprint(candidates, config.walking_candidates)
}

#[allow(clippy::too_many_arguments)]
fn build_plan(
    strategy: &str,
    config: &PlannerConfig,
    origin: Location,
    destination: Location,
    month: GviMonth,
    edge_ids: Vec<i64>,
    distance_m: f64,
    geometry: Polyline,
) -> RoutePlan {
    let duration_s = distance_m / config.walking_speed;
    RoutePlan::new(
        format!("walking-{strategy}"),
        RouteType::Walking,
        origin,
        destination,
        vec![Segment::Walking {
            duration_s,
            distance_m,
            edge_ids,
            geometry,
            intra_site: None,
        }],
        month,
    )
}

fn dedup_by_fingerprint(candidates: Vec<RoutePlan>, keep: usize) -> Vec<RoutePlan> {
    let mut seen: Vec<Vec<i64>> = vec![];
    let mut survivors = vec![];
    for candidate in candidates {
        let fingerprint = candidate.edge_fingerprint();
        if seen.contains(&fingerprint) {
            continue;
        }
        seen.push(fingerprint);
        survivors.push(candidate);
        if survivors.len() == keep {
            break;
        }
    }
    survivors
}
