//! Thin orchestration over the store's shortest-path query: endpoint
//! snapping, the equal-endpoint short-circuit, and the pure-length variant
//! used to redraw bus rides.

use model::{GviMonth, Location, Preferences};

use crate::store::{EdgeCost, EdgePath, SpatialStore, StoreResult};

/// Shortest walking path between two arbitrary points under the given
/// preference weights. `None` when an endpoint cannot be snapped to the
/// graph or no path exists — callers drop the candidate and continue.
pub async fn walk_path<S: SpatialStore + ?Sized>(
    store: &S,
    from: &Location,
    to: &Location,
    preferences: Preferences,
    month: &GviMonth,
) -> StoreResult<Option<EdgePath>> {
    let cost = EdgeCost::Preference {
        w_time: preferences.time,
        w_green: preferences.green,
        month: month.clone(),
    };
    solve(store, from, to, &cost).await
}

/// Pure-length path between two stop points, used only to draw the ride on
/// the map. Its DGVI is never accumulated.
pub async fn ride_geometry<S: SpatialStore + ?Sized>(
    store: &S,
    from: &Location,
    to: &Location,
) -> StoreResult<Option<EdgePath>> {
    solve(store, from, to, &EdgeCost::PureLength).await
}

async fn solve<S: SpatialStore + ?Sized>(
    store: &S,
    from: &Location,
    to: &Location,
    cost: &EdgeCost,
) -> StoreResult<Option<EdgePath>> {
    let Some(from_vertex) = store.nearest_vertex(from).await? else {
        return Ok(None);
    };
    let Some(to_vertex) = store.nearest_vertex(to).await? else {
        return Ok(None);
    };
    if from_vertex == to_vertex {
        return Ok(Some(EdgePath::default()));
    }
    store.shortest_edge_path(from_vertex, to_vertex, cost).await
}

#[cfg(test)]
mod tests {
    use model::{GviMonth, Preferences};

    use super::*;
    use crate::test_support::{line_fixture_store, FIXTURE_MONTH};

    #[tokio::test]
    async fn equal_endpoints_yield_empty_path() {
        let store = line_fixture_store();
        let point = Location::new(0.0, 0.0);
        let path = walk_path(
            &store,
            &point,
            &point,
            Preferences::default(),
            &GviMonth::parse(FIXTURE_MONTH).unwrap(),
        )
        .await
        .unwrap()
        .expect("path");
        assert!(path.edge_ids.is_empty());
        assert_eq!(path.total_length_m, 0.0);
    }

    #[tokio::test]
    async fn fastest_weights_pick_the_shorter_chain() {
        let store = line_fixture_store();
        // Vertex 1 is at (0,0), vertex 4 at (0.03,0); the fixture offers a
        // short chain and a long detour.
        let path = walk_path(
            &store,
            &Location::new(0.0, 0.0),
            &Location::new(0.0, 0.03),
            Preferences::time_only(),
            &GviMonth::parse(FIXTURE_MONTH).unwrap(),
        )
        .await
        .unwrap()
        .expect("path");
        assert_eq!(path.edge_ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn greenest_weights_prefer_high_dgvi_edges() {
        let store = line_fixture_store();
        let path = walk_path(
            &store,
            &Location::new(0.0, 0.0),
            &Location::new(0.0, 0.03),
            Preferences::green_only(),
            &GviMonth::parse(FIXTURE_MONTH).unwrap(),
        )
        .await
        .unwrap()
        .expect("path");
        // The detour edges carry dgvi_normalized = 1.0 in the fixture.
        assert_eq!(path.edge_ids, vec![3, 4]);
    }

    #[tokio::test]
    async fn unreachable_target_reports_no_path() {
        let store = line_fixture_store();
        let path = walk_path(
            &store,
            &Location::new(0.0, 0.0),
            // Snaps to the isolated vertex 99.
            &Location::new(5.0, 5.0),
            Preferences::default(),
            &GviMonth::parse(FIXTURE_MONTH).unwrap(),
        )
        .await
        .unwrap();
        assert!(path.is_none());
    }
}
