use std::{error, fmt};

use async_trait::async_trait;
use model::{
    DgviStats, GviMonth, GviPoint, Location, MatchedGviPoint, NearbySite, NextStop,
    Polyline, StopPoint,
};

#[derive(Debug)]
pub enum StoreError {
    NotFound,
    Other(Box<dyn error::Error + Send + Sync>),
}

impl StoreError {
    pub fn other<E: error::Error + Send + Sync + 'static>(why: E) -> Self {
        Self::Other(Box::new(why))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "not found"),
            StoreError::Other(why) => write!(f, "{why}"),
        }
    }
}

impl error::Error for StoreError {}

pub type StoreResult<O> = Result<O, StoreError>;

/// Per-edge cost evaluated by the store's shortest-path solver. A typed
/// value rather than a SQL fragment, so only validated weights and a
/// validated month tag ever reach the query text.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeCost {
    /// `w_time · length_normalized + w_green · (1 − COALESCE(dgvi_normalized, 0))`
    Preference {
        w_time: f64,
        w_green: f64,
        month: GviMonth,
    },
    /// Plain length in meters; used to reconstruct bus-ride geometry.
    PureLength,
}

/// Result of a single-source single-target edge path query: edge ids in
/// traversal order, the sum of raw edge lengths (independent of the cost
/// function), and the stitched line geometry.
#[derive(Debug, Clone, Default)]
pub struct EdgePath {
    pub edge_ids: Vec<i64>,
    pub total_length_m: f64,
    pub geometry: Polyline,
}

/// Read-mostly query surface over the geospatial graph store. The planner
/// depends only on this trait; the Postgres implementation lives in the
/// `database` crate, and tests substitute an in-memory fixture.
#[async_trait]
pub trait SpatialStore: Send + Sync {
    /// Vertex closest to `point` by great-circle distance, ties broken by
    /// smaller id. `None` when the graph is empty.
    async fn nearest_vertex(&self, point: &Location) -> StoreResult<Option<i64>>;

    /// Undirected single-pair shortest path under `cost`. `None` when no
    /// path exists.
    async fn shortest_edge_path(
        &self,
        from_vertex: i64,
        to_vertex: i64,
        cost: &EdgeCost,
    ) -> StoreResult<Option<EdgePath>>;

    async fn edge_geometry_and_length(
        &self,
        edge_id: i64,
    ) -> StoreResult<Option<(Polyline, f64)>>;

    /// GVI points of `month` within a 1 m buffer of the edge, each projected
    /// to its line parameter. Sorted by parameter.
    async fn matched_gvi_points_for_edge(
        &self,
        edge_id: i64,
        month: &GviMonth,
    ) -> StoreResult<Vec<MatchedGviPoint>>;

    /// Ids of road edges whose geometry intersects the buffer around `point`.
    async fn edges_within(
        &self,
        point: &Location,
        radius_m: f64,
    ) -> StoreResult<Vec<i64>>;

    /// Union of sites within `radius_m` and the `nearest` closest sites
    /// overall, capped at `limit`, each annotated with straight-line
    /// distance and ordered by it.
    async fn sites_within_and_nearest(
        &self,
        point: &Location,
        radius_m: f64,
        nearest: usize,
        limit: usize,
    ) -> StoreResult<Vec<NearbySite>>;

    async fn stop_point(&self, id: i64) -> StoreResult<Option<StopPoint>>;

    /// Successor stop on (line, direction), if any.
    async fn next_stop(
        &self,
        line_id: i64,
        direction_code: i32,
        stop_point_id: i64,
    ) -> StoreResult<Option<NextStop>>;

    /// Sites among `target_site_ids` reachable by riding forward from
    /// `stop_point_id` on (line, direction) within `max_depth` hops.
    async fn reachable_sites_from(
        &self,
        line_id: i64,
        direction_code: i32,
        stop_point_id: i64,
        target_site_ids: &[i64],
        max_depth: u32,
    ) -> StoreResult<Vec<i64>>;

    /// Stops visited riding from `from_stop_id` towards `to_stop_id`,
    /// inclusive of both ends, in sequence order, bounded by `max_depth`.
    async fn stops_along(
        &self,
        line_id: i64,
        direction_code: i32,
        from_stop_id: i64,
        to_stop_id: i64,
        max_depth: u32,
    ) -> StoreResult<Vec<StopPoint>>;

    // -- DGVI table maintenance and read-outs --

    async fn road_ids(&self) -> StoreResult<Vec<i64>>;

    /// Upserts raw DGVI values for `month`; normalization happens in a
    /// separate pass.
    async fn upsert_road_dgvi(
        &self,
        month: &GviMonth,
        rows: &[(i64, f64)],
    ) -> StoreResult<()>;

    /// Recomputes `dgvi_normalized` as the min-max normalization over all
    /// rows of `month` (all zero when min equals max).
    async fn normalize_month(&self, month: &GviMonth) -> StoreResult<()>;

    /// Months with DGVI rows, newest first.
    async fn available_months(&self) -> StoreResult<Vec<GviMonth>>;

    async fn dgvi_stats(&self, month: &GviMonth) -> StoreResult<Option<DgviStats>>;

    async fn gvi_points(
        &self,
        month: &GviMonth,
        limit: usize,
    ) -> StoreResult<Vec<GviPoint>>;

    /// Persists externally scored GVI points; returns the inserted count.
    async fn insert_gvi_points(&self, points: &[GviPoint]) -> StoreResult<u64>;
}
