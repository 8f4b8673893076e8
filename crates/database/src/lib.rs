use std::env;

use async_trait::async_trait;
use model::{
    DgviStats, GviMonth, GviPoint, Location, MatchedGviPoint, NearbySite, NextStop,
    Polyline, StopPoint,
};
use planner::store::{EdgeCost, EdgePath, SpatialStore, StoreResult};
use sqlx::postgres::PgPoolOptions;

pub mod cost;
pub mod data_model;
pub mod queries;

pub struct DatabaseConnectionInfo {
    pub username: String,
    pub password: String,
    pub hostname: String,
    pub port: u16,
    pub database: String,
    pub pool_size: u32,
}

impl DatabaseConnectionInfo {
    pub fn from_env() -> Option<Self> {
        let username = env::var("DATABASE_USER").ok()?;
        let password = env::var("DATABASE_PASSWORD").ok()?;
        let hostname = env::var("DATABASE_HOST").ok()?;
        let port: u16 = env::var("DATABASE_PORT").ok()?.parse().ok()?;
        let database = env::var("DATABASE_NAME").ok()?;
        let pool_size = env::var("DATABASE_POOL_SIZE")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(8);
        Some(Self {
            username,
            password,
            hostname,
            port,
            database,
            pool_size,
        })
    }

    pub(self) fn postgres_url(self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.hostname, self.port, self.database
        )
    }
}

/// Spatial store on PostgreSQL with PostGIS and pgRouting. All planner
/// queries go through the bounded pool; a connection is held only for the
/// duration of one query.
#[derive(Clone)]
pub struct PgSpatialStore {
    pool: sqlx::PgPool,
}

impl PgSpatialStore {
    pub async fn connect(
        connection_info: DatabaseConnectionInfo,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let pool_size = connection_info.pool_size;
        let url = connection_info.postgres_url();
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .connect(&url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }

    /// Cheap readiness probe for the health endpoint.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SpatialStore for PgSpatialStore {
    async fn nearest_vertex(&self, point: &Location) -> StoreResult<Option<i64>> {
        queries::road::nearest_vertex(&self.pool, point).await
    }

    async fn shortest_edge_path(
        &self,
        from_vertex: i64,
        to_vertex: i64,
        cost: &EdgeCost,
    ) -> StoreResult<Option<EdgePath>> {
        queries::road::shortest_edge_path(&self.pool, from_vertex, to_vertex, cost)
            .await
    }

    async fn edge_geometry_and_length(
        &self,
        edge_id: i64,
    ) -> StoreResult<Option<(Polyline, f64)>> {
        queries::road::edge_geometry_and_length(&self.pool, edge_id).await
    }

    async fn matched_gvi_points_for_edge(
        &self,
        edge_id: i64,
        month: &GviMonth,
    ) -> StoreResult<Vec<MatchedGviPoint>> {
        queries::gvi::matched_points_for_edge(&self.pool, edge_id, month).await
    }

    async fn edges_within(
        &self,
        point: &Location,
        radius_m: f64,
    ) -> StoreResult<Vec<i64>> {
        queries::road::edges_within(&self.pool, point, radius_m).await
    }

    async fn sites_within_and_nearest(
        &self,
        point: &Location,
        radius_m: f64,
        nearest: usize,
        limit: usize,
    ) -> StoreResult<Vec<NearbySite>> {
        queries::transit::sites_within_and_nearest(
            &self.pool, point, radius_m, nearest, limit,
        )
        .await
    }

    async fn stop_point(&self, id: i64) -> StoreResult<Option<StopPoint>> {
        queries::transit::stop_point(&self.pool, id).await
    }

    async fn next_stop(
        &self,
        line_id: i64,
        direction_code: i32,
        stop_point_id: i64,
    ) -> StoreResult<Option<NextStop>> {
        queries::transit::next_stop(&self.pool, line_id, direction_code, stop_point_id)
            .await
    }

    async fn reachable_sites_from(
        &self,
        line_id: i64,
        direction_code: i32,
        stop_point_id: i64,
        target_site_ids: &[i64],
        max_depth: u32,
    ) -> StoreResult<Vec<i64>> {
        queries::transit::reachable_sites_from(
            &self.pool,
            line_id,
            direction_code,
            stop_point_id,
            target_site_ids,
            max_depth,
        )
        .await
    }

    async fn stops_along(
        &self,
        line_id: i64,
        direction_code: i32,
        from_stop_id: i64,
        to_stop_id: i64,
        max_depth: u32,
    ) -> StoreResult<Vec<StopPoint>> {
        queries::transit::stops_along(
            &self.pool,
            line_id,
            direction_code,
            from_stop_id,
            to_stop_id,
            max_depth,
        )
        .await
    }

    async fn road_ids(&self) -> StoreResult<Vec<i64>> {
        queries::road::road_ids(&self.pool).await
    }

    async fn upsert_road_dgvi(
        &self,
        month: &GviMonth,
        rows: &[(i64, f64)],
    ) -> StoreResult<()> {
        queries::dgvi::upsert(&self.pool, month, rows).await
    }

    async fn normalize_month(&self, month: &GviMonth) -> StoreResult<()> {
        queries::dgvi::normalize_month(&self.pool, month).await
    }

    async fn available_months(&self) -> StoreResult<Vec<GviMonth>> {
        queries::dgvi::available_months(&self.pool).await
    }

    async fn dgvi_stats(&self, month: &GviMonth) -> StoreResult<Option<DgviStats>> {
        queries::dgvi::stats(&self.pool, month).await
    }

    async fn gvi_points(
        &self,
        month: &GviMonth,
        limit: usize,
    ) -> StoreResult<Vec<GviPoint>> {
        queries::gvi::points_for_month(&self.pool, month, limit).await
    }

    async fn insert_gvi_points(&self, points: &[GviPoint]) -> StoreResult<u64> {
        queries::gvi::insert_points(&self.pool, points).await
    }
}
