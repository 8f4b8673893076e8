use model::{Location, NearbySite, NextStop, StopPoint};
use planner::store::StoreResult;
use sqlx::{Executor, Postgres};

use crate::data_model::{NearbySiteRow, NextStopRow, StopPointRow};

use super::convert_error;

/// Union of sites within the walking radius and the nearest few overall,
/// capped at `limit`, closest first.
pub async fn sites_within_and_nearest<'c, E>(
    executor: E,
    point: &Location,
    radius_m: f64,
    nearest: usize,
    limit: usize,
) -> StoreResult<Vec<NearbySite>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<NearbySiteRow> = sqlx::query_as(
        "
        WITH query_point AS (
            SELECT ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography AS g
        ),
        annotated AS (
            SELECT
                s.id,
                s.name,
                ST_Y(s.geom) AS latitude,
                ST_X(s.geom) AS longitude,
                ST_Distance(s.geom::geography, q.g) AS distance_m
            FROM sites s, query_point q
        ),
        nearest AS (
            SELECT id FROM annotated ORDER BY distance_m ASC, id ASC LIMIT $4
        )
        SELECT id, name, latitude, longitude, distance_m
        FROM annotated
        WHERE distance_m <= $3 OR id IN (SELECT id FROM nearest)
        ORDER BY distance_m ASC, id ASC
        LIMIT $5;
        ",
    )
    .bind(point.longitude)
    .bind(point.latitude)
    .bind(radius_m)
    .bind(nearest as i64)
    .bind(limit as i64)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;

    Ok(rows.into_iter().map(NearbySiteRow::to_model).collect())
}

pub async fn stop_point<'c, E>(executor: E, id: i64) -> StoreResult<Option<StopPoint>>
where
    E: Executor<'c, Database = Postgres>,
{
    let row: Option<StopPointRow> = sqlx::query_as(
        "
        SELECT
            id,
            site_id,
            name,
            direction_code,
            ST_Y(geom) AS latitude,
            ST_X(geom) AS longitude
        FROM stop_points
        WHERE id = $1;
        ",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
    .map_err(convert_error)?;

    Ok(row.map(StopPointRow::to_model))
}

/// Functional successor on (line, direction); at most one row by schema.
pub async fn next_stop<'c, E>(
    executor: E,
    line_id: i64,
    direction_code: i32,
    stop_point_id: i64,
) -> StoreResult<Option<NextStop>>
where
    E: Executor<'c, Database = Postgres>,
{
    let row: Option<NextStopRow> = sqlx::query_as(
        "
        SELECT
            sq.next_stop_point_id AS stop_point_id,
            sp.site_id,
            sp.name
        FROM stop_sequences sq
        JOIN stop_points sp ON sp.id = sq.next_stop_point_id
        WHERE sq.line_id = $1
          AND sq.direction_code = $2
          AND sq.stop_point_id = $3
        LIMIT 1;
        ",
    )
    .bind(line_id)
    .bind(direction_code)
    .bind(stop_point_id)
    .fetch_optional(executor)
    .await
    .map_err(convert_error)?;

    Ok(row.map(NextStopRow::to_model))
}

/// Sites among `target_site_ids` reachable riding forward on (line,
/// direction) within `max_depth` hops.
pub async fn reachable_sites_from<'c, E>(
    executor: E,
    line_id: i64,
    direction_code: i32,
    stop_point_id: i64,
    target_site_ids: &[i64],
    max_depth: u32,
) -> StoreResult<Vec<i64>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar(
        "
        WITH RECURSIVE forward_walk(stop_point_id, depth) AS (
            SELECT $3::bigint, 0
            UNION ALL
            SELECT sq.next_stop_point_id, w.depth + 1
            FROM forward_walk w
            JOIN stop_sequences sq
              ON sq.stop_point_id = w.stop_point_id
             AND sq.line_id = $1
             AND sq.direction_code = $2
            WHERE w.depth < $4
        )
        SELECT DISTINCT sp.site_id
        FROM forward_walk w
        JOIN stop_points sp ON sp.id = w.stop_point_id
        WHERE w.depth > 0 AND sp.site_id = ANY($5);
        ",
    )
    .bind(line_id)
    .bind(direction_code)
    .bind(stop_point_id)
    .bind(max_depth as i64)
    .bind(target_site_ids)
    .fetch_all(executor)
    .await
    .map_err(convert_error)
}

/// Stops visited riding from `from_stop_id` towards `to_stop_id`, in
/// sequence order, both ends included, bounded by `max_depth`.
pub async fn stops_along<'c, E>(
    executor: E,
    line_id: i64,
    direction_code: i32,
    from_stop_id: i64,
    to_stop_id: i64,
    max_depth: u32,
) -> StoreResult<Vec<StopPoint>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<StopPointRow> = sqlx::query_as(
        "
        WITH RECURSIVE forward_walk(stop_point_id, depth) AS (
            SELECT $3::bigint, 0
            UNION ALL
            SELECT sq.next_stop_point_id, w.depth + 1
            FROM forward_walk w
            JOIN stop_sequences sq
              ON sq.stop_point_id = w.stop_point_id
             AND sq.line_id = $1
             AND sq.direction_code = $2
            WHERE w.depth < $5 AND w.stop_point_id <> $4
        )
        SELECT
            sp.id,
            sp.site_id,
            sp.name,
            sp.direction_code,
            ST_Y(sp.geom) AS latitude,
            ST_X(sp.geom) AS longitude
        FROM forward_walk w
        JOIN stop_points sp ON sp.id = w.stop_point_id
        ORDER BY w.depth;
        ",
    )
    .bind(line_id)
    .bind(direction_code)
    .bind(from_stop_id)
    .bind(to_stop_id)
    .bind(max_depth as i64)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;

    Ok(rows.into_iter().map(StopPointRow::to_model).collect())
}
