use model::{Location, Polyline};
use planner::store::{EdgeCost, EdgePath, StoreResult};
use sqlx::{Executor, Postgres};

use crate::{
    cost::render_inner_query,
    data_model::{EdgeGeometryRow, PathEdgeRow},
};

use super::convert_error;

/// Graph vertex closest to a WGS84 point by geodesic distance; ties break
/// on the smaller id.
pub async fn nearest_vertex<'c, E>(
    executor: E,
    point: &Location,
) -> StoreResult<Option<i64>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar(
        "
        SELECT id
        FROM road_vertices
        ORDER BY
            ST_Distance(
                geom::geography,
                ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography
            ) ASC,
            id ASC
        LIMIT 1;
        ",
    )
    .bind(point.longitude)
    .bind(point.latitude)
    .fetch_optional(executor)
    .await
    .map_err(convert_error)
}

/// Undirected single-pair Dijkstra via pgRouting, returning the traversed
/// edges with geometry so the merged line can be stitched in order.
pub async fn shortest_edge_path<'c, E>(
    executor: E,
    from_vertex: i64,
    to_vertex: i64,
    cost: &EdgeCost,
) -> StoreResult<Option<EdgePath>>
where
    E: Executor<'c, Database = Postgres>,
{
    let inner = render_inner_query(cost);
    let rows: Vec<PathEdgeRow> = sqlx::query_as(
        "
        SELECT
            p.edge AS edge_id,
            e.length_m,
            ST_AsGeoJSON(e.geom) AS geometry
        FROM pgr_dijkstra($1, $2, $3, directed := false) AS p
        JOIN road_edges e ON e.id = p.edge
        WHERE p.edge <> -1
        ORDER BY p.seq;
        ",
    )
    .bind(inner)
    .bind(from_vertex)
    .bind(to_vertex)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;

    if rows.is_empty() {
        // pgr_dijkstra yields no rows both for "no path" and for
        // from == to; the caller separates those cases.
        return Ok(if from_vertex == to_vertex {
            Some(EdgePath::default())
        } else {
            None
        });
    }

    let parts: Vec<Polyline> =
        rows.iter().filter_map(PathEdgeRow::polyline).collect();
    Ok(Some(EdgePath {
        edge_ids: rows.iter().map(|row| row.edge_id).collect(),
        total_length_m: rows.iter().map(|row| row.length_m).sum(),
        geometry: Polyline::stitch(&parts),
    }))
}

pub async fn edge_geometry_and_length<'c, E>(
    executor: E,
    edge_id: i64,
) -> StoreResult<Option<(Polyline, f64)>>
where
    E: Executor<'c, Database = Postgres>,
{
    let row: Option<EdgeGeometryRow> = sqlx::query_as(
        "
        SELECT ST_AsGeoJSON(geom) AS geometry, length_m
        FROM road_edges
        WHERE id = $1;
        ",
    )
    .bind(edge_id)
    .fetch_optional(executor)
    .await
    .map_err(convert_error)?;

    Ok(row.and_then(|row| {
        let length_m = row.length_m;
        row.polyline().map(|polyline| (polyline, length_m))
    }))
}

/// Edges whose geometry lies within `radius_m` of the point (geodesic).
pub async fn edges_within<'c, E>(
    executor: E,
    point: &Location,
    radius_m: f64,
) -> StoreResult<Vec<i64>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar(
        "
        SELECT id
        FROM road_edges
        WHERE ST_DWithin(
            geom::geography,
            ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography,
            $3
        )
        ORDER BY id;
        ",
    )
    .bind(point.longitude)
    .bind(point.latitude)
    .bind(radius_m)
    .fetch_all(executor)
    .await
    .map_err(convert_error)
}

pub async fn road_ids<'c, E>(executor: E) -> StoreResult<Vec<i64>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar("SELECT id FROM road_edges ORDER BY id;")
        .fetch_all(executor)
        .await
        .map_err(convert_error)
}
