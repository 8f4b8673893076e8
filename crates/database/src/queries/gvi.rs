use model::{GviMonth, GviPoint, MatchedGviPoint};
use planner::store::StoreResult;
use sqlx::{Executor, Postgres};

use crate::data_model::{GviPointRow, MatchedPointRow};

use super::convert_error;

/// GVI samples of one month within a 1 m buffer of the edge geometry, each
/// projected onto the line (`ST_LineLocatePoint`) to get its parameter.
pub async fn matched_points_for_edge<'c, E>(
    executor: E,
    edge_id: i64,
    month: &GviMonth,
) -> StoreResult<Vec<MatchedGviPoint>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<MatchedPointRow> = sqlx::query_as(
        "
        SELECT
            ST_LineLocatePoint(e.geom, p.geom) AS parameter,
            p.value
        FROM road_edges e
        JOIN gvi_points p
          ON ST_DWithin(e.geom::geography, p.geom::geography, 1.0)
        WHERE e.id = $1 AND p.month = $2
        ORDER BY parameter;
        ",
    )
    .bind(edge_id)
    .bind(month.as_str())
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;

    Ok(rows.iter().map(MatchedPointRow::to_model).collect())
}

pub async fn points_for_month<'c, E>(
    executor: E,
    month: &GviMonth,
    limit: usize,
) -> StoreResult<Vec<GviPoint>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<GviPointRow> = sqlx::query_as(
        "
        SELECT
            id,
            ST_Y(geom) AS latitude,
            ST_X(geom) AS longitude,
            month,
            value
        FROM gvi_points
        WHERE month = $1
        ORDER BY id
        LIMIT $2;
        ",
    )
    .bind(month.as_str())
    .bind(limit as i64)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;

    Ok(rows.into_iter().filter_map(GviPointRow::to_model).collect())
}

pub async fn insert_points<'c, E>(
    executor: E,
    points: &[GviPoint],
) -> StoreResult<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    if points.is_empty() {
        return Ok(0);
    }
    // One statement via UNNEST keeps the batch atomic.
    let longitudes: Vec<f64> =
        points.iter().map(|p| p.location.longitude).collect();
    let latitudes: Vec<f64> = points.iter().map(|p| p.location.latitude).collect();
    let months: Vec<String> =
        points.iter().map(|p| p.month.as_str().to_owned()).collect();
    let values: Vec<f64> = points.iter().map(|p| p.value).collect();

    let result = sqlx::query(
        "
        INSERT INTO gvi_points (geom, month, value)
        SELECT
            ST_SetSRID(ST_MakePoint(lon, lat), 4326),
            month,
            value
        FROM UNNEST($1::float8[], $2::float8[], $3::text[], $4::float8[])
            AS t(lon, lat, month, value);
        ",
    )
    .bind(&longitudes)
    .bind(&latitudes)
    .bind(&months)
    .bind(&values)
    .execute(executor)
    .await
    .map_err(convert_error)?;

    Ok(result.rows_affected())
}
