use model::{DgviStats, GviMonth};
use planner::store::StoreResult;
use sqlx::{Executor, Postgres};

use crate::data_model::DgviStatsRow;

use super::convert_error;

/// Upserts raw per-road values for one month. `dgvi_normalized` is reset to
/// 0 here and recomputed by `normalize_month` once the batch run finished.
pub async fn upsert<'c, E>(
    executor: E,
    month: &GviMonth,
    rows: &[(i64, f64)],
) -> StoreResult<()>
where
    E: Executor<'c, Database = Postgres>,
{
    if rows.is_empty() {
        return Ok(());
    }
    let road_ids: Vec<i64> = rows.iter().map(|(road_id, _)| *road_id).collect();
    let values: Vec<f64> = rows.iter().map(|(_, value)| *value).collect();

    sqlx::query(
        "
        INSERT INTO road_dgvi (road_id, month, dgvi, dgvi_normalized)
        SELECT road_id, $1, dgvi, 0
        FROM UNNEST($2::bigint[], $3::float8[]) AS t(road_id, dgvi)
        ON CONFLICT (road_id, month)
        DO UPDATE SET
            dgvi = EXCLUDED.dgvi,
            dgvi_normalized = EXCLUDED.dgvi_normalized;
        ",
    )
    .bind(month.as_str())
    .bind(&road_ids)
    .bind(&values)
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(())
}

/// Min-max normalization over all rows of one month; a degenerate month
/// (min == max) normalizes to all zeros.
pub async fn normalize_month<'c, E>(executor: E, month: &GviMonth) -> StoreResult<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        WITH bounds AS (
            SELECT MIN(dgvi) AS lo, MAX(dgvi) AS hi
            FROM road_dgvi
            WHERE month = $1
        )
        UPDATE road_dgvi
        SET dgvi_normalized = CASE
            WHEN bounds.hi = bounds.lo THEN 0
            ELSE (dgvi - bounds.lo) / (bounds.hi - bounds.lo)
        END
        FROM bounds
        WHERE month = $1;
        ",
    )
    .bind(month.as_str())
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(())
}

pub async fn available_months<'c, E>(executor: E) -> StoreResult<Vec<GviMonth>>
where
    E: Executor<'c, Database = Postgres>,
{
    let months: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT month FROM road_dgvi ORDER BY month DESC;",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;

    Ok(months
        .iter()
        .filter_map(|raw| GviMonth::parse(raw).ok())
        .collect())
}

pub async fn stats<'c, E>(
    executor: E,
    month: &GviMonth,
) -> StoreResult<Option<DgviStats>>
where
    E: Executor<'c, Database = Postgres>,
{
    let row: DgviStatsRow = sqlx::query_as(
        "
        SELECT
            COUNT(*) AS road_count,
            MIN(dgvi) AS min_dgvi,
            MAX(dgvi) AS max_dgvi,
            AVG(dgvi) AS mean_dgvi
        FROM road_dgvi
        WHERE month = $1;
        ",
    )
    .bind(month.as_str())
    .fetch_one(executor)
    .await
    .map_err(convert_error)?;

    Ok(row.to_model(month))
}
