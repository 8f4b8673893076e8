use model::{DgviStats, GviMonth, GviPoint, Location, MatchedGviPoint};
use sqlx::prelude::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct MatchedPointRow {
    pub parameter: f64,
    pub value: f64,
}

impl MatchedPointRow {
    pub fn to_model(&self) -> MatchedGviPoint {
        MatchedGviPoint {
            parameter: self.parameter,
            value: self.value,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct GviPointRow {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub month: String,
    pub value: f64,
}

impl GviPointRow {
    pub fn to_model(self) -> Option<GviPoint> {
        Some(GviPoint {
            id: self.id,
            location: Location::new(self.latitude, self.longitude),
            month: GviMonth::parse(&self.month).ok()?,
            value: self.value,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DgviStatsRow {
    pub road_count: i64,
    pub min_dgvi: Option<f64>,
    pub max_dgvi: Option<f64>,
    pub mean_dgvi: Option<f64>,
}

impl DgviStatsRow {
    pub fn to_model(self, month: &GviMonth) -> Option<DgviStats> {
        if self.road_count == 0 {
            return None;
        }
        Some(DgviStats {
            month: month.clone(),
            road_count: self.road_count,
            min_dgvi: self.min_dgvi?,
            max_dgvi: self.max_dgvi?,
            mean_dgvi: self.mean_dgvi?,
        })
    }
}
