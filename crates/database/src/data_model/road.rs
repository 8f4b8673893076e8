use model::Polyline;
use sqlx::prelude::FromRow;

/// One edge of a solved path, in traversal order.
#[derive(Debug, Clone, FromRow)]
pub struct PathEdgeRow {
    pub edge_id: i64,
    pub length_m: f64,
    pub geometry: String,
}

impl PathEdgeRow {
    pub fn polyline(&self) -> Option<Polyline> {
        Polyline::from_geojson_str(&self.geometry)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct EdgeGeometryRow {
    pub geometry: String,
    pub length_m: f64,
}

impl EdgeGeometryRow {
    pub fn polyline(&self) -> Option<Polyline> {
        Polyline::from_geojson_str(&self.geometry)
    }
}
