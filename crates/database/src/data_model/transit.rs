use model::{Location, NearbySite, NextStop, Site, StopPoint};
use sqlx::prelude::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct NearbySiteRow {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_m: f64,
}

impl NearbySiteRow {
    pub fn to_model(self) -> NearbySite {
        NearbySite {
            site: Site {
                id: self.id,
                name: self.name,
                location: Location::new(self.latitude, self.longitude),
            },
            walking_distance_m: self.distance_m,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StopPointRow {
    pub id: i64,
    pub site_id: i64,
    pub name: String,
    pub direction_code: i32,
    pub latitude: f64,
    pub longitude: f64,
}

impl StopPointRow {
    pub fn to_model(self) -> StopPoint {
        StopPoint {
            id: self.id,
            site_id: self.site_id,
            name: self.name,
            direction_code: self.direction_code,
            location: Location::new(self.latitude, self.longitude),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct NextStopRow {
    pub stop_point_id: i64,
    pub site_id: i64,
    pub name: String,
}

impl NextStopRow {
    pub fn to_model(self) -> NextStop {
        NextStop {
            stop_point_id: self.stop_point_id,
            site_id: self.site_id,
            name: self.name,
        }
    }
}
