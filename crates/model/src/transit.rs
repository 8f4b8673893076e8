use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::geometry::Location;

/// A user-facing stop aggregate ("Odenplan"). A site owns one or more stop
/// points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: i64,
    pub name: String,
    pub location: Location,
}

/// A site annotated with the straight-line distance from a query point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbySite {
    #[serde(flatten)]
    pub site: Site,
    pub walking_distance_m: f64,
}

/// A specific platform with a direction; belongs to exactly one site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopPoint {
    pub id: i64,
    pub site_id: i64,
    pub name: String,
    pub direction_code: i32,
    pub location: Location,
}

/// The successor of a stop point on one (line, direction).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextStop {
    pub stop_point_id: i64,
    pub site_id: i64,
    pub name: String,
}

/// One forecast bus departure at a stop point (transient, from the feed).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Departure {
    pub journey_id: i64,
    pub line_id: i64,
    pub line_designation: String,
    pub direction_code: i32,
    pub stop_point_id: i64,
    pub stop_point_name: String,
    pub expected: DateTime<Local>,
    pub destination: String,
}
