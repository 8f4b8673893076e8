//! Wire types of the departures endpoint. Only the fields the planner
//! consumes are modeled; unknown fields are ignored on deserialization.

use chrono::{DateTime, Local};
use serde::Deserialize;

use model::Departure;

#[derive(Debug, Clone, Deserialize)]
pub struct DeparturesResponse {
    #[serde(default)]
    pub departures: Vec<ApiDeparture>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransportMode {
    Bus,
    Tram,
    Metro,
    Train,
    Ship,
    Ferry,
    Taxi,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiDeparture {
    pub journey: ApiJourney,
    pub line: ApiLine,
    pub stop_point: ApiStopPoint,
    pub direction_code: i32,
    #[serde(deserialize_with = "utility::serde::date_time::deserialize_local")]
    pub expected: DateTime<Local>,
    #[serde(default)]
    pub destination: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiJourney {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiLine {
    pub id: i64,
    pub designation: String,
    pub transport_mode: TransportMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiStopPoint {
    pub id: i64,
    pub name: String,
}

impl ApiDeparture {
    pub fn is_bus(&self) -> bool {
        self.line.transport_mode == TransportMode::Bus
    }

    pub fn into_departure(self) -> Departure {
        Departure {
            journey_id: self.journey.id,
            line_id: self.line.id,
            line_designation: self.line.designation,
            direction_code: self.direction_code,
            stop_point_id: self.stop_point.id,
            stop_point_name: self.stop_point.name,
            expected: self.expected,
            destination: self.destination,
        }
    }
}
