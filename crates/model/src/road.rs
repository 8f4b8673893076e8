use serde::{Deserialize, Serialize};

use crate::geometry::{Location, Polyline};

/// An edge of the routable road network.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadEdge {
    pub id: i64,
    pub geometry: Polyline,
    pub length_m: f64,
    /// Min-max normalized length over the whole graph, in [0, 1].
    pub length_normalized: f64,
    pub source: i64,
    pub target: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadVertex {
    pub id: i64,
    pub location: Location,
}
