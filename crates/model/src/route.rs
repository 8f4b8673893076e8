use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::{
    geometry::{Location, Polyline},
    gvi::GviMonth,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteType {
    Walking,
    DirectBus,
    TransferBus,
}

/// Walking between two stop points of the same site during a transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntraSiteTransfer {
    pub from_stop_point: i64,
    pub to_stop_point: i64,
    pub site_id: i64,
}

/// Transfer context attached to the second waiting segment of a
/// transfer route.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferDetails {
    pub waiting_seconds: f64,
    pub from_line: String,
    pub to_line: String,
    pub intra_site_walk: bool,
    pub transfer_margin_seconds: f64,
}

/// A stop point reference carried on ride segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRef {
    pub stop_point_id: i64,
    pub site_id: i64,
    pub name: String,
    pub location: Location,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    Walking {
        duration_s: f64,
        distance_m: f64,
        edge_ids: Vec<i64>,
        geometry: Polyline,
        /// Set when this leg walks between stop points inside one site.
        intra_site: Option<IntraSiteTransfer>,
    },
    BusWaiting {
        duration_s: f64,
        stop_point_id: i64,
        site_id: i64,
        location: Location,
        line_id: i64,
        line_designation: String,
        direction_code: i32,
        expected_departure: DateTime<Local>,
        transfer: Option<TransferDetails>,
    },
    BusRide {
        duration_s: f64,
        from_stop: StopRef,
        to_stop: StopRef,
        line_id: i64,
        line_designation: String,
        direction_code: i32,
        expected_departure: DateTime<Local>,
        expected_arrival: DateTime<Local>,
        /// Reconstructed for the map only; never DGVI-scored.
        geometry: Polyline,
        edge_ids: Vec<i64>,
        intermediate_stops: Vec<String>,
    },
}

impl Segment {
    pub fn duration_s(&self) -> f64 {
        match self {
            Segment::Walking { duration_s, .. }
            | Segment::BusWaiting { duration_s, .. }
            | Segment::BusRide { duration_s, .. } => *duration_s,
        }
    }

    pub fn is_walking(&self) -> bool {
        matches!(self, Segment::Walking { .. })
    }

    pub fn is_intra_site_walk(&self) -> bool {
        matches!(
            self,
            Segment::Walking {
                intra_site: Some(_),
                ..
            }
        )
    }
}

/// One planned journey candidate with its scoring fields. Scores are zero
/// until the candidate survives ranking (see planner scoring).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlan {
    pub id: String,
    pub route_type: RouteType,
    pub origin: Location,
    pub destination: Location,
    pub segments: Vec<Segment>,
    pub month: GviMonth,
    /// Transfer routes estimated with the inter-stop heuristic.
    pub approximate: bool,
    pub total_duration_s: f64,
    pub total_ac_dgvi: f64,
    pub duration_score: f64,
    pub ac_dgvi_score: f64,
    pub total_score: f64,
}

impl RoutePlan {
    pub fn new(
        id: String,
        route_type: RouteType,
        origin: Location,
        destination: Location,
        segments: Vec<Segment>,
        month: GviMonth,
    ) -> Self {
        let total_duration_s = segments.iter().map(Segment::duration_s).sum();
        Self {
            id,
            route_type,
            origin,
            destination,
            segments,
            month,
            approximate: false,
            total_duration_s,
            total_ac_dgvi: 0.0,
            duration_score: 0.0,
            ac_dgvi_score: 0.0,
            total_score: 0.0,
        }
    }

    /// All walking edge ids, sorted — two walking routes with the same
    /// fingerprint are considered duplicates.
    pub fn edge_fingerprint(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Walking { edge_ids, .. } => Some(edge_ids.iter().copied()),
                _ => None,
            })
            .flatten()
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn walking_distance_m(&self) -> f64 {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Walking { distance_m, .. } => Some(*distance_m),
                _ => None,
            })
            .sum()
    }

    /// Checks the segment-sequence rules: waiting is immediately followed by
    /// a ride boarding at the same stop on the same line and direction, and
    /// back-to-back walking legs only occur around an intra-site transfer.
    pub fn segments_consistent(&self) -> bool {
        for pair in self.segments.windows(2) {
            match (&pair[0], &pair[1]) {
                (
                    Segment::BusWaiting {
                        stop_point_id,
                        line_id,
                        direction_code,
                        ..
                    },
                    Segment::BusRide {
                        from_stop,
                        line_id: ride_line,
                        direction_code: ride_direction,
                        ..
                    },
                ) => {
                    if from_stop.stop_point_id != *stop_point_id
                        || ride_line != line_id
                        || ride_direction != direction_code
                    {
                        return false;
                    }
                }
                (Segment::BusWaiting { .. }, _) => return false,
                (a, b) if a.is_walking() && b.is_walking() => {
                    if !a.is_intra_site_walk() && !b.is_intra_site_walk() {
                        return false;
                    }
                }
                _ => {}
            }
        }
        true
    }

    pub fn ride_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|segment| matches!(segment, Segment::BusRide { .. }))
            .count()
    }
}
