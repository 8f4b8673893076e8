//! The journey planning endpoint and the API projection of route plans.

use axum::{extract::State, Json};
use geojson::{Feature, FeatureCollection};
use model::{GviMonth, Location, Preferences, RoutePlan, RouteType, Segment};
use planner::plan::PlanRequest;
use serde::{Deserialize, Serialize};
use serde_json::Map;
use tokio_util::sync::CancellationToken;

use crate::{
    common::{RouteErrorResponse, RouteResult},
    WebState,
};

#[derive(Debug, Clone, Deserialize)]
pub struct ApiPoint {
    pub lat: f64,
    pub lon: f64,
}

impl ApiPoint {
    fn location(&self) -> Location {
        Location::new(self.lat, self.lon)
    }
}

#[derive(Debug, Deserialize)]
pub struct PlanRoutesBody {
    pub origin: ApiPoint,
    pub destination: ApiPoint,
    #[serde(default)]
    pub gvi_month: Option<String>,
    #[serde(default)]
    pub preferences: Option<Preferences>,
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct PlanRoutesResponse {
    pub success: bool,
    pub request: RequestEcho,
    pub results: PlanResults,
}

#[derive(Debug, Serialize)]
pub struct RequestEcho {
    pub origin: LatLon,
    pub destination: LatLon,
    pub gvi_month: String,
    pub preferences: Preferences,
    pub max_results: usize,
}

#[derive(Debug, Serialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Serialize)]
pub struct PlanResults {
    pub total_routes: usize,
    pub routes: Vec<RouteApi>,
}

pub async fn plan_routes(
    State(WebState { planner, .. }): State<WebState>,
    Json(body): Json<PlanRoutesBody>,
) -> RouteResult<PlanRoutesResponse> {
    let month = body
        .gvi_month
        .as_deref()
        .map(GviMonth::parse)
        .transpose()
        .map_err(|why| RouteErrorResponse::bad_request(why.to_string()))?;

    let request = PlanRequest {
        origin: body.origin.location(),
        destination: body.destination.location(),
        month,
        preferences: body.preferences.unwrap_or_default(),
        max_results: body.max_results.unwrap_or(4),
    };
    let echo_preferences = request.preferences;
    let echo_max_results = request.max_results;

    let outcome = planner
        .plan_routes(request, CancellationToken::new())
        .await?;

    Ok(Json(PlanRoutesResponse {
        success: true,
        request: RequestEcho {
            origin: LatLon {
                lat: body.origin.lat,
                lon: body.origin.lon,
            },
            destination: LatLon {
                lat: body.destination.lat,
                lon: body.destination.lon,
            },
            gvi_month: outcome.month.to_string(),
            preferences: echo_preferences,
            max_results: echo_max_results,
        },
        results: PlanResults {
            total_routes: outcome.routes.len(),
            routes: outcome.routes.iter().map(RouteApi::from_plan).collect(),
        },
    }))
}

// ── API projection ──────────────────────────────────────────────────────

#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize)]
pub struct RouteApi {
    pub route_id: String,
    pub route_type: RouteType,
    /// Whole seconds.
    pub total_duration: i64,
    pub duration_score: f64,
    pub acdgvi_score: f64,
    pub total_acdgvi: f64,
    pub total_score: f64,
    pub gvi_data_month: String,
    pub approximate: bool,
    pub summary: String,
    pub instructions: Vec<String>,
    pub timing_details: Vec<String>,
    pub transfer_summary: Option<String>,
    pub geojson: FeatureCollection,
    pub segments: Vec<Segment>,
}

impl RouteApi {
    pub fn from_plan(plan: &RoutePlan) -> Self {
        Self {
            route_id: plan.id.clone(),
            route_type: plan.route_type,
            total_duration: plan.total_duration_s.round() as i64,
            duration_score: plan.duration_score,
            acdgvi_score: plan.ac_dgvi_score,
            total_acdgvi: plan.total_ac_dgvi,
            total_score: plan.total_score,
            gvi_data_month: plan.month.to_string(),
            approximate: plan.approximate,
            summary: summary(plan),
            instructions: plan.segments.iter().map(instruction).collect(),
            timing_details: plan.segments.iter().map(timing_detail).collect(),
            transfer_summary: transfer_summary(plan),
            geojson: feature_collection(plan),
            segments: plan.segments.clone(),
        }
    }
}

fn minutes(duration_s: f64) -> i64 {
    (duration_s / 60.0).round() as i64
}

fn summary(plan: &RoutePlan) -> String {
    let total_min = minutes(plan.total_duration_s);
    match plan.route_type {
        RouteType::Walking => {
            let km = plan.walking_distance_m() / 1000.0;
            format!("Walk {km:.1} km ({total_min} min)")
        }
        RouteType::DirectBus => {
            let line = plan
                .segments
                .iter()
                .find_map(|segment| match segment {
                    Segment::BusRide {
                        line_designation, ..
                    } => Some(line_designation.clone()),
                    _ => None,
                })
                .unwrap_or_default();
            format!("Bus {line} ({total_min} min)")
        }
        RouteType::TransferBus => {
            let lines: Vec<String> = plan
                .segments
                .iter()
                .filter_map(|segment| match segment {
                    Segment::BusRide {
                        line_designation, ..
                    } => Some(line_designation.clone()),
                    _ => None,
                })
                .collect();
            format!("Bus {} ({total_min} min)", lines.join(" then "))
        }
    }
}

fn instruction(segment: &Segment) -> String {
    match segment {
        Segment::Walking {
            duration_s,
            distance_m,
            intra_site,
            ..
        } => {
            if intra_site.is_some() {
                "Walk to the connecting platform".to_owned()
            } else {
                format!(
                    "Walk {:.0} m ({} min)",
                    distance_m,
                    minutes(*duration_s).max(1)
                )
            }
        }
        Segment::BusWaiting {
            duration_s,
            line_designation,
            expected_departure,
            ..
        } => format!(
            "Wait {} min for bus {line_designation} (departs {})",
            minutes(*duration_s).max(1),
            expected_departure.format("%H:%M")
        ),
        Segment::BusRide {
            line_designation,
            from_stop,
            to_stop,
            intermediate_stops,
            ..
        } => format!(
            "Ride bus {line_designation} from {} to {} ({} stops)",
            from_stop.name,
            to_stop.name,
            intermediate_stops.len() + 1
        ),
    }
}

fn timing_detail(segment: &Segment) -> String {
    match segment {
        Segment::Walking { duration_s, .. } => {
            format!("walking: {:.0} s", duration_s)
        }
        Segment::BusWaiting {
            duration_s,
            expected_departure,
            ..
        } => format!(
            "waiting: {:.0} s (until {})",
            duration_s,
            expected_departure.format("%H:%M:%S")
        ),
        Segment::BusRide {
            duration_s,
            expected_departure,
            expected_arrival,
            ..
        } => format!(
            "bus ride: {:.0} s ({} – {})",
            duration_s,
            expected_departure.format("%H:%M:%S"),
            expected_arrival.format("%H:%M:%S")
        ),
    }
}

fn transfer_summary(plan: &RoutePlan) -> Option<String> {
    plan.segments.iter().find_map(|segment| match segment {
        Segment::BusWaiting {
            transfer: Some(details),
            ..
        } => Some(if details.intra_site_walk {
            format!(
                "Line {} → short walk → Line {}",
                details.from_line, details.to_line
            )
        } else {
            format!("Line {} → Line {}", details.from_line, details.to_line)
        }),
        _ => None,
    })
}

fn feature_collection(plan: &RoutePlan) -> FeatureCollection {
    let mut features = vec![];

    for segment in &plan.segments {
        match segment {
            Segment::Walking {
                duration_s,
                distance_m,
                geometry,
                intra_site,
                ..
            } => {
                if geometry.is_empty() {
                    continue;
                }
                let mut properties = Map::new();
                properties.insert("segment".to_owned(), "walking".into());
                properties.insert("duration_s".to_owned(), (*duration_s).into());
                properties.insert("distance_m".to_owned(), (*distance_m).into());
                properties.insert(
                    "intra_site_transfer".to_owned(),
                    intra_site.is_some().into(),
                );
                features.push(Feature {
                    geometry: Some(geometry.to_geojson()),
                    properties: Some(properties),
                    id: None,
                    bbox: None,
                    foreign_members: None,
                });
            }
            Segment::BusWaiting {
                duration_s,
                location,
                line_designation,
                ..
            } => {
                let mut properties = Map::new();
                properties.insert("segment".to_owned(), "bus_waiting".into());
                properties.insert("duration_s".to_owned(), (*duration_s).into());
                properties
                    .insert("line".to_owned(), line_designation.clone().into());
                features.push(Feature {
                    geometry: Some(geojson::Geometry::new(
                        geojson::Value::Point(vec![
                            location.longitude,
                            location.latitude,
                        ]),
                    )),
                    properties: Some(properties),
                    id: None,
                    bbox: None,
                    foreign_members: None,
                });
            }
            Segment::BusRide {
                duration_s,
                geometry,
                line_designation,
                ..
            } => {
                if geometry.is_empty() {
                    continue;
                }
                let mut properties = Map::new();
                properties.insert("segment".to_owned(), "bus_ride".into());
                properties.insert("duration_s".to_owned(), (*duration_s).into());
                properties
                    .insert("line".to_owned(), line_designation.clone().into());
                features.push(Feature {
                    geometry: Some(geometry.to_geojson()),
                    properties: Some(properties),
                    id: None,
                    bbox: None,
                    foreign_members: None,
                });
            }
        }
    }

    FeatureCollection {
        features,
        bbox: None,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use model::Polyline;

    use super::*;

    fn month() -> GviMonth {
        GviMonth::parse("2025-08").unwrap()
    }

    fn walking_plan() -> RoutePlan {
        let mut plan = RoutePlan::new(
            "walking-user".into(),
            RouteType::Walking,
            Location::new(59.3446, 18.0577),
            Location::new(59.3433, 18.0506),
            vec![Segment::Walking {
                duration_s: 600.0,
                distance_m: 840.0,
                edge_ids: vec![1, 2, 3],
                geometry: Polyline::new(vec![[18.0577, 59.3446], [18.0506, 59.3433]]),
                intra_site: None,
            }],
            month(),
        );
        plan.duration_score = 1.0;
        plan.total_score = 1.0;
        plan
    }

    #[test]
    fn walking_projection_has_line_feature_and_summary() {
        let api = RouteApi::from_plan(&walking_plan());
        assert_eq!(api.route_type, RouteType::Walking);
        assert_eq!(api.total_duration, 600);
        assert_eq!(api.geojson.features.len(), 1);
        assert!(api.summary.starts_with("Walk 0.8 km"));
        assert!(api.transfer_summary.is_none());
        assert_eq!(api.instructions.len(), 1);
    }

    #[test]
    fn total_duration_is_rounded_to_whole_seconds() {
        let mut plan = walking_plan();
        plan.total_duration_s = 599.6;
        let api = RouteApi::from_plan(&plan);
        assert_eq!(api.total_duration, 600);
    }
}
