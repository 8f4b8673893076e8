use geojson::{Geometry, Value};
use serde::{Deserialize, Serialize};
use utility::geo::haversine_distance;

/// A point on the earth in WGS84.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance in meters.
    pub fn distance_to(&self, other: &Location) -> f64 {
        haversine_distance(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}

/// An ordered list of `[longitude, latitude]` coordinates (GeoJSON axis
/// order), used for road-edge and route geometries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline(pub Vec<[f64; 2]>);

impl Polyline {
    pub fn new(coordinates: Vec<[f64; 2]>) -> Self {
        Self(coordinates)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&[f64; 2]> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&[f64; 2]> {
        self.0.last()
    }

    pub fn reversed(&self) -> Polyline {
        let mut coordinates = self.0.clone();
        coordinates.reverse();
        Polyline(coordinates)
    }

    pub fn to_geojson(&self) -> Geometry {
        Geometry::new(Value::LineString(
            self.0.iter().map(|c| c.to_vec()).collect(),
        ))
    }

    pub fn from_geojson(geometry: &Geometry) -> Option<Polyline> {
        match &geometry.value {
            Value::LineString(coordinates) => Some(Polyline(
                coordinates
                    .iter()
                    .filter_map(|c| Some([*c.first()?, *c.get(1)?]))
                    .collect(),
            )),
            Value::MultiLineString(lines) => {
                let mut parts = lines.iter().map(|coordinates| {
                    Polyline(
                        coordinates
                            .iter()
                            .filter_map(|c| Some([*c.first()?, *c.get(1)?]))
                            .collect(),
                    )
                });
                let first = parts.next()?;
                Some(parts.fold(first, |mut acc, part| {
                    acc.append_connected(&part);
                    acc
                }))
            }
            _ => None,
        }
    }

    /// Parses the string form returned by `ST_AsGeoJSON`.
    pub fn from_geojson_str(raw: &str) -> Option<Polyline> {
        let geometry: Geometry = raw.parse().ok()?;
        Self::from_geojson(&geometry)
    }

    /// Appends `other`, orienting it so that the shared boundary point lines
    /// up and dropping the duplicated coordinate.
    pub fn append_connected(&mut self, other: &Polyline) {
        if other.is_empty() {
            return;
        }
        let Some(last) = self.last().copied() else {
            self.0.extend_from_slice(&other.0);
            return;
        };
        if other.first() == Some(&last) {
            self.0.extend(other.0.iter().skip(1));
        } else if other.last() == Some(&last) {
            self.0.extend(other.0.iter().rev().skip(1));
        } else {
            self.0.extend_from_slice(&other.0);
        }
    }

    /// Stitches per-edge geometries into one line, following traversal order.
    /// The first edge is oriented by looking ahead at the second.
    pub fn stitch(parts: &[Polyline]) -> Polyline {
        let mut merged = Polyline::default();
        for (index, part) in parts.iter().enumerate() {
            if merged.is_empty() {
                let oriented = match (parts.get(index + 1), part.first(), part.last())
                {
                    (Some(next), Some(first), _)
                        if next.first() == Some(first)
                            || next.last() == Some(first) =>
                    {
                        part.reversed()
                    }
                    _ => part.clone(),
                };
                merged.0.extend_from_slice(&oriented.0);
            } else {
                merged.append_connected(part);
            }
        }
        merged
    }
}
