//! In-memory fixtures used by the planner tests. The stub store implements
//! the full query surface over hand-crafted graphs, so the orchestration
//! logic can be exercised without a database.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering as AtomicOrdering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Local};
use model::{
    Departure, DgviStats, GviMonth, GviPoint, Location, MatchedGviPoint, NearbySite,
    NextStop, Polyline, Site, StopPoint,
};

use crate::{
    feed::DepartureFeed,
    store::{EdgeCost, EdgePath, SpatialStore, StoreResult},
};

pub const FIXTURE_MONTH: &str = "2025-08";

// ── Stub feed ────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct StubFeed {
    departures: HashMap<i64, Vec<Departure>>,
    failing: HashSet<i64>,
    fail_all: bool,
    calls: AtomicUsize,
}

impl StubFeed {
    pub fn push_departure(&mut self, site_id: i64, departure: Departure) {
        self.departures.entry(site_id).or_default().push(departure);
    }

    pub fn fail_site(&mut self, site_id: i64) {
        self.failing.insert(site_id);
    }

    pub fn fail_all(&mut self) {
        self.fail_all = true;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }
}

#[async_trait]
impl DepartureFeed for StubFeed {
    async fn departures(&self, site_id: i64, _forecast: Duration) -> Vec<Departure> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        if self.fail_all || self.failing.contains(&site_id) {
            return vec![];
        }
        self.departures.get(&site_id).cloned().unwrap_or_default()
    }
}

/// A departure `offset_s` seconds from now.
pub fn departure(
    journey_id: i64,
    line_id: i64,
    direction_code: i32,
    stop_point_id: i64,
    offset_s: i64,
) -> Departure {
    Departure {
        journey_id,
        line_id,
        line_designation: format!("{line_id}"),
        direction_code,
        stop_point_id,
        stop_point_name: format!("stop {stop_point_id}"),
        expected: Local::now() + ChronoDuration::seconds(offset_s),
        destination: "End of line".to_owned(),
    }
}

// ── Stub store ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StubEdge {
    pub id: i64,
    pub source: i64,
    pub target: i64,
    pub length_m: f64,
    pub length_normalized: f64,
    pub geometry: Polyline,
}

#[derive(Default)]
pub struct StubStore {
    pub vertices: HashMap<i64, Location>,
    pub edges: HashMap<i64, StubEdge>,
    pub dgvi_normalized: HashMap<(i64, GviMonth), f64>,
    pub dgvi_raw: HashMap<(i64, GviMonth), f64>,
    pub matched_points: HashMap<(i64, GviMonth), Vec<MatchedGviPoint>>,
    pub sites: Vec<Site>,
    pub stop_points: HashMap<i64, StopPoint>,
    pub successors: HashMap<(i64, i32, i64), NextStop>,
    pub inserted_gvi: Mutex<Vec<GviPoint>>,
    pub upserted_dgvi: Mutex<Vec<(i64, f64)>>,
    pub normalize_calls: AtomicUsize,
}

impl StubStore {
    pub fn add_vertex(&mut self, id: i64, lat: f64, lon: f64) {
        self.vertices.insert(id, Location::new(lat, lon));
    }

    pub fn add_edge(
        &mut self,
        id: i64,
        source: i64,
        target: i64,
        length_m: f64,
        length_normalized: f64,
    ) {
        let geometry = Polyline::new(vec![
            self.coordinate(source),
            self.coordinate(target),
        ]);
        self.edges.insert(
            id,
            StubEdge {
                id,
                source,
                target,
                length_m,
                length_normalized,
                geometry,
            },
        );
    }

    pub fn set_dgvi(&mut self, edge_id: i64, month: &str, normalized: f64) {
        let month = GviMonth::parse(month).unwrap();
        self.dgvi_normalized
            .insert((edge_id, month.clone()), normalized);
        self.dgvi_raw.insert((edge_id, month), normalized * 100.0);
    }

    pub fn add_site(&mut self, id: i64, name: &str, lat: f64, lon: f64) {
        self.sites.push(Site {
            id,
            name: name.to_owned(),
            location: Location::new(lat, lon),
        });
    }

    pub fn add_stop_point(
        &mut self,
        id: i64,
        site_id: i64,
        direction_code: i32,
        lat: f64,
        lon: f64,
    ) {
        self.stop_points.insert(
            id,
            StopPoint {
                id,
                site_id,
                name: format!("stop {id}"),
                direction_code,
                location: Location::new(lat, lon),
            },
        );
    }

    pub fn add_successor(
        &mut self,
        line_id: i64,
        direction_code: i32,
        stop_point_id: i64,
        next_stop_point_id: i64,
    ) {
        let next = &self.stop_points[&next_stop_point_id];
        self.successors.insert(
            (line_id, direction_code, stop_point_id),
            NextStop {
                stop_point_id: next.id,
                site_id: next.site_id,
                name: next.name.clone(),
            },
        );
    }

    fn coordinate(&self, vertex: i64) -> [f64; 2] {
        let location = &self.vertices[&vertex];
        [location.longitude, location.latitude]
    }

    fn edge_cost(&self, edge: &StubEdge, cost: &EdgeCost) -> f64 {
        match cost {
            EdgeCost::PureLength => edge.length_m,
            EdgeCost::Preference {
                w_time,
                w_green,
                month,
            } => {
                let dgvi = self
                    .dgvi_normalized
                    .get(&(edge.id, month.clone()))
                    .copied()
                    .unwrap_or(0.0);
                w_time * edge.length_normalized + w_green * (1.0 - dgvi)
            }
        }
    }
}

/// `f64`-keyed min-heap entry for the stub Dijkstra.
struct MinScored(f64, (i64, Option<i64>));

impl PartialEq for MinScored {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for MinScored {}
impl PartialOrd for MinScored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for MinScored {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.total_cmp(&self.0)
    }
}

#[async_trait]
impl SpatialStore for StubStore {
    async fn nearest_vertex(&self, point: &Location) -> StoreResult<Option<i64>> {
        let mut best: Option<(f64, i64)> = None;
        for (&id, location) in &self.vertices {
            let distance = point.distance_to(location);
            let better = match best {
                None => true,
                Some((best_distance, best_id)) => {
                    distance < best_distance
                        || (distance == best_distance && id < best_id)
                }
            };
            if better {
                best = Some((distance, id));
            }
        }
        Ok(best.map(|(_, id)| id))
    }

    async fn shortest_edge_path(
        &self,
        from_vertex: i64,
        to_vertex: i64,
        cost: &EdgeCost,
    ) -> StoreResult<Option<EdgePath>> {
        // Undirected Dijkstra with predecessor tracking.
        let mut adjacency: HashMap<i64, Vec<&StubEdge>> = HashMap::new();
        for edge in self.edges.values() {
            adjacency.entry(edge.source).or_default().push(edge);
            adjacency.entry(edge.target).or_default().push(edge);
        }

        let mut best: HashMap<i64, f64> = HashMap::new();
        let mut previous: HashMap<i64, (i64, i64)> = HashMap::new();
        let mut heap = BinaryHeap::new();
        best.insert(from_vertex, 0.0);
        heap.push(MinScored(0.0, (from_vertex, None)));

        while let Some(MinScored(score, (vertex, _))) = heap.pop() {
            if vertex == to_vertex {
                break;
            }
            if score > best.get(&vertex).copied().unwrap_or(f64::INFINITY) {
                continue;
            }
            for &edge in adjacency.get(&vertex).into_iter().flatten() {
                let neighbor = if edge.source == vertex {
                    edge.target
                } else {
                    edge.source
                };
                let next_score = score + self.edge_cost(edge, cost);
                if next_score
                    < best.get(&neighbor).copied().unwrap_or(f64::INFINITY)
                {
                    best.insert(neighbor, next_score);
                    previous.insert(neighbor, (vertex, edge.id));
                    heap.push(MinScored(next_score, (neighbor, Some(edge.id))));
                }
            }
        }

        if !best.contains_key(&to_vertex) {
            return Ok(None);
        }

        let mut edge_ids = vec![];
        let mut vertex = to_vertex;
        while vertex != from_vertex {
            let (parent, edge_id) = previous[&vertex];
            edge_ids.push(edge_id);
            vertex = parent;
        }
        edge_ids.reverse();

        let parts: Vec<Polyline> = edge_ids
            .iter()
            .map(|id| self.edges[id].geometry.clone())
            .collect();
        let total_length_m = edge_ids.iter().map(|id| self.edges[id].length_m).sum();
        Ok(Some(EdgePath {
            geometry: Polyline::stitch(&parts),
            edge_ids,
            total_length_m,
        }))
    }

    async fn edge_geometry_and_length(
        &self,
        edge_id: i64,
    ) -> StoreResult<Option<(Polyline, f64)>> {
        Ok(self
            .edges
            .get(&edge_id)
            .map(|edge| (edge.geometry.clone(), edge.length_m)))
    }

    async fn matched_gvi_points_for_edge(
        &self,
        edge_id: i64,
        month: &GviMonth,
    ) -> StoreResult<Vec<MatchedGviPoint>> {
        Ok(self
            .matched_points
            .get(&(edge_id, month.clone()))
            .cloned()
            .unwrap_or_default())
    }

    async fn edges_within(
        &self,
        point: &Location,
        radius_m: f64,
    ) -> StoreResult<Vec<i64>> {
        let mut ids: Vec<i64> = self
            .edges
            .values()
            .filter(|edge| {
                edge.geometry.0.iter().any(|&[lon, lat]| {
                    point.distance_to(&Location::new(lat, lon)) <= radius_m
                })
            })
            .map(|edge| edge.id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn sites_within_and_nearest(
        &self,
        point: &Location,
        radius_m: f64,
        nearest: usize,
        limit: usize,
    ) -> StoreResult<Vec<NearbySite>> {
        let mut annotated: Vec<NearbySite> = self
            .sites
            .iter()
            .map(|site| NearbySite {
                site: site.clone(),
                walking_distance_m: point.distance_to(&site.location),
            })
            .collect();
        annotated.sort_by(|a, b| a.walking_distance_m.total_cmp(&b.walking_distance_m));
        let kept: Vec<NearbySite> = annotated
            .into_iter()
            .enumerate()
            .filter(|(index, site)| {
                site.walking_distance_m <= radius_m || *index < nearest
            })
            .map(|(_, site)| site)
            .take(limit)
            .collect();
        Ok(kept)
    }

    async fn stop_point(&self, id: i64) -> StoreResult<Option<StopPoint>> {
        Ok(self.stop_points.get(&id).cloned())
    }

    async fn next_stop(
        &self,
        line_id: i64,
        direction_code: i32,
        stop_point_id: i64,
    ) -> StoreResult<Option<NextStop>> {
        Ok(self
            .successors
            .get(&(line_id, direction_code, stop_point_id))
            .cloned())
    }

    async fn reachable_sites_from(
        &self,
        line_id: i64,
        direction_code: i32,
        stop_point_id: i64,
        target_site_ids: &[i64],
        max_depth: u32,
    ) -> StoreResult<Vec<i64>> {
        let mut reached = vec![];
        let mut current = stop_point_id;
        for _ in 0..max_depth {
            let Some(next) = self
                .successors
                .get(&(line_id, direction_code, current))
            else {
                break;
            };
            if target_site_ids.contains(&next.site_id)
                && !reached.contains(&next.site_id)
            {
                reached.push(next.site_id);
            }
            current = next.stop_point_id;
        }
        Ok(reached)
    }

    async fn stops_along(
        &self,
        line_id: i64,
        direction_code: i32,
        from_stop_id: i64,
        to_stop_id: i64,
        max_depth: u32,
    ) -> StoreResult<Vec<StopPoint>> {
        let mut stops = vec![];
        if let Some(stop) = self.stop_points.get(&from_stop_id) {
            stops.push(stop.clone());
        }
        let mut current = from_stop_id;
        for _ in 0..max_depth {
            if current == to_stop_id {
                break;
            }
            let Some(next) = self
                .successors
                .get(&(line_id, direction_code, current))
            else {
                break;
            };
            current = next.stop_point_id;
            if let Some(stop) = self.stop_points.get(&current) {
                stops.push(stop.clone());
            }
        }
        Ok(stops)
    }

    async fn road_ids(&self) -> StoreResult<Vec<i64>> {
        let mut ids: Vec<i64> = self.edges.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn upsert_road_dgvi(
        &self,
        _month: &GviMonth,
        rows: &[(i64, f64)],
    ) -> StoreResult<()> {
        self.upserted_dgvi.lock().unwrap().extend_from_slice(rows);
        Ok(())
    }

    async fn normalize_month(&self, _month: &GviMonth) -> StoreResult<()> {
        self.normalize_calls.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }

    async fn available_months(&self) -> StoreResult<Vec<GviMonth>> {
        let mut months: Vec<GviMonth> =
            self.dgvi_raw.keys().map(|(_, month)| month.clone()).collect();
        months.sort();
        months.dedup();
        months.reverse();
        Ok(months)
    }

    async fn dgvi_stats(&self, month: &GviMonth) -> StoreResult<Option<DgviStats>> {
        let values: Vec<f64> = self
            .dgvi_raw
            .iter()
            .filter(|((_, m), _)| m == month)
            .map(|(_, &value)| value)
            .collect();
        if values.is_empty() {
            return Ok(None);
        }
        let sum: f64 = values.iter().sum();
        Ok(Some(DgviStats {
            month: month.clone(),
            road_count: values.len() as i64,
            min_dgvi: values.iter().copied().fold(f64::INFINITY, f64::min),
            max_dgvi: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean_dgvi: sum / values.len() as f64,
        }))
    }

    async fn gvi_points(
        &self,
        month: &GviMonth,
        limit: usize,
    ) -> StoreResult<Vec<GviPoint>> {
        Ok(self
            .inserted_gvi
            .lock()
            .unwrap()
            .iter()
            .filter(|point| &point.month == month)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert_gvi_points(&self, points: &[GviPoint]) -> StoreResult<u64> {
        self.inserted_gvi
            .lock()
            .unwrap()
            .extend_from_slice(points);
        Ok(points.len() as u64)
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────

/// Two vertices joined by a short low-greenness chain (edges 1, 2 through
/// vertex 2) and a longer high-greenness detour (edges 3, 4 through vertex
/// 5), plus an isolated vertex 99.
pub fn line_fixture_store() -> StubStore {
    let mut store = StubStore::default();
    store.add_vertex(1, 0.0, 0.0);
    store.add_vertex(2, 0.0, 0.015);
    store.add_vertex(4, 0.0, 0.03);
    store.add_vertex(5, 0.01, 0.015);
    store.add_vertex(99, 5.0, 5.0);

    store.add_edge(1, 1, 2, 1670.0, 0.2);
    store.add_edge(2, 2, 4, 1670.0, 0.2);
    store.add_edge(3, 1, 5, 2000.0, 0.5);
    store.add_edge(4, 5, 4, 2000.0, 0.5);

    store.set_dgvi(1, FIXTURE_MONTH, 0.0);
    store.set_dgvi(2, FIXTURE_MONTH, 0.0);
    store.set_dgvi(3, FIXTURE_MONTH, 1.0);
    store.set_dgvi(4, FIXTURE_MONTH, 1.0);
    store
}

/// A corridor of six vertices with sites at both ends and a transfer site
/// in the middle:
///
/// ```text
/// v1 ──e1── v2 ──e2── v3 ──e3── v4 ──e4── v5 ──e5── v6
/// S1(101)             S3(103)@v4          S2(102)@v6
/// line 4 dir 1: sp1011(S1) → sp1031(S3)
/// line 7 dir 1: sp1032(S3) → sp1021(S2)
/// ```
pub fn corridor_fixture_store() -> StubStore {
    let mut store = StubStore::default();
    for (index, vertex) in (1..=6).enumerate() {
        store.add_vertex(vertex, 0.0, index as f64 * 0.01);
    }
    for edge in 1..=5 {
        store.add_edge(edge, edge, edge + 1, 700.0, 0.5);
        store.set_dgvi(edge, FIXTURE_MONTH, 0.3);
    }

    store.add_site(101, "West End", 0.0, 0.0);
    store.add_site(103, "Midtown", 0.0, 0.03);
    store.add_site(102, "East End", 0.0, 0.05);

    store.add_stop_point(1011, 101, 1, 0.0, 0.0);
    store.add_stop_point(1031, 103, 1, 0.0, 0.03);
    store.add_stop_point(1032, 103, 2, 0.0, 0.03);
    store.add_stop_point(1021, 102, 1, 0.0, 0.05);

    store.add_successor(4, 1, 1011, 1031);
    store.add_successor(7, 1, 1032, 1021);
    store
}
