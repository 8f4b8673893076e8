//! Candidate scoring. Normalization is per category (walking vs bus) over
//! the surviving candidates only, so scores are comparable within a
//! response but not across requests.

use model::{Preferences, RoutePlan};

fn min_max_norm(value: f64, min: f64, max: f64) -> f64 {
    if max > min {
        (value - min) / (max - min)
    } else {
        0.0
    }
}

/// Fills the scoring fields of every candidate in one category. Duration is
/// a penalty, DGVI a reward; the composite penalty is inverted so the
/// user-facing `total_score` is "larger is better" in [0, 1].
pub fn score_category(routes: &mut [RoutePlan], preferences: Preferences) {
    if routes.is_empty() {
        return;
    }
    let min_duration = routes
        .iter()
        .map(|r| r.total_duration_s)
        .fold(f64::INFINITY, f64::min);
    let max_duration = routes
        .iter()
        .map(|r| r.total_duration_s)
        .fold(f64::NEG_INFINITY, f64::max);
    let min_dgvi = routes
        .iter()
        .map(|r| r.total_ac_dgvi)
        .fold(f64::INFINITY, f64::min);
    let max_dgvi = routes
        .iter()
        .map(|r| r.total_ac_dgvi)
        .fold(f64::NEG_INFINITY, f64::max);

    for route in routes.iter_mut() {
        let time_norm = min_max_norm(route.total_duration_s, min_duration, max_duration);
        let dgvi_norm = min_max_norm(route.total_ac_dgvi, min_dgvi, max_dgvi);
        let penalty =
            preferences.time * time_norm + preferences.green * (1.0 - dgvi_norm);
        route.duration_score = 1.0 - time_norm;
        route.ac_dgvi_score = dgvi_norm;
        route.total_score = 1.0 - penalty;
    }
}

/// Scores, ranks by descending total score, and keeps the best `keep`.
pub fn score_and_rank(
    mut routes: Vec<RoutePlan>,
    preferences: Preferences,
    keep: usize,
) -> Vec<RoutePlan> {
    score_category(&mut routes, preferences);
    routes.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));
    routes.truncate(keep);
    routes
}
