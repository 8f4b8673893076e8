//! Rendering of the typed edge cost into the inner query handed to
//! `pgr_dijkstra`. pgRouting evaluates that query text itself, so it cannot
//! be a bind parameter; instead the only values ever formatted in are two
//! finite `f64` weights and a `GviMonth`, whose constructor admits nothing
//! but `[0-9]{4}-[0-9]{2}`.

use planner::store::EdgeCost;

/// Inner SQL producing `(id, source, target, cost)` rows for pgRouting.
pub fn render_inner_query(cost: &EdgeCost) -> String {
    match cost {
        EdgeCost::PureLength => {
            "SELECT id, source, target, length_m AS cost FROM road_edges"
                .to_owned()
        }
        EdgeCost::Preference {
            w_time,
            w_green,
            month,
        } => {
            // Finite, clamped weights; NaN would poison the solver.
            let w_time = clamp_weight(*w_time);
            let w_green = clamp_weight(*w_green);
            format!(
                "SELECT e.id, e.source, e.target, \
                 ({w_time:.6} * e.length_normalized \
                  + {w_green:.6} * (1 - COALESCE(d.dgvi_normalized, 0))) AS cost \
                 FROM road_edges e \
                 LEFT JOIN road_dgvi d \
                   ON d.road_id = e.id AND d.month = '{month}'"
            )
        }
    }
}

fn clamp_weight(weight: f64) -> f64 {
    if weight.is_finite() {
        weight.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use model::GviMonth;

    use super::*;

    #[test]
    fn pure_length_has_no_dgvi_join() {
        let sql = render_inner_query(&EdgeCost::PureLength);
        assert!(sql.contains("length_m AS cost"));
        assert!(!sql.contains("road_dgvi"));
    }

    #[test]
    fn preference_interpolates_only_numbers_and_month() {
        let sql = render_inner_query(&EdgeCost::Preference {
            w_time: 0.3,
            w_green: 0.7,
            month: GviMonth::parse("2025-08").unwrap(),
        });
        assert!(sql.contains("0.300000"));
        assert!(sql.contains("0.700000"));
        assert!(sql.contains("d.month = '2025-08'"));
    }

    #[test]
    fn weights_are_clamped_to_unit_interval() {
        let sql = render_inner_query(&EdgeCost::Preference {
            w_time: 7.0,
            w_green: f64::NAN,
            month: GviMonth::parse("2025-08").unwrap(),
        });
        assert!(sql.contains("1.000000"));
        assert!(sql.contains("0.000000"));
        assert!(!sql.contains("NaN"));
    }
}
