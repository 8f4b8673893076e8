use serde::{Deserialize, Serialize};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// The caller's trade-off between travel time and greenness exposure.
/// Both weights are non-negative and sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub time: f64,
    pub green: f64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            time: 0.5,
            green: 0.5,
        }
    }
}

impl Preferences {
    pub fn new(time: f64, green: f64) -> Self {
        Self { time, green }
    }

    /// Fastest-path weights (`w_time = 1`).
    pub fn time_only() -> Self {
        Self {
            time: 1.0,
            green: 0.0,
        }
    }

    /// Greenest-path weights (`w_green = 1`).
    pub fn green_only() -> Self {
        Self {
            time: 0.0,
            green: 1.0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.time >= 0.0
            && self.green >= 0.0
            && (self.time + self.green - 1.0).abs() <= WEIGHT_SUM_TOLERANCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_balanced_and_valid() {
        let preferences = Preferences::default();
        assert_eq!(preferences.time, 0.5);
        assert!(preferences.is_valid());
    }

    #[test]
    fn rejects_non_normalized_weights() {
        assert!(!Preferences::new(0.7, 0.7).is_valid());
        assert!(!Preferences::new(-0.2, 1.2).is_valid());
        assert!(Preferences::new(0.3, 0.7).is_valid());
    }
}
