use std::{error, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::geometry::Location;

/// A validated `YYYY-MM` month tag identifying one GVI sampling campaign.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GviMonth(String);

#[derive(Debug, Clone)]
pub struct MonthParseError(pub String);

impl fmt::Display for MonthParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "not a YYYY-MM month tag: '{}'", self.0)
    }
}

impl error::Error for MonthParseError {}

impl GviMonth {
    pub fn parse<S: AsRef<str>>(raw: S) -> Result<Self, MonthParseError> {
        let raw = raw.as_ref();
        let mut parts = raw.splitn(2, '-');
        let year = parts.next().unwrap_or("");
        let month = parts.next().unwrap_or("");
        let year_ok = year.len() == 4 && year.chars().all(|c| c.is_ascii_digit());
        let month_ok = month.len() == 2
            && matches!(month.parse::<u8>(), Ok(m) if (1..=12).contains(&m));
        if year_ok && month_ok {
            Ok(Self(raw.to_owned()))
        } else {
            Err(MonthParseError(raw.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GviMonth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GviMonth {
    type Err = MonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for GviMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for GviMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A single street-level greenness sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GviPoint {
    pub id: i64,
    pub location: Location,
    pub month: GviMonth,
    /// Fraction of the visual field occupied by vegetation, roughly [0, 1].
    pub value: f64,
}

/// A GVI sample projected onto an edge geometry: `parameter` is the position
/// along the line in [0, 1], `value` the greenness at the sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchedGviPoint {
    pub parameter: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DgviStats {
    pub month: GviMonth,
    pub road_count: i64,
    pub min_dgvi: f64,
    pub max_dgvi: f64,
    pub mean_dgvi: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_accepts_valid_tags() {
        assert!(GviMonth::parse("2025-08").is_ok());
        assert!(GviMonth::parse("1999-01").is_ok());
        assert!(GviMonth::parse("2025-12").is_ok());
    }

    #[test]
    fn month_rejects_malformed_tags() {
        for raw in ["2025-13", "2025-0", "25-08", "2025/08", "2025-08-01", ""] {
            assert!(GviMonth::parse(raw).is_err(), "accepted '{raw}'");
        }
    }

    #[test]
    fn month_ordering_is_chronological() {
        let older = GviMonth::parse("2024-12").unwrap();
        let newer = GviMonth::parse("2025-08").unwrap();
        assert!(older < newer);
    }
}
