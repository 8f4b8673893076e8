use std::{error, fmt};

use model::MonthParseError;

pub mod config;
pub mod dgvi;
pub mod feed;
pub mod plan;
pub mod scoring;
pub mod solver;
pub mod store;

mod enrich;
mod transfer;
mod transit;
mod walking;

#[cfg(test)]
mod test_support;

pub use config::PlannerConfig;
pub use feed::{batch_departures, DepartureFeed};
pub use plan::{PlanOutcome, PlanRequest, Planner};
pub use store::{EdgeCost, EdgePath, SpatialStore, StoreError};

/// Request-level failure taxonomy. Per-candidate failures never surface
/// here; they degrade the result set instead.
#[derive(Debug)]
pub enum PlanError {
    /// Bad coordinates, non-normalized weights, malformed month.
    InvalidInput(String),
    /// The requested month has no DGVI rows.
    NoDataForMonth(String),
    /// A feed or store call failed in a way that prevents the request.
    TransientUpstream(String),
    /// Connection pool, deadline, or cancellation.
    ResourceExhausted(String),
    /// Unexpected.
    Internal(String),
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PlanError::InvalidInput(detail) => write!(f, "invalid input: {detail}"),
            PlanError::NoDataForMonth(month) => {
                write!(f, "no DGVI data for month '{month}'")
            }
            PlanError::TransientUpstream(detail) => {
                write!(f, "upstream failure: {detail}")
            }
            PlanError::ResourceExhausted(detail) => {
                write!(f, "resource exhausted: {detail}")
            }
            PlanError::Internal(detail) => write!(f, "internal error: {detail}"),
        }
    }
}

impl error::Error for PlanError {}

impl From<StoreError> for PlanError {
    fn from(why: StoreError) -> Self {
        match why {
            StoreError::NotFound => {
                PlanError::Internal("store row vanished mid-request".to_owned())
            }
            other => PlanError::TransientUpstream(other.to_string()),
        }
    }
}

impl From<MonthParseError> for PlanError {
    fn from(why: MonthParseError) -> Self {
        PlanError::InvalidInput(why.to_string())
    }
}

pub type PlanResult<O> = Result<O, PlanError>;
