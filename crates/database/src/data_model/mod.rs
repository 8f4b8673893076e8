//! Row structs bridging SQL result sets and the domain model.

pub mod gvi;
pub mod road;
pub mod transit;

pub use gvi::{DgviStatsRow, GviPointRow, MatchedPointRow};
pub use road::{EdgeGeometryRow, PathEdgeRow};
pub use transit::{NearbySiteRow, NextStopRow, StopPointRow};
