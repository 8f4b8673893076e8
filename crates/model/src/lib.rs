pub mod geometry;
pub mod gvi;
pub mod preferences;
pub mod road;
pub mod route;
pub mod transit;

pub use geometry::{Location, Polyline};
pub use gvi::{DgviStats, GviMonth, GviPoint, MatchedGviPoint, MonthParseError};
pub use preferences::Preferences;
pub use road::{RoadEdge, RoadVertex};
pub use route::{
    IntraSiteTransfer, RoutePlan, RouteType, Segment, StopRef, TransferDetails,
};
pub use transit::{Departure, NearbySite, NextStop, Site, StopPoint};
