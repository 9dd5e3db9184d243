//! Sweeps
//!
//! A sweep is a shape rotating around the radar center. Two kinds exist:
//!
//! - **Line**: a segment from the center out to `radius`; markers are detected
//!   in an angular sector around it.
//! - **Polygon**: an arbitrary closed shape, rotated as a whole; markers are
//!   detected when inside it.
//!
//! Both share [`SweepState`] for angle progression and lap counting.

mod line;
mod polygon;
mod state;

use serde::{Deserialize, Serialize};

pub use line::LineSweep;
pub use polygon::{CylindricVertex, PolygonSweep};
pub use state::{Advance, SweepState};

/// Which sweep of a radar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepKind {
    Line,
    Polygon,
}

impl std::fmt::Display for SweepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SweepKind::Line => write!(f, "line"),
            SweepKind::Polygon => write!(f, "polygon"),
        }
    }
}
