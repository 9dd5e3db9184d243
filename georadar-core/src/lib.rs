//! Geodesic Radar Sweep Engine
//!
//! Platform-independent core for drawing an animated radar sweep over a map:
//! range rings, a rotating sweep line or sector polygon, and detection of
//! markers that the sweep passes over.
//!
//! The crate does no drawing and owns no clock. Drawing goes through the
//! [`Renderer`] trait and timing through the [`Scheduler`] trait, so the same
//! engine can sit behind a native map SDK, a canvas, or a headless test.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use georadar_core::{
//!     LineSweepConfig, ManualScheduler, MarkerDescriptor, NullRenderer, Radar, RadarConfig,
//! };
//!
//! let scheduler = Rc::new(ManualScheduler::new());
//! let radar = Radar::new(
//!     RadarConfig::at(48.8566, 2.3522),
//!     Box::new(NullRenderer::default()),
//!     scheduler.clone(),
//! )?;
//!
//! radar.add_marker(
//!     MarkerDescriptor::new("tower", 48.858, 2.355, "tower.png")
//!         .on_detect(|d| {
//!             println!("{} at {:.0} deg", d.marker_id, d.bearing);
//!             Ok(())
//!         }),
//! )?;
//! radar.add_line_sweep(LineSweepConfig::default())?;
//!
//! scheduler.advance(std::time::Duration::from_secs(10));
//! ```

pub mod axis;
pub mod config;
pub mod detector;
pub mod error;
pub mod geo;
pub mod marker;
pub mod radar;
pub mod renderer;
pub mod scheduler;
pub mod sweep;

pub use axis::Axis;
pub use config::{AxisConfig, LineSweepConfig, PolygonSweepConfig, RadarConfig, ShapeStyle};
pub use detector::Detection;
pub use error::RadarError;
pub use geo::{bearing, destination_point, distance, GeoPoint, EARTH_RADIUS_KM};
pub use marker::{DetectResult, MarkerDescriptor, MarkerId, MarkerSet, TrackedMarker};
pub use radar::{Layers, MarkerStatus, Radar, RadarStatus, SweepStatus};
pub use renderer::{
    MarkerHandle, MarkerSpec, NullRenderer, RecordingRenderer, RenderCommand, Renderer,
    ShapeHandle, ShapeKind,
};
pub use scheduler::{ManualScheduler, Scheduler, Task, TimerHandle};
pub use sweep::{Advance, CylindricVertex, LineSweep, PolygonSweep, SweepKind, SweepState};

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, RadarError>;
