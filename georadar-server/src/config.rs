//! Server configuration file.
//!
//! A single JSON document describing one radar:
//!
//! ```json
//! {
//!   "radar": { "id": "harbour", "lat": 43.29, "lng": 5.36 },
//!   "axis": { "radius": 500, "count": 4 },
//!   "line": { "radius": 2.0, "angleIncrease": 3, "lapMax": 5 },
//!   "markers": [
//!     { "id": "buoy-1", "lat": 43.30, "lng": 5.37, "iconRef": "buoy.png" }
//!   ]
//! }
//! ```
//!
//! Every field is optional and falls back to the core defaults. Sections that
//! are absent are not drawn.

use std::path::Path;

use georadar_core::{
    AxisConfig, LineSweepConfig, MarkerDescriptor, PolygonSweepConfig, RadarConfig,
};
use serde::{Deserialize, Serialize};

use crate::error::ServerError;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub radar: RadarConfig,
    pub axis: Option<AxisConfig>,
    pub line: Option<LineSweepConfig>,
    pub polygon: Option<PolygonSweepConfig>,
    pub markers: Vec<MarkerDescriptor>,
}

impl ServerConfig {
    /// Range rings and a line sweep with default settings, no markers
    pub fn standard() -> Self {
        ServerConfig {
            axis: Some(AxisConfig::default()),
            line: Some(LineSweepConfig::default()),
            ..Default::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let text = std::fs::read_to_string(path).map_err(|source| ServerError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ServerConfig =
            serde_json::from_str(&text).map_err(|source| ServerError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        log::debug!(
            "Loaded {}: axis={} line={} polygon={} markers={}",
            path.display(),
            config.axis.is_some(),
            config.line.is_some(),
            config.polygon.is_some(),
            config.markers.len()
        );
        Ok(config)
    }

    /// Command line values win over the file
    pub fn override_center(&mut self, lat: Option<f64>, lng: Option<f64>) {
        if lat.is_some() {
            self.radar.lat = lat;
        }
        if lng.is_some() {
            self.radar.lng = lng;
        }
    }
}
