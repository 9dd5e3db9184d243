//! Polygon sweep: an arbitrary shape rotating around the center
//!
//! The authored vertices are converted once into their cylindric form
//! (distance and bearing from the center). Every tick only adds the sweep
//! angle to each bearing and projects back, so a rotation costs one
//! destination-point computation per vertex and the shape never drifts.

use serde::{Deserialize, Serialize};

use crate::config::PolygonSweepConfig;
use crate::error::RadarError;
use crate::geo::{bearing, destination_point, distance, polygon_contains, GeoPoint};

use super::SweepState;

/// A vertex expressed relative to the radar center
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CylindricVertex {
    pub distance_km: f64,
    pub bearing: f64,
}

#[derive(Debug, Clone)]
pub struct PolygonSweep {
    pub(crate) state: SweepState,
    config: PolygonSweepConfig,
    /// Authored vertices; the default sector is built around the first center seen
    shape: Option<Vec<GeoPoint>>,
    cylindric: Option<Vec<CylindricVertex>>,
}

impl PolygonSweep {
    pub fn new(config: PolygonSweepConfig) -> Result<Self, RadarError> {
        config.validate()?;
        let state = SweepState::new(
            config.angle,
            config.angle_origin,
            config.angle_increase,
            config.angle_max_overture,
            config.lap_max,
        );
        let shape = config.shape.clone();
        Ok(PolygonSweep {
            state,
            config,
            shape,
            cylindric: None,
        })
    }

    pub fn state(&self) -> &SweepState {
        &self.state
    }

    pub fn config(&self) -> &PolygonSweepConfig {
        &self.config
    }

    /// Authored shape, once known
    pub fn shape(&self) -> Option<&[GeoPoint]> {
        self.shape.as_deref()
    }

    /// Cylindric form, once computed
    pub fn cylindric(&self) -> Option<&[CylindricVertex]> {
        self.cylindric.as_deref()
    }

    fn default_shape(&self, center: GeoPoint) -> Result<Vec<GeoPoint>, RadarError> {
        let half = self.config.angle_max_overture / 2.0;
        Ok(vec![
            center,
            destination_point(center, self.config.radius, half)?,
            destination_point(center, self.config.radius, -half)?,
            center,
        ])
    }

    /// Compute the cylindric form on first use; later calls return the cached one
    fn ensure_cylindric(&mut self, center: GeoPoint) -> Result<&[CylindricVertex], RadarError> {
        if self.cylindric.is_none() {
            let shape = match self.shape.take() {
                Some(shape) => shape,
                None => self.default_shape(center)?,
            };
            let cylindric = shape
                .iter()
                .map(|v| CylindricVertex {
                    distance_km: distance(center, *v),
                    bearing: bearing(center, *v),
                })
                .collect();
            log::trace!(
                "polygon sweep: {} vertices converted to cylindric form",
                shape.len()
            );
            self.shape = Some(shape);
            self.cylindric = Some(cylindric);
        }
        Ok(self.cylindric.as_deref().unwrap_or_default())
    }

    /// Absolute vertices at the current angle, in authored order
    pub fn project(&mut self, center: GeoPoint) -> Result<Vec<GeoPoint>, RadarError> {
        let angle = self.state.angle();
        self.ensure_cylindric(center)?
            .iter()
            .map(|v| destination_point(center, v.distance_km, v.bearing + angle))
            .collect()
    }

    /// Whether `point` lies inside the rotated shape `projected`
    pub fn contains(&self, center: GeoPoint, projected: &[GeoPoint], point: GeoPoint) -> bool {
        polygon_contains(center, projected, point)
    }
}
