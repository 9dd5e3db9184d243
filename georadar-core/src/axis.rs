//! Range Rings
//!
//! Concentric circles around the radar center, `radius` meters apart.

use crate::config::AxisConfig;
use crate::error::RadarError;
use crate::geo::GeoPoint;
use crate::renderer::{Renderer, ShapeHandle};

/// Drawn range rings
#[derive(Debug)]
pub struct Axis {
    config: AxisConfig,
    circles: Vec<ShapeHandle>,
}

impl Axis {
    /// Validate the configuration and draw one circle per ring
    pub fn draw(
        config: AxisConfig,
        center: GeoPoint,
        renderer: &mut dyn Renderer,
    ) -> Result<Self, RadarError> {
        config.validate()?;
        let circles = ring_radii(&config)
            .into_iter()
            .map(|r| renderer.create_circle(center, r, &config.style))
            .collect();
        Ok(Axis { config, circles })
    }

    /// Ring radii in meters, innermost first
    pub fn radii(&self) -> Vec<f64> {
        ring_radii(&self.config)
    }

    pub fn config(&self) -> &AxisConfig {
        &self.config
    }

    pub fn circles(&self) -> &[ShapeHandle] {
        &self.circles
    }

    pub fn set_visible(&self, visible: bool, renderer: &mut dyn Renderer) {
        for c in &self.circles {
            renderer.set_visible(*c, visible);
        }
    }

    /// Remove every circle from the renderer
    pub fn undraw(self, renderer: &mut dyn Renderer) {
        for c in self.circles {
            renderer.remove_shape(c);
        }
    }
}

/// `radius * n` for `n` in `1..=count`
pub fn ring_radii(config: &AxisConfig) -> Vec<f64> {
    (1..=config.count).map(|n| config.radius * n as f64).collect()
}
