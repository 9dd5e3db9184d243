//! Line sweep: a segment from the center rotating like a radar beam

use crate::config::LineSweepConfig;
use crate::error::RadarError;
use crate::geo::{angular_distance, bearing, destination_point, distance, GeoPoint, ANGLE_EPSILON};

use super::SweepState;

#[derive(Debug, Clone)]
pub struct LineSweep {
    pub(crate) state: SweepState,
    config: LineSweepConfig,
}

impl LineSweep {
    pub fn new(config: LineSweepConfig) -> Result<Self, RadarError> {
        config.validate()?;
        let state = SweepState::new(
            config.angle,
            config.angle_origin,
            config.angle_increase,
            config.angle_max_overture,
            config.lap_max,
        );
        Ok(LineSweep { state, config })
    }

    pub fn state(&self) -> &SweepState {
        &self.state
    }

    pub fn config(&self) -> &LineSweepConfig {
        &self.config
    }

    /// Line length in kilometers
    pub fn radius(&self) -> f64 {
        self.config.radius
    }

    /// Current segment: center, then the far end at the current angle
    pub fn project(&self, center: GeoPoint) -> Result<Vec<GeoPoint>, RadarError> {
        let remote = destination_point(center, self.config.radius, self.state.angle())?;
        Ok(vec![center, remote])
    }

    /// Whether `point` lies in the detection sector: within half the overture
    /// on either side of the line (inclusive) and strictly closer than the
    /// line's length.
    pub fn contains(&self, center: GeoPoint, point: GeoPoint) -> bool {
        let half_width = self.state.angle_max_overture() / 2.0;
        angular_distance(bearing(center, point), self.state.angle()) <= half_width + ANGLE_EPSILON
            && distance(center, point) < self.config.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_length_and_direction() {
        let center = GeoPoint::new(45.0, 5.0);
        let mut sweep = LineSweep::new(LineSweepConfig {
            radius: 2.0,
            ..Default::default()
        })
        .unwrap();
        sweep.state.rotate_by(90.0);

        let line = sweep.project(center).unwrap();
        assert_eq!(line.len(), 2);
        assert_eq!(line[0], center);
        assert!((distance(center, line[1]) - 2.0).abs() < 1e-9);
        assert!((bearing(center, line[1]) - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_sector_contains() {
        let center = GeoPoint::new(0.0, 0.0);
        let sweep = LineSweep::new(LineSweepConfig {
            radius: 1.0,
            angle_max_overture: 10.0,
            ..Default::default()
        })
        .unwrap();

        let inside = destination_point(center, 0.5, 5.0).unwrap();
        let edge_wrap = destination_point(center, 0.5, 356.0).unwrap();
        let wide = destination_point(center, 0.5, 6.0).unwrap();
        let far = destination_point(center, 1.5, 0.0).unwrap();

        assert!(sweep.contains(center, inside));
        assert!(sweep.contains(center, edge_wrap));
        assert!(!sweep.contains(center, wide));
        assert!(!sweep.contains(center, far));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = LineSweepConfig {
            radius: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            LineSweep::new(config),
            Err(RadarError::InvalidArgument(_))
        ));
    }
}
