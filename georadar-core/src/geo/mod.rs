//! Spherical Geometry
//!
//! Great-circle helpers on a spherical Earth model. All angles are taken and
//! returned in degrees; conversion to radians happens internally.
//!
//! # Conventions
//!
//! - Bearings are initial great-circle bearings, 0 = north, clockwise,
//!   normalized to `[0, 360)`.
//! - Longitudes returned by [`destination_point`] are normalized to
//!   `(-180, 180]`.
//! - Distances are in kilometers.

use serde::{Deserialize, Serialize};

use crate::error::RadarError;

mod polygon;

pub use polygon::polygon_contains;

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Tolerance used when comparing angles in degrees
pub const ANGLE_EPSILON: f64 = 1e-9;

/// A geographic position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        GeoPoint { lat, lng }
    }

    /// Build a point after checking that it is a usable coordinate.
    ///
    /// Latitude must lie in `[-90, 90]`; longitude may be any finite value and
    /// is wrapped into `(-180, 180]`.
    pub fn checked(lat: f64, lng: f64) -> Result<Self, RadarError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(RadarError::invalid(format!("latitude {} out of range", lat)));
        }
        if !lng.is_finite() {
            return Err(RadarError::invalid(format!("longitude {} is not finite", lng)));
        }
        Ok(GeoPoint::new(lat, normalize_longitude(lng)))
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// Wrap an angle into `[0, 360)`
#[inline]
pub fn normalize_angle(deg: f64) -> f64 {
    let a = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if a >= 360.0 - ANGLE_EPSILON {
        0.0
    } else {
        a
    }
}

/// Wrap a longitude into `(-180, 180]`
#[inline]
pub fn normalize_longitude(deg: f64) -> f64 {
    let l = normalize_angle(deg + 180.0) - 180.0;
    if l <= -180.0 {
        180.0
    } else {
        l
    }
}

/// Smallest absolute difference between two angles, in `[0, 180]`
#[inline]
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let d = normalize_angle(a - b);
    d.min(360.0 - d)
}

/// Haversine great-circle distance between two points in kilometers.
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).max(0.0).sqrt());
    EARTH_RADIUS_KM * c
}

/// Point reached by travelling `distance_km` from `origin` along the initial
/// bearing `bearing_deg`.
///
/// Fails with [`RadarError::InvalidArgument`] when the distance is negative or
/// not finite, or when the bearing is not finite.
pub fn destination_point(
    origin: GeoPoint,
    distance_km: f64,
    bearing_deg: f64,
) -> Result<GeoPoint, RadarError> {
    if !distance_km.is_finite() || distance_km < 0.0 {
        return Err(RadarError::invalid(format!(
            "distance {} km must be a finite, non-negative number",
            distance_km
        )));
    }
    if !bearing_deg.is_finite() {
        return Err(RadarError::invalid(format!(
            "bearing {} is not finite",
            bearing_deg
        )));
    }

    if distance_km == 0.0 {
        return Ok(origin);
    }

    // Angular distance in radians
    let delta = distance_km / EARTH_RADIUS_KM;
    let theta = bearing_deg.to_radians();
    let lat1 = origin.lat.to_radians();
    let lng1 = origin.lng.to_radians();

    let sin_lat2 = lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();
    let lng2 = lng1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * sin_lat2);

    Ok(GeoPoint::new(
        lat2.to_degrees(),
        normalize_longitude(lng2.to_degrees()),
    ))
}

/// Initial great-circle bearing from `origin` to `target`, in `[0, 360)`.
///
/// Identical points yield 0.
pub fn bearing(origin: GeoPoint, target: GeoPoint) -> f64 {
    let lat1 = origin.lat.to_radians();
    let lat2 = target.lat.to_radians();
    let d_lng = (target.lng - origin.lng).to_radians();

    let y = d_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lng.cos();
    normalize_angle(y.atan2(x).to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARIS: GeoPoint = GeoPoint {
        lat: 48.8566,
        lng: 2.3522,
    };
    const LONDON: GeoPoint = GeoPoint {
        lat: 51.5074,
        lng: -0.1278,
    };

    #[test]
    fn test_distance_known_value() {
        // Paris - London is roughly 344 km
        let d = distance(PARIS, LONDON);
        assert!((d - 343.5).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn test_distance_identical_points() {
        assert_eq!(distance(PARIS, PARIS), 0.0);
    }

    #[test]
    fn test_distance_symmetry() {
        let pairs = [
            (PARIS, LONDON),
            (GeoPoint::new(0.0, 179.9), GeoPoint::new(0.0, -179.9)),
            (GeoPoint::new(89.9, 0.0), GeoPoint::new(-45.0, 120.0)),
            (GeoPoint::new(-33.86, 151.21), GeoPoint::new(40.71, -74.0)),
        ];
        for (a, b) in pairs {
            assert!((distance(a, b) - distance(b, a)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_distance_across_antimeridian() {
        // 0.2 degrees of longitude at the equator, not 359.8
        let d = distance(GeoPoint::new(0.0, 179.9), GeoPoint::new(0.0, -179.9));
        assert!((d - 22.24).abs() < 0.05, "got {}", d);
    }

    #[test]
    fn test_destination_round_trip() {
        let centers = [PARIS, GeoPoint::new(0.0, 0.0), GeoPoint::new(-60.0, 170.0)];
        for center in centers {
            for d in [0.1, 0.5, 1.0, 25.0, 400.0] {
                for b in [0.0, 5.0, 45.0, 90.0, 181.5, 270.0, 359.0] {
                    let p = destination_point(center, d, b).unwrap();
                    assert!((distance(center, p) - d).abs() < 1e-6 * d.max(1.0));
                    assert!(angular_distance(bearing(center, p), b) < 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_destination_zero_distance() {
        let p = destination_point(PARIS, 0.0, 123.0).unwrap();
        assert!((p.lat - PARIS.lat).abs() < 1e-12);
        assert!((p.lng - PARIS.lng).abs() < 1e-12);
    }

    #[test]
    fn test_destination_wraps_longitude() {
        let p = destination_point(GeoPoint::new(0.0, 179.99), 10.0, 90.0).unwrap();
        assert!(p.lng < 0.0 && p.lng > -180.0, "got {}", p.lng);

        let p = destination_point(GeoPoint::new(0.0, -179.99), 10.0, 270.0).unwrap();
        assert!(p.lng > 0.0 && p.lng <= 180.0, "got {}", p.lng);
    }

    #[test]
    fn test_destination_over_pole() {
        let p = destination_point(GeoPoint::new(89.99, 0.0), 5.0, 0.0).unwrap();
        assert!(p.lat <= 90.0);
        assert!(p.lng > -180.0 && p.lng <= 180.0);
    }

    #[test]
    fn test_destination_rejects_bad_distance() {
        assert!(matches!(
            destination_point(PARIS, f64::NAN, 0.0),
            Err(RadarError::InvalidArgument(_))
        ));
        assert!(matches!(
            destination_point(PARIS, f64::INFINITY, 0.0),
            Err(RadarError::InvalidArgument(_))
        ));
        assert!(matches!(
            destination_point(PARIS, -1.0, 0.0),
            Err(RadarError::InvalidArgument(_))
        ));
        assert!(matches!(
            destination_point(PARIS, 1.0, f64::NAN),
            Err(RadarError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_bearing_cardinal() {
        let o = GeoPoint::new(0.0, 0.0);
        assert!(bearing(o, GeoPoint::new(1.0, 0.0)).abs() < 1e-9);
        assert!((bearing(o, GeoPoint::new(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((bearing(o, GeoPoint::new(-1.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((bearing(o, GeoPoint::new(0.0, -1.0)) - 270.0).abs() < 1e-9);
        assert_eq!(bearing(o, o), 0.0);
    }

    #[test]
    fn test_normalize_angle() {
        assert_eq!(normalize_angle(0.0), 0.0);
        assert_eq!(normalize_angle(360.0), 0.0);
        assert_eq!(normalize_angle(-90.0), 270.0);
        assert_eq!(normalize_angle(725.0), 5.0);
        assert_eq!(normalize_angle(-1e-13), 0.0);
    }

    #[test]
    fn test_normalize_longitude() {
        assert_eq!(normalize_longitude(180.0), 180.0);
        assert_eq!(normalize_longitude(-180.0), 180.0);
        assert_eq!(normalize_longitude(190.0), -170.0);
        assert_eq!(normalize_longitude(-190.0), 170.0);
        assert_eq!(normalize_longitude(45.0), 45.0);
    }

    #[test]
    fn test_angular_distance() {
        assert_eq!(angular_distance(5.0, 355.0), 10.0);
        assert_eq!(angular_distance(355.0, 5.0), 10.0);
        assert_eq!(angular_distance(90.0, 270.0), 180.0);
        assert_eq!(angular_distance(10.0, 10.0), 0.0);
    }

    #[test]
    fn test_checked_point() {
        assert!(GeoPoint::checked(91.0, 0.0).is_err());
        assert!(GeoPoint::checked(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::checked(0.0, f64::INFINITY).is_err());
        let p = GeoPoint::checked(10.0, 200.0).unwrap();
        assert_eq!(p.lng, -160.0);
    }
}
