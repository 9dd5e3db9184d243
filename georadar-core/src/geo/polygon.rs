//! Point-in-polygon on a local tangent plane
//!
//! Sweep polygons span at most a few tens of kilometers, so containment is
//! tested on an equirectangular projection centered on the radar. Longitude
//! differences are wrapped first, which keeps polygons that straddle the
//! antimeridian intact.

use nalgebra::{Point2, Vector2};

use super::{normalize_longitude, GeoPoint};

/// Distance (in projected degrees) under which a point counts as on an edge
const EDGE_EPSILON: f64 = 1e-9;

fn project(center: GeoPoint, p: GeoPoint, lng_scale: f64) -> Point2<f64> {
    Point2::new(
        normalize_longitude(p.lng - center.lng) * lng_scale,
        p.lat - center.lat,
    )
}

fn on_segment(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> bool {
    let ab: Vector2<f64> = b - a;
    let ap: Vector2<f64> = p - a;
    let len2 = ab.norm_squared();
    if len2 == 0.0 {
        return ap.norm() <= EDGE_EPSILON;
    }
    let t = (ap.dot(&ab) / len2).clamp(0.0, 1.0);
    (ap - ab * t).norm() <= EDGE_EPSILON
}

/// Test whether `point` lies inside the closed polygon `vertices`.
///
/// The polygon is implicitly closed (last vertex joins the first). Points on
/// an edge or a vertex are inside. Fewer than three vertices never contain
/// anything.
pub fn polygon_contains(center: GeoPoint, vertices: &[GeoPoint], point: GeoPoint) -> bool {
    if vertices.len() < 3 {
        return false;
    }

    let lng_scale = center.lat.to_radians().cos();
    let p = project(center, point, lng_scale);
    let poly: Vec<Point2<f64>> = vertices
        .iter()
        .map(|v| project(center, *v, lng_scale))
        .collect();

    let mut inside = false;
    let mut j = poly.len() - 1;
    for i in 0..poly.len() {
        let (a, b) = (&poly[i], &poly[j]);
        if on_segment(&p, a, b) {
            return true;
        }
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
