//! Marker Detection
//!
//! Tests tracked markers against the current swept shape and fires each
//! newly found marker's callback once.
//!
//! Callbacks run synchronously inside the tick. A callback that returns an
//! error or panics is logged and otherwise ignored: the marker still counts as
//! detected for this lap and the sweep carries on. A callback that blocks
//! holds up the whole sweep; keeping callbacks short is up to the caller.

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::Serialize;

use crate::geo::{bearing, distance, GeoPoint};
use crate::marker::{MarkerId, MarkerSet};
use crate::sweep::SweepKind;

/// Passed to a marker's callback when a sweep finds it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub marker_id: MarkerId,
    pub sweep: SweepKind,
    /// Laps completed by the sweep when the marker was found
    pub lap: u32,
    /// Sweep angle at detection
    pub angle: f64,
    /// Bearing of the marker from the center
    pub bearing: f64,
    /// Distance of the marker from the center in kilometers
    pub distance_km: f64,
}

/// Sweep context for one detection pass
#[derive(Debug, Clone, Copy)]
pub struct SweepContext<'a> {
    pub radar_id: &'a str,
    pub kind: SweepKind,
    pub center: GeoPoint,
    pub angle: f64,
    pub lap: u32,
}

/// Run one detection pass.
///
/// Markers already detected by this sweep kind during the current lap are
/// skipped whether or not they are inside. Returns the ids detected now.
pub fn detect_markers<F>(ctx: SweepContext<'_>, markers: &mut MarkerSet, inside: F) -> Vec<MarkerId>
where
    F: Fn(GeoPoint) -> bool,
{
    let mut found = Vec::new();

    for marker in markers.iter_mut() {
        if marker.already_detected(ctx.kind) || !inside(marker.position) {
            continue;
        }

        let detection = Detection {
            marker_id: marker.id.clone(),
            sweep: ctx.kind,
            lap: ctx.lap,
            angle: ctx.angle,
            bearing: bearing(ctx.center, marker.position),
            distance_km: distance(ctx.center, marker.position),
        };
        log::debug!(
            "{}: {} sweep detected {} at {:.1} deg, {:.3} km",
            ctx.radar_id,
            ctx.kind,
            detection.marker_id,
            detection.bearing,
            detection.distance_km
        );

        if let Some(callback) = marker.callback_mut() {
            match catch_unwind(AssertUnwindSafe(|| callback(&detection))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    log::warn!(
                        "{}: detection callback for {} failed: {}",
                        ctx.radar_id,
                        detection.marker_id,
                        e
                    );
                }
                Err(_) => {
                    log::error!(
                        "{}: detection callback for {} panicked",
                        ctx.radar_id,
                        detection.marker_id
                    );
                }
            }
        }

        marker.set_detected(ctx.kind, true);
        found.push(detection.marker_id);
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::MarkerDescriptor;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ctx(kind: SweepKind) -> SweepContext<'static> {
        SweepContext {
            radar_id: "test",
            kind,
            center: GeoPoint::new(0.0, 0.0),
            angle: 0.0,
            lap: 0,
        }
    }

    #[test]
    fn test_fires_once_per_lap() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let mut markers = MarkerSet::new();
        let h = hits.clone();
        markers
            .add(MarkerDescriptor::new("a", 0.001, 0.0, "a.png").on_detect(move |d| {
                h.borrow_mut().push(d.marker_id.clone());
                Ok(())
            }))
            .unwrap();

        let found = detect_markers(ctx(SweepKind::Line), &mut markers, |_| true);
        assert_eq!(found, vec!["a".to_string()]);
        let found = detect_markers(ctx(SweepKind::Line), &mut markers, |_| true);
        assert!(found.is_empty());
        assert_eq!(hits.borrow().len(), 1);

        markers.reset_detections(SweepKind::Line);
        detect_markers(ctx(SweepKind::Line), &mut markers, |_| true);
        assert_eq!(hits.borrow().len(), 2);
    }

    #[test]
    fn test_outside_markers_are_not_flagged() {
        let mut markers = MarkerSet::new();
        markers
            .add(MarkerDescriptor::new("a", 0.001, 0.0, "a.png"))
            .unwrap();
        let found = detect_markers(ctx(SweepKind::Polygon), &mut markers, |_| false);
        assert!(found.is_empty());
        assert!(!markers.get("a").unwrap().already_detected(SweepKind::Polygon));
    }

    #[test]
    fn test_failing_callbacks_are_isolated() {
        let mut markers = MarkerSet::new();
        markers
            .add(
                MarkerDescriptor::new("err", 0.001, 0.0, "x.png")
                    .on_detect(|_| Err("tower offline".into())),
            )
            .unwrap();
        markers
            .add(
                MarkerDescriptor::new("panic", 0.001, 0.0, "x.png")
                    .on_detect(|_| panic!("callback bug")),
            )
            .unwrap();
        let ok = Rc::new(RefCell::new(0));
        let o = ok.clone();
        markers
            .add(MarkerDescriptor::new("ok", 0.001, 0.0, "x.png").on_detect(move |_| {
                *o.borrow_mut() += 1;
                Ok(())
            }))
            .unwrap();

        let found = detect_markers(ctx(SweepKind::Line), &mut markers, |_| true);
        assert_eq!(found.len(), 3);
        assert_eq!(*ok.borrow(), 1);
        assert!(markers.iter().all(|m| m.already_detected(SweepKind::Line)));
    }

    #[test]
    fn test_detection_payload() {
        let seen = Rc::new(RefCell::new(None));
        let s = seen.clone();
        let mut markers = MarkerSet::new();
        markers
            .add(MarkerDescriptor::new("east", 0.0, 0.001, "x.png").on_detect(move |d| {
                *s.borrow_mut() = Some(d.clone());
                Ok(())
            }))
            .unwrap();

        detect_markers(ctx(SweepKind::Line), &mut markers, |_| true);
        let d = seen.borrow().clone().unwrap();
        assert_eq!(d.marker_id, "east");
        assert_eq!(d.sweep, SweepKind::Line);
        assert!((d.bearing - 90.0).abs() < 1e-9);
        assert!((d.distance_km - 0.1112).abs() < 1e-3);
    }
}
