//! Renderer Collaborator
//!
//! The engine computes shapes; a [`Renderer`] draws them. Implementations map
//! these calls onto whatever the host has: a map SDK's polylines and polygons,
//! an SVG layer, a canvas, or nothing at all.
//!
//! The engine only ever holds the opaque [`ShapeHandle`] and [`MarkerHandle`]
//! values returned here. It asks for removal when it is done with them and
//! never assumes anything else about their lifetime.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::config::ShapeStyle;
use crate::geo::GeoPoint;

/// Opaque handle for a drawn shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeHandle(pub u64);

/// Opaque handle for a drawn marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerHandle(pub u64);

/// Kind of open or closed path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Polyline,
    Polygon,
}

/// What the renderer needs to draw a marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerSpec {
    pub id: String,
    pub position: GeoPoint,
    pub icon_ref: String,
    pub visible: bool,
}

/// Drawing surface used by the radar
pub trait Renderer {
    /// Draw a circle of `radius_m` meters around `center`
    fn create_circle(&mut self, center: GeoPoint, radius_m: f64, style: &ShapeStyle)
        -> ShapeHandle;

    /// Draw a path through `points`
    fn create_shape(&mut self, kind: ShapeKind, points: &[GeoPoint], style: &ShapeStyle)
        -> ShapeHandle;

    /// Replace the points of an existing path
    fn update_shape(&mut self, handle: ShapeHandle, points: &[GeoPoint]);

    fn set_visible(&mut self, handle: ShapeHandle, visible: bool);

    fn remove_shape(&mut self, handle: ShapeHandle);

    fn create_marker(&mut self, marker: &MarkerSpec) -> MarkerHandle;

    fn set_marker_visible(&mut self, handle: MarkerHandle, visible: bool);

    fn remove_marker(&mut self, handle: MarkerHandle);
}

/// Renderer that draws nothing, for headless use
#[derive(Debug, Default)]
pub struct NullRenderer {
    next_handle: u64,
}

impl NullRenderer {
    fn alloc_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl Renderer for NullRenderer {
    fn create_circle(&mut self, _: GeoPoint, _: f64, _: &ShapeStyle) -> ShapeHandle {
        ShapeHandle(self.alloc_handle())
    }

    fn create_shape(&mut self, _: ShapeKind, _: &[GeoPoint], _: &ShapeStyle) -> ShapeHandle {
        ShapeHandle(self.alloc_handle())
    }

    fn update_shape(&mut self, _: ShapeHandle, _: &[GeoPoint]) {}

    fn set_visible(&mut self, _: ShapeHandle, _: bool) {}

    fn remove_shape(&mut self, _: ShapeHandle) {}

    fn create_marker(&mut self, _: &MarkerSpec) -> MarkerHandle {
        MarkerHandle(self.alloc_handle())
    }

    fn set_marker_visible(&mut self, _: MarkerHandle, _: bool) {}

    fn remove_marker(&mut self, _: MarkerHandle) {}
}

/// One call made on a renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum RenderCommand {
    #[serde(rename_all = "camelCase")]
    CreateCircle {
        handle: ShapeHandle,
        center: GeoPoint,
        radius_m: f64,
        style: ShapeStyle,
    },
    CreateShape {
        handle: ShapeHandle,
        kind: ShapeKind,
        points: Vec<GeoPoint>,
        style: ShapeStyle,
    },
    UpdateShape {
        handle: ShapeHandle,
        points: Vec<GeoPoint>,
    },
    SetVisible {
        handle: ShapeHandle,
        visible: bool,
    },
    RemoveShape {
        handle: ShapeHandle,
    },
    CreateMarker {
        handle: MarkerHandle,
        marker: MarkerSpec,
    },
    SetMarkerVisible {
        handle: MarkerHandle,
        visible: bool,
    },
    RemoveMarker {
        handle: MarkerHandle,
    },
}

/// Renderer that records every call as a [`RenderCommand`].
///
/// Clones share the same log, so a test can keep one clone and hand the other
/// to the radar.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    log: Rc<RefCell<Vec<RenderCommand>>>,
    next_handle: Rc<Cell<u64>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_handle(&self) -> u64 {
        let h = self.next_handle.get() + 1;
        self.next_handle.set(h);
        h
    }

    fn record(&self, cmd: RenderCommand) {
        self.log.borrow_mut().push(cmd);
    }

    /// Copy of everything recorded so far
    pub fn commands(&self) -> Vec<RenderCommand> {
        self.log.borrow().clone()
    }

    /// Drain the recorded commands
    pub fn take(&self) -> Vec<RenderCommand> {
        std::mem::take(&mut *self.log.borrow_mut())
    }

    /// Points of the most recent create/update for `handle`
    pub fn last_points(&self, handle: ShapeHandle) -> Option<Vec<GeoPoint>> {
        self.log.borrow().iter().rev().find_map(|cmd| match cmd {
            RenderCommand::UpdateShape { handle: h, points }
            | RenderCommand::CreateShape {
                handle: h, points, ..
            } if *h == handle => Some(points.clone()),
            _ => None,
        })
    }
}

impl Renderer for RecordingRenderer {
    fn create_circle(&mut self, center: GeoPoint, radius_m: f64, style: &ShapeStyle) -> ShapeHandle {
        let handle = ShapeHandle(self.alloc_handle());
        self.record(RenderCommand::CreateCircle {
            handle,
            center,
            radius_m,
            style: style.clone(),
        });
        handle
    }

    fn create_shape(&mut self, kind: ShapeKind, points: &[GeoPoint], style: &ShapeStyle) -> ShapeHandle {
        let handle = ShapeHandle(self.alloc_handle());
        self.record(RenderCommand::CreateShape {
            handle,
            kind,
            points: points.to_vec(),
            style: style.clone(),
        });
        handle
    }

    fn update_shape(&mut self, handle: ShapeHandle, points: &[GeoPoint]) {
        self.record(RenderCommand::UpdateShape {
            handle,
            points: points.to_vec(),
        });
    }

    fn set_visible(&mut self, handle: ShapeHandle, visible: bool) {
        self.record(RenderCommand::SetVisible { handle, visible });
    }

    fn remove_shape(&mut self, handle: ShapeHandle) {
        self.record(RenderCommand::RemoveShape { handle });
    }

    fn create_marker(&mut self, marker: &MarkerSpec) -> MarkerHandle {
        let handle = MarkerHandle(self.alloc_handle());
        self.record(RenderCommand::CreateMarker {
            handle,
            marker: marker.clone(),
        });
        handle
    }

    fn set_marker_visible(&mut self, handle: MarkerHandle, visible: bool) {
        self.record(RenderCommand::SetMarkerVisible { handle, visible });
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        self.record(RenderCommand::RemoveMarker { handle });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_shares_log_between_clones() {
        let rec = RecordingRenderer::new();
        let mut boxed: Box<dyn Renderer> = Box::new(rec.clone());

        let h = boxed.create_shape(
            ShapeKind::Polyline,
            &[GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0)],
            &ShapeStyle::line(),
        );
        boxed.update_shape(h, &[GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0)]);
        boxed.set_visible(h, false);

        assert_eq!(rec.commands().len(), 3);
        assert_eq!(
            rec.last_points(h),
            Some(vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0)])
        );
        assert_eq!(rec.take().len(), 3);
        assert!(rec.commands().is_empty());
    }

    #[test]
    fn test_handles_are_unique() {
        let mut r = NullRenderer::default();
        let a = r.create_circle(GeoPoint::default(), 10.0, &ShapeStyle::axis());
        let b = r.create_circle(GeoPoint::default(), 20.0, &ShapeStyle::axis());
        assert_ne!(a, b);
    }

    #[test]
    fn test_render_command_json() {
        let cmd = RenderCommand::SetVisible {
            handle: ShapeHandle(7),
            visible: true,
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["op"], "setVisible");
        assert_eq!(json["handle"], 7);
        assert_eq!(json["visible"], true);
    }
}
