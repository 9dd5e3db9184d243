//! Tracked Markers
//!
//! Point markers the sweeps look for. Each marker remembers, per sweep kind,
//! whether it was already detected during the current lap, so its callback
//! fires at most once per lap even if the sweep dwells on it for several
//! ticks.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::detector::Detection;
use crate::error::RadarError;
use crate::geo::GeoPoint;
use crate::renderer::{MarkerHandle, MarkerSpec};
use crate::sweep::SweepKind;

/// Marker identifier, unique within a radar
pub type MarkerId = String;

/// Outcome of a detection callback; errors are logged, never propagated
pub type DetectResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Detection callback
pub type DetectCallback = Box<dyn FnMut(&Detection) -> DetectResult>;

/// Marker as supplied by the caller.
///
/// Fields are optional so that a descriptor read from JSON with a missing
/// field is rejected by [`MarkerSet::add`] with a proper error.
#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerDescriptor {
    pub id: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub icon_ref: Option<String>,
    pub visible: Option<bool>,
    #[serde(skip)]
    pub on_detect: Option<DetectCallback>,
}

impl fmt::Debug for MarkerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkerDescriptor")
            .field("id", &self.id)
            .field("lat", &self.lat)
            .field("lng", &self.lng)
            .field("icon_ref", &self.icon_ref)
            .field("visible", &self.visible)
            .field("on_detect", &self.on_detect.is_some())
            .finish()
    }
}

impl MarkerDescriptor {
    pub fn new(id: impl Into<String>, lat: f64, lng: f64, icon_ref: impl Into<String>) -> Self {
        MarkerDescriptor {
            id: Some(id.into()),
            lat: Some(lat),
            lng: Some(lng),
            icon_ref: Some(icon_ref.into()),
            visible: None,
            on_detect: None,
        }
    }

    /// Attach the callback fired when a sweep passes over the marker
    pub fn on_detect<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Detection) -> DetectResult + 'static,
    {
        self.on_detect = Some(Box::new(f));
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    /// Check required fields, producing the renderer spec
    pub fn to_spec(&self) -> Result<MarkerSpec, RadarError> {
        let id = self
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RadarError::invalid("marker id is missing"))?;
        let lat = self
            .lat
            .ok_or_else(|| RadarError::invalid(format!("marker {}: latitude is missing", id)))?;
        let lng = self
            .lng
            .ok_or_else(|| RadarError::invalid(format!("marker {}: longitude is missing", id)))?;
        let icon_ref = self
            .icon_ref
            .clone()
            .ok_or_else(|| RadarError::invalid(format!("marker {}: icon is missing", id)))?;
        let position = GeoPoint::checked(lat, lng)
            .map_err(|e| RadarError::invalid(format!("marker {}: {}", id, e)))?;

        Ok(MarkerSpec {
            id,
            position,
            icon_ref,
            visible: self.visible.unwrap_or(true),
        })
    }
}

/// A marker being watched by the radar
pub struct TrackedMarker {
    pub id: MarkerId,
    pub position: GeoPoint,
    pub icon_ref: String,
    pub visible: bool,
    /// Renderer handle, if the marker has been drawn
    pub handle: Option<MarkerHandle>,
    detected_by_line: bool,
    detected_by_polygon: bool,
    on_detect: Option<DetectCallback>,
}

impl fmt::Debug for TrackedMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedMarker")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("visible", &self.visible)
            .field("detected_by_line", &self.detected_by_line)
            .field("detected_by_polygon", &self.detected_by_polygon)
            .finish()
    }
}

impl TrackedMarker {
    pub fn already_detected(&self, kind: SweepKind) -> bool {
        match kind {
            SweepKind::Line => self.detected_by_line,
            SweepKind::Polygon => self.detected_by_polygon,
        }
    }

    pub(crate) fn set_detected(&mut self, kind: SweepKind, detected: bool) {
        match kind {
            SweepKind::Line => self.detected_by_line = detected,
            SweepKind::Polygon => self.detected_by_polygon = detected,
        }
    }

    pub fn has_callback(&self) -> bool {
        self.on_detect.is_some()
    }

    pub(crate) fn callback_mut(&mut self) -> Option<&mut DetectCallback> {
        self.on_detect.as_mut()
    }
}

/// Ordered collection of tracked markers
#[derive(Debug, Default)]
pub struct MarkerSet {
    markers: Vec<TrackedMarker>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a descriptor and start tracking it.
    ///
    /// Fails with [`RadarError::InvalidArgument`] on a missing field and
    /// [`RadarError::DuplicateId`] if the id is already tracked.
    pub fn add(&mut self, descriptor: MarkerDescriptor) -> Result<&mut TrackedMarker, RadarError> {
        let spec = descriptor.to_spec()?;
        if self.contains(&spec.id) {
            return Err(RadarError::DuplicateId(spec.id));
        }
        self.markers.push(TrackedMarker {
            id: spec.id,
            position: spec.position,
            icon_ref: spec.icon_ref,
            visible: spec.visible,
            handle: None,
            detected_by_line: false,
            detected_by_polygon: false,
            on_detect: descriptor.on_detect,
        });
        let last = self.markers.len() - 1;
        Ok(&mut self.markers[last])
    }

    /// Stop tracking a marker. Unknown ids are ignored.
    pub fn remove(&mut self, id: &str) -> Option<TrackedMarker> {
        let index = self.markers.iter().position(|m| m.id == id)?;
        Some(self.markers.remove(index))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.markers.iter().any(|m| m.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&TrackedMarker> {
        self.markers.iter().find(|m| m.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut TrackedMarker> {
        self.markers.iter_mut().find(|m| m.id == id)
    }

    /// Forget every detection made by `kind` in the current lap
    pub fn reset_detections(&mut self, kind: SweepKind) {
        for m in &mut self.markers {
            m.set_detected(kind, false);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedMarker> {
        self.markers.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TrackedMarker> {
        self.markers.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}
