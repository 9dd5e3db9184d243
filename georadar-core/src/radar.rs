//! Radar Instance
//!
//! [`Radar`] owns everything drawn around one center: the range rings, at
//! most one line sweep, at most one polygon sweep, and the tracked markers.
//!
//! # Ticking
//!
//! Each running sweep has exactly one pending task in the [`Scheduler`]. The
//! task holds a weak reference to the radar state, the sweep kind and the
//! sweep's generation number. When it fires it advances the sweep, projects
//! and renders the new shape, runs marker detection and only then schedules
//! its successor. `stop()` cancels the pending task and bumps the generation,
//! so a task that was already queued finds a stale generation and does
//! nothing.
//!
//! # Re-entrancy
//!
//! Detection callbacks run while the radar is busy ticking. Calling back into
//! the same radar from a callback returns [`RadarError::InvalidState`].

use std::cell::{RefCell, RefMut};
use std::rc::{Rc, Weak};
use std::time::Duration;

use bitflags::bitflags;
use serde::Serialize;

use crate::axis::Axis;
use crate::config::{AxisConfig, LineSweepConfig, PolygonSweepConfig, RadarConfig, ShapeStyle};
use crate::detector::{detect_markers, SweepContext};
use crate::error::RadarError;
use crate::geo::GeoPoint;
use crate::marker::{MarkerDescriptor, MarkerId, MarkerSet};
use crate::renderer::{MarkerSpec, Renderer, ShapeHandle, ShapeKind};
use crate::scheduler::{Scheduler, TimerHandle};
use crate::sweep::{Advance, LineSweep, PolygonSweep, SweepKind, SweepState};

bitflags! {
    /// Groups of drawn objects whose visibility can be toggled together
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Layers: u8 {
        const AXIS = 1 << 0;
        const LINE = 1 << 1;
        const POLYGON = 1 << 2;
        const MARKERS = 1 << 3;
    }
}

impl Layers {
    fn for_sweep(kind: SweepKind) -> Layers {
        match kind {
            SweepKind::Line => Layers::LINE,
            SweepKind::Polygon => Layers::POLYGON,
        }
    }
}

/// Snapshot of one sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepStatus {
    pub kind: SweepKind,
    pub angle: f64,
    pub angle_origin: f64,
    pub lap_current: u32,
    pub lap_max: u32,
    pub running: bool,
    pub finished: bool,
    pub visible: bool,
    /// Last projected shape
    pub shape: Vec<GeoPoint>,
}

/// Snapshot of one tracked marker
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerStatus {
    pub id: MarkerId,
    pub position: GeoPoint,
    pub visible: bool,
    pub detected_by_line: bool,
    pub detected_by_polygon: bool,
}

/// Serializable snapshot of a radar
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarStatus {
    pub id: String,
    pub center: GeoPoint,
    /// Ring radii in meters, when the axis is drawn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<SweepStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polygon: Option<SweepStatus>,
    pub markers: Vec<MarkerStatus>,
}

/// Either sweep kind, dispatched by variant
#[derive(Debug)]
enum ActiveSweep {
    Line(LineSweep),
    Polygon(PolygonSweep),
}

impl ActiveSweep {
    fn state(&self) -> &SweepState {
        match self {
            ActiveSweep::Line(s) => &s.state,
            ActiveSweep::Polygon(s) => &s.state,
        }
    }

    fn state_mut(&mut self) -> &mut SweepState {
        match self {
            ActiveSweep::Line(s) => &mut s.state,
            ActiveSweep::Polygon(s) => &mut s.state,
        }
    }

    fn project(&mut self, center: GeoPoint) -> Result<Vec<GeoPoint>, RadarError> {
        match self {
            ActiveSweep::Line(s) => s.project(center),
            ActiveSweep::Polygon(s) => s.project(center),
        }
    }

    fn contains(&self, center: GeoPoint, projected: &[GeoPoint], point: GeoPoint) -> bool {
        match self {
            ActiveSweep::Line(s) => s.contains(center, point),
            ActiveSweep::Polygon(s) => s.contains(center, projected, point),
        }
    }
}

/// A sweep plus its drawing and scheduling bookkeeping
#[derive(Debug)]
struct SweepSlot {
    sweep: ActiveSweep,
    shape: ShapeHandle,
    interval: Duration,
    pending: Option<TimerHandle>,
    generation: u64,
    visible: bool,
    last_shape: Vec<GeoPoint>,
}

impl SweepSlot {
    fn status(&self, kind: SweepKind) -> SweepStatus {
        let state = self.sweep.state();
        SweepStatus {
            kind,
            angle: state.angle(),
            angle_origin: state.angle_origin(),
            lap_current: state.lap_current(),
            lap_max: state.lap_max(),
            running: state.is_running(),
            finished: state.is_finished(),
            visible: self.visible,
            shape: self.last_shape.clone(),
        }
    }
}

struct RadarInner {
    id: String,
    center: GeoPoint,
    renderer: Box<dyn Renderer>,
    scheduler: Rc<dyn Scheduler>,
    axis: Option<Axis>,
    line: Option<SweepSlot>,
    polygon: Option<SweepSlot>,
    markers: MarkerSet,
}

fn missing(kind: SweepKind) -> RadarError {
    RadarError::NotFound(format!("{} sweep", kind))
}

impl RadarInner {
    fn slot(&self, kind: SweepKind) -> Option<&SweepSlot> {
        match kind {
            SweepKind::Line => self.line.as_ref(),
            SweepKind::Polygon => self.polygon.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: SweepKind) -> Option<&mut SweepSlot> {
        match kind {
            SweepKind::Line => self.line.as_mut(),
            SweepKind::Polygon => self.polygon.as_mut(),
        }
    }

    fn take_slot(&mut self, kind: SweepKind) -> Option<SweepSlot> {
        match kind {
            SweepKind::Line => self.line.take(),
            SweepKind::Polygon => self.polygon.take(),
        }
    }

    /// Project and render one sweep, then optionally run detection
    fn pass(&mut self, kind: SweepKind, detect: bool) -> Result<Vec<MarkerId>, RadarError> {
        let center = self.center;
        let slot = match kind {
            SweepKind::Line => self.line.as_mut(),
            SweepKind::Polygon => self.polygon.as_mut(),
        }
        .ok_or_else(|| missing(kind))?;

        let shape = slot.sweep.project(center)?;
        self.renderer.update_shape(slot.shape, &shape);

        let found = if detect {
            let state = slot.sweep.state();
            let ctx = SweepContext {
                radar_id: &self.id,
                kind,
                center,
                angle: state.angle(),
                lap: state.lap_current(),
            };
            let sweep = &slot.sweep;
            let projected = shape.as_slice();
            detect_markers(ctx, &mut self.markers, |p| sweep.contains(center, projected, p))
        } else {
            Vec::new()
        };

        slot.last_shape = shape;
        Ok(found)
    }

    /// Stop a sweep and cancel its pending tick
    fn halt(&mut self, kind: SweepKind) {
        let scheduler = self.scheduler.clone();
        if let Some(slot) = self.slot_mut(kind) {
            slot.sweep.state_mut().set_running(false);
            slot.generation += 1;
            if let Some(handle) = slot.pending.take() {
                scheduler.cancel(handle);
            }
        }
    }

    /// One scheduled tick. Returns whether another tick should be scheduled.
    fn tick(&mut self, kind: SweepKind, generation: u64) -> bool {
        let advance = match self.slot_mut(kind) {
            Some(slot) if slot.generation == generation && slot.sweep.state().is_running() => {
                slot.pending = None;
                Some(slot.sweep.state_mut().advance())
            }
            _ => None,
        };
        let Some(advance) = advance else {
            log::trace!("{}: stale {} tick ignored", self.id, kind);
            return false;
        };

        if advance.starts_new_lap() {
            self.markers.reset_detections(kind);
            if let Some(slot) = self.slot(kind) {
                log::debug!(
                    "{}: {} sweep lap {} complete",
                    self.id,
                    kind,
                    slot.sweep.state().lap_current()
                );
            }
        }

        let finished = advance == Advance::Finished;
        if let Err(e) = self.pass(kind, true) {
            log::error!("{}: {} sweep stopped: {}", self.id, kind, e);
            self.halt(kind);
            return false;
        }

        if finished {
            log::info!("{}: {} sweep finished", self.id, kind);
            return false;
        }
        true
    }

    fn status(&self) -> RadarStatus {
        RadarStatus {
            id: self.id.clone(),
            center: self.center,
            axis: self.axis.as_ref().map(Axis::radii),
            line: self.line.as_ref().map(|s| s.status(SweepKind::Line)),
            polygon: self.polygon.as_ref().map(|s| s.status(SweepKind::Polygon)),
            markers: self
                .markers
                .iter()
                .map(|m| MarkerStatus {
                    id: m.id.clone(),
                    position: m.position,
                    visible: m.visible,
                    detected_by_line: m.already_detected(SweepKind::Line),
                    detected_by_polygon: m.already_detected(SweepKind::Polygon),
                })
                .collect(),
        }
    }
}

impl Drop for RadarInner {
    fn drop(&mut self) {
        for slot in [self.line.as_mut(), self.polygon.as_mut()].into_iter().flatten() {
            if let Some(handle) = slot.pending.take() {
                self.scheduler.cancel(handle);
            }
        }
    }
}

/// Queue the next tick of `kind`, capturing only a weak reference
fn schedule_next(inner: &Rc<RefCell<RadarInner>>, kind: SweepKind) {
    let mut guard = inner.borrow_mut();
    let scheduler = guard.scheduler.clone();
    let Some(slot) = guard.slot_mut(kind) else {
        return;
    };

    let generation = slot.generation;
    let weak: Weak<RefCell<RadarInner>> = Rc::downgrade(inner);
    let handle = scheduler.schedule(
        slot.interval,
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                on_tick(&inner, kind, generation);
            }
        }),
    );
    slot.pending = Some(handle);
}

fn on_tick(inner: &Rc<RefCell<RadarInner>>, kind: SweepKind, generation: u64) {
    let keep_going = match inner.try_borrow_mut() {
        Ok(mut guard) => guard.tick(kind, generation),
        Err(_) => {
            log::error!("{} tick fired while the radar was busy; sweep halted", kind);
            false
        }
    };
    if keep_going {
        schedule_next(inner, kind);
    }
}

/// A radar overlay around one center.
///
/// Not `Send`: a radar lives on one thread and is driven by a scheduler on
/// that same thread.
pub struct Radar {
    id: String,
    inner: Rc<RefCell<RadarInner>>,
}

impl std::fmt::Debug for Radar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Radar").field("id", &self.id).finish()
    }
}

impl Radar {
    /// Create a radar. Fails without creating anything if the center is
    /// missing or invalid.
    pub fn new(
        config: RadarConfig,
        renderer: Box<dyn Renderer>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Result<Self, RadarError> {
        let center = config.center()?;
        log::debug!("{}: radar created at {}", config.id, center);
        Ok(Radar {
            id: config.id.clone(),
            inner: Rc::new(RefCell::new(RadarInner {
                id: config.id,
                center,
                renderer,
                scheduler,
                axis: None,
                line: None,
                polygon: None,
                markers: MarkerSet::new(),
            })),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn lock(&self) -> Result<RefMut<'_, RadarInner>, RadarError> {
        self.inner.try_borrow_mut().map_err(|_| {
            RadarError::InvalidState(format!(
                "{}: radar is busy (called from a detection callback?)",
                self.id
            ))
        })
    }

    pub fn center(&self) -> Result<GeoPoint, RadarError> {
        Ok(self.lock()?.center)
    }

    /// Move the radar. Rings are redrawn and sweeps re-projected around the
    /// new center; polygon sweeps keep their cylindric form, so they keep
    /// their shape relative to the center.
    pub fn set_center(&self, lat: f64, lng: f64) -> Result<(), RadarError> {
        let center = GeoPoint::checked(lat, lng)?;
        let mut guard = self.lock()?;
        let r = &mut *guard;
        r.center = center;

        if let Some(axis) = r.axis.take() {
            let config = axis.config().clone();
            axis.undraw(r.renderer.as_mut());
            r.axis = Some(Axis::draw(config, center, r.renderer.as_mut())?);
        }
        for kind in [SweepKind::Line, SweepKind::Polygon] {
            if r.slot(kind).is_some() {
                r.pass(kind, false)?;
            }
        }
        log::debug!("{}: center moved to {}", r.id, center);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Range rings
    // -------------------------------------------------------------------------

    /// Draw range rings. Fails with [`RadarError::InvalidState`] if already drawn.
    pub fn draw_axis(&self, config: AxisConfig) -> Result<(), RadarError> {
        let mut guard = self.lock()?;
        let r = &mut *guard;
        if r.axis.is_some() {
            return Err(RadarError::InvalidState(format!(
                "{}: range rings already drawn",
                r.id
            )));
        }
        let axis = Axis::draw(config, r.center, r.renderer.as_mut())?;
        log::debug!("{}: {} range rings drawn", r.id, axis.circles().len());
        r.axis = Some(axis);
        Ok(())
    }

    /// Remove the range rings, if drawn
    pub fn undraw_axis(&self) -> Result<(), RadarError> {
        let mut guard = self.lock()?;
        let r = &mut *guard;
        if let Some(axis) = r.axis.take() {
            axis.undraw(r.renderer.as_mut());
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Sweeps
    // -------------------------------------------------------------------------

    /// Add the line sweep, starting it when `autostart` is set.
    ///
    /// A stopped line sweep is replaced; a running one is an
    /// [`RadarError::InvalidState`].
    pub fn add_line_sweep(&self, config: LineSweepConfig) -> Result<(), RadarError> {
        let interval = Duration::from_millis(config.interval_ms);
        let style = config.style.clone();
        let autostart = config.autostart;
        let sweep = ActiveSweep::Line(LineSweep::new(config)?);
        self.add_sweep(SweepKind::Line, sweep, interval, style, autostart)
    }

    /// Add the polygon sweep, starting it when `autostart` is set.
    ///
    /// A stopped polygon sweep is replaced; a running one is an
    /// [`RadarError::InvalidState`].
    pub fn add_polygon_sweep(&self, config: PolygonSweepConfig) -> Result<(), RadarError> {
        let interval = Duration::from_millis(config.interval_ms);
        let style = config.style.clone();
        let autostart = config.autostart;
        let sweep = ActiveSweep::Polygon(PolygonSweep::new(config)?);
        self.add_sweep(SweepKind::Polygon, sweep, interval, style, autostart)
    }

    fn add_sweep(
        &self,
        kind: SweepKind,
        mut sweep: ActiveSweep,
        interval: Duration,
        style: ShapeStyle,
        autostart: bool,
    ) -> Result<(), RadarError> {
        {
            let mut guard = self.lock()?;
            let r = &mut *guard;
            if r.slot(kind).is_some_and(|s| s.sweep.state().is_running()) {
                return Err(RadarError::InvalidState(format!(
                    "{}: a {} sweep is already running; stop it first",
                    r.id, kind
                )));
            }

            let shape = sweep.project(r.center)?;
            if let Some(old) = r.take_slot(kind) {
                r.renderer.remove_shape(old.shape);
            }
            let shape_kind = match kind {
                SweepKind::Line => ShapeKind::Polyline,
                SweepKind::Polygon => ShapeKind::Polygon,
            };
            let handle = r.renderer.create_shape(shape_kind, &shape, &style);
            let slot = SweepSlot {
                sweep,
                shape: handle,
                interval,
                pending: None,
                generation: 0,
                visible: true,
                last_shape: shape,
            };
            match kind {
                SweepKind::Line => r.line = Some(slot),
                SweepKind::Polygon => r.polygon = Some(slot),
            }
            log::debug!("{}: {} sweep added", r.id, kind);
        }

        if autostart {
            self.start(kind)?;
        }
        Ok(())
    }

    /// Stop a sweep and remove its shape. Does nothing if there is no such sweep.
    pub fn remove_sweep(&self, kind: SweepKind) -> Result<(), RadarError> {
        let mut guard = self.lock()?;
        let r = &mut *guard;
        r.halt(kind);
        if let Some(slot) = r.take_slot(kind) {
            r.renderer.remove_shape(slot.shape);
            log::debug!("{}: {} sweep removed", r.id, kind);
        }
        Ok(())
    }

    /// Start or resume a sweep.
    ///
    /// Runs one projection and detection pass at the current angle right away,
    /// then ticks every interval. Calling it on a running sweep does nothing;
    /// calling it on a finished sweep does nothing either (see [`Radar::restart`]).
    pub fn start(&self, kind: SweepKind) -> Result<(), RadarError> {
        {
            let mut guard = self.lock()?;
            let r = &mut *guard;
            let slot = r.slot_mut(kind).ok_or_else(|| missing(kind))?;
            let state = slot.sweep.state();
            if state.is_running() {
                return Ok(());
            }
            if state.is_finished() {
                log::debug!("{}: {} sweep already finished, not starting", r.id, kind);
                return Ok(());
            }
            slot.sweep.state_mut().set_running(true);
            slot.generation += 1;

            if let Err(e) = r.pass(kind, true) {
                r.halt(kind);
                return Err(e);
            }
            log::debug!("{}: {} sweep started", r.id, kind);
        }
        schedule_next(&self.inner, kind);
        Ok(())
    }

    /// Stop a sweep. No tick runs after this returns. Idempotent.
    pub fn stop(&self, kind: SweepKind) -> Result<(), RadarError> {
        let mut guard = self.lock()?;
        if guard.slot(kind).is_none() {
            return Err(missing(kind));
        }
        guard.halt(kind);
        log::debug!("{}: {} sweep stopped", guard.id, kind);
        Ok(())
    }

    /// Reset the lap counter and start again, even after the sweep finished
    pub fn restart(&self, kind: SweepKind) -> Result<(), RadarError> {
        {
            let mut guard = self.lock()?;
            guard.halt(kind);
            let slot = guard.slot_mut(kind).ok_or_else(|| missing(kind))?;
            slot.sweep.state_mut().reset_laps();
            guard.markers.reset_detections(kind);
        }
        self.start(kind)
    }

    /// Turn a sweep by `delta` degrees outside of the schedule.
    ///
    /// Re-projects and runs one detection pass. The lap count never moves,
    /// but landing on the origin forgets this sweep's detections so the next
    /// manual turn reports markers again. Returns the ids of markers detected
    /// by this pass.
    pub fn rotate_by(&self, kind: SweepKind, delta: f64) -> Result<Vec<MarkerId>, RadarError> {
        if !delta.is_finite() {
            return Err(RadarError::invalid(format!(
                "rotation {} is not finite",
                delta
            )));
        }
        let mut guard = self.lock()?;
        let slot = guard.slot_mut(kind).ok_or_else(|| missing(kind))?;
        let state = slot.sweep.state_mut();
        state.rotate_by(delta);
        if state.is_at_origin() {
            guard.markers.reset_detections(kind);
            log::debug!("{}: {} sweep turned back to its origin", guard.id, kind);
        }
        guard.pass(kind, true)
    }

    pub fn rotate_line_by(&self, delta: f64) -> Result<Vec<MarkerId>, RadarError> {
        self.rotate_by(SweepKind::Line, delta)
    }

    pub fn rotate_polygon_by(&self, delta: f64) -> Result<Vec<MarkerId>, RadarError> {
        self.rotate_by(SweepKind::Polygon, delta)
    }

    pub fn is_running(&self, kind: SweepKind) -> Result<bool, RadarError> {
        Ok(self
            .lock()?
            .slot(kind)
            .is_some_and(|s| s.sweep.state().is_running()))
    }

    /// True when no sweep is running
    pub fn is_idle(&self) -> Result<bool, RadarError> {
        let guard = self.lock()?;
        Ok([SweepKind::Line, SweepKind::Polygon]
            .into_iter()
            .all(|k| !guard.slot(k).is_some_and(|s| s.sweep.state().is_running())))
    }

    // -------------------------------------------------------------------------
    // Visibility
    // -------------------------------------------------------------------------

    /// Show or hide every drawn object in `layers`
    pub fn set_visible(&self, layers: Layers, visible: bool) -> Result<(), RadarError> {
        let mut guard = self.lock()?;
        let r = &mut *guard;

        if layers.contains(Layers::AXIS) {
            if let Some(axis) = &r.axis {
                axis.set_visible(visible, r.renderer.as_mut());
            }
        }
        for kind in [SweepKind::Line, SweepKind::Polygon] {
            if !layers.contains(Layers::for_sweep(kind)) {
                continue;
            }
            let slot = match kind {
                SweepKind::Line => r.line.as_mut(),
                SweepKind::Polygon => r.polygon.as_mut(),
            };
            if let Some(slot) = slot {
                slot.visible = visible;
                r.renderer.set_visible(slot.shape, visible);
            }
        }
        if layers.contains(Layers::MARKERS) {
            for m in r.markers.iter_mut() {
                m.visible = visible;
                if let Some(handle) = m.handle {
                    r.renderer.set_marker_visible(handle, visible);
                }
            }
        }
        Ok(())
    }

    pub fn show_line(&self) -> Result<(), RadarError> {
        self.set_visible(Layers::LINE, true)
    }

    pub fn hide_line(&self) -> Result<(), RadarError> {
        self.set_visible(Layers::LINE, false)
    }

    pub fn show_polygon(&self) -> Result<(), RadarError> {
        self.set_visible(Layers::POLYGON, true)
    }

    pub fn hide_polygon(&self) -> Result<(), RadarError> {
        self.set_visible(Layers::POLYGON, false)
    }

    // -------------------------------------------------------------------------
    // Markers
    // -------------------------------------------------------------------------

    /// Track and draw a marker
    pub fn add_marker(&self, descriptor: MarkerDescriptor) -> Result<(), RadarError> {
        let mut guard = self.lock()?;
        let r = &mut *guard;
        let marker = r.markers.add(descriptor)?;
        let handle = r.renderer.create_marker(&MarkerSpec {
            id: marker.id.clone(),
            position: marker.position,
            icon_ref: marker.icon_ref.clone(),
            visible: marker.visible,
        });
        marker.handle = Some(handle);
        log::trace!("{}: tracking marker {} at {}", r.id, marker.id, marker.position);
        Ok(())
    }

    /// Add several markers, stopping at the first invalid one.
    ///
    /// Markers before the failing one stay added. Returns how many were added.
    pub fn add_markers<I>(&self, descriptors: I) -> Result<usize, RadarError>
    where
        I: IntoIterator<Item = MarkerDescriptor>,
    {
        let mut added = 0;
        for d in descriptors {
            self.add_marker(d)?;
            added += 1;
        }
        Ok(added)
    }

    /// Stop tracking a marker and remove it from the renderer. Unknown ids
    /// are ignored.
    pub fn remove_marker(&self, id: &str) -> Result<(), RadarError> {
        let mut guard = self.lock()?;
        let r = &mut *guard;
        if let Some(marker) = r.markers.remove(id) {
            if let Some(handle) = marker.handle {
                r.renderer.remove_marker(handle);
            }
            log::trace!("{}: marker {} removed", r.id, id);
        }
        Ok(())
    }

    pub fn remove_markers<'a, I>(&self, ids: I) -> Result<(), RadarError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for id in ids {
            self.remove_marker(id)?;
        }
        Ok(())
    }

    pub fn marker_count(&self) -> Result<usize, RadarError> {
        Ok(self.lock()?.markers.len())
    }

    pub fn status(&self) -> Result<RadarStatus, RadarError> {
        Ok(self.lock()?.status())
    }
}
