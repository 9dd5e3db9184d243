//! Render command output.
//!
//! The server has no map to draw on. Instead each renderer call is turned into
//! a [`RenderCommand`] and handed to a [`CommandSink`]: either the log, or a
//! stream of JSON lines that a map frontend can replay.

use std::io::Write;

use georadar_core::{
    GeoPoint, MarkerHandle, MarkerSpec, RenderCommand, Renderer, ShapeHandle, ShapeKind,
    ShapeStyle,
};

/// Destination for render commands
pub trait CommandSink {
    fn emit(&mut self, cmd: RenderCommand);
}

/// Writes commands to the log.
///
/// Creation and removal are logged at debug level; the per-tick shape
/// updates at trace level.
#[derive(Debug, Default)]
pub struct LogSink;

impl CommandSink for LogSink {
    fn emit(&mut self, cmd: RenderCommand) {
        match &cmd {
            RenderCommand::UpdateShape { handle, points } => {
                log::trace!("shape {} -> {} points", handle.0, points.len());
            }
            RenderCommand::CreateCircle {
                handle,
                center,
                radius_m,
                ..
            } => {
                log::debug!("circle {} at {} r={} m", handle.0, center, radius_m);
            }
            RenderCommand::CreateMarker { handle, marker } => {
                log::debug!("marker {} '{}' at {}", handle.0, marker.id, marker.position);
            }
            other => log::debug!("{:?}", other),
        }
    }
}

/// Writes one JSON object per command, newline terminated
pub struct JsonLinesSink<W: Write> {
    out: W,
    failed: bool,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        JsonLinesSink { out, failed: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, cmd: &RenderCommand) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.out, cmd)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

impl<W: Write> CommandSink for JsonLinesSink<W> {
    fn emit(&mut self, cmd: RenderCommand) {
        if let Err(e) = self.write(&cmd) {
            // One warning is enough; a closed pipe stays closed
            if !self.failed {
                log::warn!("Cannot write render command: {}", e);
                self.failed = true;
            }
        }
    }
}

/// [`Renderer`] that allocates handles and forwards every call to a sink
pub struct CommandRenderer<S: CommandSink> {
    next_handle: u64,
    sink: S,
}

pub type LogRenderer = CommandRenderer<LogSink>;

impl<S: CommandSink> CommandRenderer<S> {
    pub fn new(sink: S) -> Self {
        CommandRenderer {
            next_handle: 1,
            sink,
        }
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn alloc_handle(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }
}

impl<S: CommandSink> Renderer for CommandRenderer<S> {
    fn create_circle(&mut self, center: GeoPoint, radius_m: f64, style: &ShapeStyle) -> ShapeHandle {
        let handle = ShapeHandle(self.alloc_handle());
        self.sink.emit(RenderCommand::CreateCircle {
            handle,
            center,
            radius_m,
            style: style.clone(),
        });
        handle
    }

    fn create_shape(&mut self, kind: ShapeKind, points: &[GeoPoint], style: &ShapeStyle) -> ShapeHandle {
        let handle = ShapeHandle(self.alloc_handle());
        self.sink.emit(RenderCommand::CreateShape {
            handle,
            kind,
            points: points.to_vec(),
            style: style.clone(),
        });
        handle
    }

    fn update_shape(&mut self, handle: ShapeHandle, points: &[GeoPoint]) {
        self.sink.emit(RenderCommand::UpdateShape {
            handle,
            points: points.to_vec(),
        });
    }

    fn set_visible(&mut self, handle: ShapeHandle, visible: bool) {
        self.sink.emit(RenderCommand::SetVisible { handle, visible });
    }

    fn remove_shape(&mut self, handle: ShapeHandle) {
        self.sink.emit(RenderCommand::RemoveShape { handle });
    }

    fn create_marker(&mut self, marker: &MarkerSpec) -> MarkerHandle {
        let handle = MarkerHandle(self.alloc_handle());
        self.sink.emit(RenderCommand::CreateMarker {
            handle,
            marker: marker.clone(),
        });
        handle
    }

    fn set_marker_visible(&mut self, handle: MarkerHandle, visible: bool) {
        self.sink.emit(RenderCommand::SetMarkerVisible { handle, visible });
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        self.sink.emit(RenderCommand::RemoveMarker { handle });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(renderer: CommandRenderer<JsonLinesSink<Vec<u8>>>) -> Vec<serde_json::Value> {
        let bytes = renderer.into_sink().into_inner();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_json_lines_output() {
        let mut r = CommandRenderer::new(JsonLinesSink::new(Vec::new()));
        let center = GeoPoint::new(1.0, 2.0);
        let circle = r.create_circle(center, 1000.0, &ShapeStyle::axis());
        let line = r.create_shape(ShapeKind::Polyline, &[center, center], &ShapeStyle::line());
        r.update_shape(line, &[center]);
        r.remove_shape(circle);

        let out = lines(r);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0]["op"], "createCircle");
        assert_eq!(out[0]["radiusM"], 1000.0);
        assert_eq!(out[1]["kind"], "polyline");
        assert_eq!(out[2]["op"], "updateShape");
        assert_eq!(out[2]["points"][0]["lat"], 1.0);
        assert_eq!(out[3]["handle"], circle.0);
    }

    #[test]
    fn test_handles_are_unique() {
        let mut r = CommandRenderer::new(LogSink);
        let s = r.create_circle(GeoPoint::default(), 1.0, &ShapeStyle::axis());
        let m = r.create_marker(&MarkerSpec {
            id: "m".into(),
            position: GeoPoint::default(),
            icon_ref: "m.png".into(),
            visible: true,
        });
        let t = r.create_shape(ShapeKind::Polygon, &[], &ShapeStyle::polygon());
        assert_ne!(s.0, m.0);
        assert_ne!(s, t);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_errors_are_not_fatal() {
        let mut r = CommandRenderer::new(JsonLinesSink::new(BrokenPipe));
        r.create_circle(GeoPoint::default(), 1.0, &ShapeStyle::axis());
        r.remove_marker(MarkerHandle(7));
        assert!(r.into_sink().failed);
    }
}
