//! One radar run: build the radar from a [`ServerConfig`], let it sweep on
//! tokio timers, and report its final state.
//!
//! A run ends when the first of these happens: every sweep has finished its
//! laps, the optional run time elapses, or the process receives Ctrl-C.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use georadar_core::{Radar, RadarError, RadarStatus, Renderer, Scheduler, SweepKind};
use serde::Serialize;
use tokio::task::LocalSet;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::tokio_timer::TokioScheduler;

/// How often the session checks whether all sweeps have finished
const IDLE_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Detection callbacks fired during the run
    pub detections: u64,
    pub status: RadarStatus,
}

/// Build a radar from `config`. Every configured marker gets a callback that
/// logs the detection and bumps `detections`.
pub fn build_radar(
    config: ServerConfig,
    renderer: Box<dyn Renderer>,
    scheduler: Rc<dyn Scheduler>,
    detections: Rc<Cell<u64>>,
) -> Result<Radar, ServerError> {
    let radar = Radar::new(config.radar, renderer, scheduler)?;

    if let Some(axis) = config.axis {
        radar.draw_axis(axis)?;
    }

    // Markers first, so that the first pass of an autostarted sweep sees them
    for marker in config.markers {
        let id = radar.id().to_string();
        let counter = detections.clone();
        radar.add_marker(marker.on_detect(move |d| {
            counter.set(counter.get() + 1);
            log::info!(
                "{}: {} detected by {} sweep on lap {}, bearing {:.1} deg, {:.3} km",
                id,
                d.marker_id,
                d.sweep,
                d.lap,
                d.bearing,
                d.distance_km
            );
            Ok(())
        }))?;
    }

    if let Some(line) = config.line {
        radar.add_line_sweep(line)?;
    }
    if let Some(polygon) = config.polygon {
        radar.add_polygon_sweep(polygon)?;
    }

    Ok(radar)
}

/// Stop every configured sweep. Returns false when one of them could not be
/// stopped; the failure is logged.
fn stop_sweeps(radar: &Radar) -> bool {
    let mut stopped = true;
    for kind in [SweepKind::Line, SweepKind::Polygon] {
        match radar.stop(kind) {
            // NotFound just means that sweep was never configured
            Ok(()) | Err(RadarError::NotFound(_)) => {}
            Err(e) => {
                log::warn!("{}: cannot stop {} sweep: {}", radar.id(), kind, e);
                stopped = false;
            }
        }
    }
    stopped
}

async fn until_idle(radar: &Radar) {
    let mut poll = tokio::time::interval(IDLE_POLL);
    loop {
        poll.tick().await;
        if radar.is_idle().unwrap_or(false) {
            return;
        }
    }
}

async fn until_elapsed(run_time: Option<Duration>) {
    match run_time {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending().await,
    }
}

async fn run_local(
    config: ServerConfig,
    renderer: Box<dyn Renderer>,
    run_time: Option<Duration>,
) -> Result<RunSummary, ServerError> {
    let scheduler = Rc::new(TokioScheduler::new());
    let detections = Rc::new(Cell::new(0));
    let radar = build_radar(config, renderer, scheduler.clone(), detections.clone())?;
    log::info!("{}: radar running", radar.id());

    tokio::select! {
        _ = until_idle(&radar) => log::info!("{}: all sweeps finished", radar.id()),
        _ = until_elapsed(run_time) => log::info!("{}: run time elapsed", radar.id()),
        res = tokio::signal::ctrl_c() => match res {
            Ok(()) => log::info!("{}: interrupted", radar.id()),
            Err(e) => log::warn!("{}: cannot listen for Ctrl-C: {}", radar.id(), e),
        },
    }

    stop_sweeps(&radar);

    Ok(RunSummary {
        detections: detections.get(),
        status: radar.status()?,
    })
}

/// Run one radar to completion on the current thread.
///
/// The radar and its timers are not `Send`; they live on a [`LocalSet`]
/// owned by this call.
pub async fn run(
    config: ServerConfig,
    renderer: Box<dyn Renderer>,
    run_time: Option<Duration>,
) -> Result<RunSummary, ServerError> {
    LocalSet::new()
        .run_until(run_local(config, renderer, run_time))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use georadar_core::{
        destination_point, GeoPoint, LineSweepConfig, MarkerDescriptor, PolygonSweepConfig,
        ManualScheduler, RadarConfig, RecordingRenderer,
    };
    use std::cell::RefCell;

    fn marker_at(id: &str, bearing: f64) -> MarkerDescriptor {
        let p = destination_point(GeoPoint::new(0.0, 0.0), 0.2, bearing).unwrap();
        MarkerDescriptor::new(id, p.lat, p.lng, "marker.png")
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_sweeps_finish() {
        let config = ServerConfig {
            radar: RadarConfig::at(0.0, 0.0),
            line: Some(LineSweepConfig {
                angle_increase: 90.0,
                lap_max: 1,
                ..Default::default()
            }),
            markers: vec![marker_at("east", 90.0), marker_at("south", 180.0)],
            ..Default::default()
        };

        let summary = run(config, Box::new(RecordingRenderer::new()), None)
            .await
            .unwrap();
        assert_eq!(summary.detections, 2);
        let line = summary.status.line.unwrap();
        assert!(line.finished);
        assert_eq!(line.lap_current, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_time_limit() {
        let config = ServerConfig {
            radar: RadarConfig::at(0.0, 0.0),
            line: Some(LineSweepConfig::default()),
            polygon: Some(PolygonSweepConfig::default()),
            markers: vec![marker_at("ne", 45.0)],
            ..Default::default()
        };

        let summary = run(
            config,
            Box::new(RecordingRenderer::new()),
            Some(Duration::from_secs(2)),
        )
        .await
        .unwrap();
        // 2 s at 5 deg per 100 ms reaches 100 deg: both sweeps passed 45 deg once
        assert_eq!(summary.detections, 2);
        assert!(!summary.status.line.unwrap().running);
        assert!(!summary.status.polygon.unwrap().running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_to_sweep_ends_at_once() {
        let config = ServerConfig {
            radar: RadarConfig::at(10.0, 10.0),
            ..Default::default()
        };
        let summary = run(config, Box::new(RecordingRenderer::new()), None)
            .await
            .unwrap();
        assert_eq!(summary.detections, 0);
        assert!(summary.status.line.is_none());
    }

    #[tokio::test]
    async fn test_invalid_config_is_reported() {
        let err = run(
            ServerConfig::standard(),
            Box::new(RecordingRenderer::new()),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ServerError::Radar(RadarError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_build_radar_order() {
        let scheduler = Rc::new(ManualScheduler::new());
        let detections = Rc::new(Cell::new(0));
        let config = ServerConfig {
            radar: RadarConfig::at(0.0, 0.0),
            line: Some(LineSweepConfig::default()),
            markers: vec![marker_at("north", 0.0)],
            ..Default::default()
        };
        let radar = build_radar(
            config,
            Box::new(RecordingRenderer::new()),
            scheduler.clone(),
            detections.clone(),
        )
        .unwrap();

        // The immediate pass at 0 deg already found the marker
        assert_eq!(detections.get(), 1);
        assert_eq!(radar.marker_count().unwrap(), 1);
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn test_stop_sweeps_skips_missing_kind() {
        let scheduler = Rc::new(ManualScheduler::new());
        let radar = Radar::new(
            RadarConfig::at(0.0, 0.0),
            Box::new(RecordingRenderer::new()),
            scheduler.clone(),
        )
        .unwrap();
        radar.add_line_sweep(LineSweepConfig::default()).unwrap();

        assert!(stop_sweeps(&radar));
        assert!(radar.is_idle().unwrap());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_stop_sweeps_reports_busy_radar() {
        let scheduler = Rc::new(ManualScheduler::new());
        let radar = Rc::new(
            Radar::new(
                RadarConfig::at(0.0, 0.0),
                Box::new(RecordingRenderer::new()),
                scheduler.clone(),
            )
            .unwrap(),
        );
        let outcome = Rc::new(RefCell::new(None));

        // A callback runs while the radar is borrowed, so stopping from it fails
        let (r, o) = (Rc::downgrade(&radar), outcome.clone());
        radar
            .add_marker(marker_at("north", 0.0).on_detect(move |_| {
                if let Some(radar) = r.upgrade() {
                    *o.borrow_mut() = Some(stop_sweeps(&radar));
                }
                Ok(())
            }))
            .unwrap();
        radar.add_line_sweep(LineSweepConfig::default()).unwrap();

        assert_eq!(*outcome.borrow(), Some(false));
        assert!(radar.is_running(SweepKind::Line).unwrap());
        assert!(stop_sweeps(&radar));
    }
}
