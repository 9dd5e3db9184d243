//! Sweep angle progression and lap counting

use serde::{Deserialize, Serialize};

use crate::geo::{angular_distance, normalize_angle, ANGLE_EPSILON};

/// Result of one [`SweepState::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Sweep is stopped, nothing changed
    Idle,
    /// Angle moved within the current lap
    Moved,
    /// Angle moved back to (or past) the origin; a new lap begins
    LapCompleted,
    /// The last allowed lap completed; the sweep is now stopped for good
    Finished,
}

impl Advance {
    /// True when detections of the previous lap must be forgotten
    pub fn starts_new_lap(&self) -> bool {
        matches!(self, Advance::LapCompleted | Advance::Finished)
    }
}

/// Angle and lap bookkeeping shared by line and polygon sweeps.
///
/// Invariants: `angle` stays in `[0, 360)`; `lap_current` only moves when
/// `lap_max != 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepState {
    angle: f64,
    angle_origin: f64,
    angle_increase: f64,
    angle_max_overture: f64,
    lap_current: u32,
    lap_max: u32,
    running: bool,
}

impl SweepState {
    pub fn new(
        angle: f64,
        angle_origin: f64,
        angle_increase: f64,
        angle_max_overture: f64,
        lap_max: u32,
    ) -> Self {
        SweepState {
            angle: normalize_angle(angle),
            angle_origin: normalize_angle(angle_origin),
            angle_increase,
            angle_max_overture,
            lap_current: 0,
            lap_max,
            running: false,
        }
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn angle_origin(&self) -> f64 {
        self.angle_origin
    }

    pub fn angle_increase(&self) -> f64 {
        self.angle_increase
    }

    pub fn angle_max_overture(&self) -> f64 {
        self.angle_max_overture
    }

    pub fn lap_current(&self) -> u32 {
        self.lap_current
    }

    pub fn lap_max(&self) -> u32 {
        self.lap_max
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// All allowed laps are done; only a restart can run it again
    pub fn is_finished(&self) -> bool {
        self.lap_max != 0 && self.lap_current >= self.lap_max
    }

    pub(crate) fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    /// Back to lap zero, keeping the current angle
    pub(crate) fn reset_laps(&mut self) {
        self.lap_current = 0;
    }

    /// True when the angle sits on the origin, within rounding
    pub fn is_at_origin(&self) -> bool {
        angular_distance(self.angle, self.angle_origin) < ANGLE_EPSILON
    }

    /// Move the sweep one step.
    ///
    /// A lap completes when the angle travelled since the origin reaches or
    /// passes a full turn. With an increase that divides 360 this is exactly
    /// the tick where the angle lands back on the origin. A negative increase
    /// turns counter-clockwise and travels the other way round.
    pub fn advance(&mut self) -> Advance {
        if !self.running {
            return Advance::Idle;
        }

        let travelled = if self.angle_increase >= 0.0 {
            normalize_angle(self.angle - self.angle_origin) + self.angle_increase
        } else {
            normalize_angle(self.angle_origin - self.angle) - self.angle_increase
        };
        self.angle = normalize_angle(self.angle + self.angle_increase);

        if travelled < 360.0 - ANGLE_EPSILON {
            return Advance::Moved;
        }

        if (travelled - 360.0).abs() < ANGLE_EPSILON {
            // Absorb accumulated rounding so the next lap starts exactly on the origin
            self.angle = self.angle_origin;
        }

        if self.lap_max == 0 {
            return Advance::LapCompleted;
        }

        self.lap_current += 1;
        if self.lap_current >= self.lap_max {
            self.running = false;
            Advance::Finished
        } else {
            Advance::LapCompleted
        }
    }

    /// Manual nudge: no lap bookkeeping, works whether running or not.
    /// Landing within rounding of the origin snaps onto it.
    pub fn rotate_by(&mut self, delta: f64) {
        self.angle = normalize_angle(self.angle + delta);
        if self.is_at_origin() {
            self.angle = self.angle_origin;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(angle_increase: f64, lap_max: u32) -> SweepState {
        let mut s = SweepState::new(0.0, 0.0, angle_increase, 10.0, lap_max);
        s.set_running(true);
        s
    }

    #[test]
    fn test_stopped_is_idle() {
        let mut s = SweepState::new(0.0, 0.0, 5.0, 10.0, 0);
        assert_eq!(s.advance(), Advance::Idle);
        assert_eq!(s.angle(), 0.0);
    }

    #[test]
    fn test_two_laps_of_90_degrees() {
        let mut s = running(90.0, 2);
        let mut outcomes = Vec::new();
        for _ in 0..8 {
            outcomes.push(s.advance());
        }
        assert_eq!(
            outcomes,
            vec![
                Advance::Moved,
                Advance::Moved,
                Advance::Moved,
                Advance::LapCompleted,
                Advance::Moved,
                Advance::Moved,
                Advance::Moved,
                Advance::Finished,
            ]
        );
        assert!(!s.is_running());
        assert!(s.is_finished());
        assert_eq!(s.lap_current(), 2);

        // Terminal: further advances change nothing
        assert_eq!(s.advance(), Advance::Idle);
        assert_eq!(s.angle(), 0.0);
        assert_eq!(s.lap_current(), 2);
    }

    #[test]
    fn test_infinite_sweep_never_finishes() {
        let mut s = running(45.0, 0);
        let mut laps = 0;
        for _ in 0..8000 {
            match s.advance() {
                Advance::LapCompleted => laps += 1,
                Advance::Finished | Advance::Idle => panic!("infinite sweep stopped"),
                Advance::Moved => {}
            }
        }
        assert_eq!(laps, 1000);
        assert_eq!(s.lap_current(), 0);
        assert!(s.is_running());
    }

    #[test]
    fn test_angle_stays_normalized() {
        let mut s = running(7.0, 0);
        for _ in 0..1000 {
            s.advance();
            assert!((0.0..360.0).contains(&s.angle()));
        }
    }

    #[test]
    fn test_lap_with_non_dividing_increase() {
        // 7 degrees never lands on 0 exactly; the lap is counted on the wrap
        let mut s = running(7.0, 1);
        let mut ticks = 0;
        while s.advance() != Advance::Finished {
            ticks += 1;
            assert!(ticks < 100);
        }
        // 51 * 7 = 357, the 52nd tick wraps
        assert_eq!(ticks + 1, 52);
    }

    #[test]
    fn test_fractional_increase_has_no_drift() {
        let mut s = running(0.1, 0);
        let mut laps = 0;
        for _ in 0..36000 {
            if s.advance() == Advance::LapCompleted {
                laps += 1;
            }
        }
        assert_eq!(laps, 10);
    }

    #[test]
    fn test_origin_other_than_zero() {
        let mut s = SweepState::new(90.0, 90.0, 90.0, 10.0, 1);
        s.set_running(true);
        assert_eq!(s.advance(), Advance::Moved); // 180
        assert_eq!(s.advance(), Advance::Moved); // 270
        assert_eq!(s.advance(), Advance::Moved); // 0
        assert_eq!(s.advance(), Advance::Finished); // 90
        assert_eq!(s.angle(), 90.0);
    }

    #[test]
    fn test_rotate_by_skips_lap_bookkeeping() {
        let mut s = SweepState::new(350.0, 0.0, 5.0, 10.0, 1);
        s.rotate_by(20.0);
        assert_eq!(s.angle(), 10.0);
        assert_eq!(s.lap_current(), 0);
        s.rotate_by(-30.0);
        assert_eq!(s.angle(), 340.0);
        assert!(!s.is_at_origin());
        s.rotate_by(20.0);
        assert!(s.is_at_origin());
        assert_eq!(s.angle(), 0.0);
        assert_eq!(s.lap_current(), 0);
    }

    #[test]
    fn test_counter_clockwise_lap() {
        let mut s = running(-90.0, 1);
        assert_eq!(s.advance(), Advance::Moved);
        assert_eq!(s.angle(), 270.0);
        assert_eq!(s.advance(), Advance::Moved);
        assert_eq!(s.angle(), 180.0);
        assert_eq!(s.advance(), Advance::Moved);
        assert_eq!(s.angle(), 90.0);
        assert_eq!(s.advance(), Advance::Finished);
        assert_eq!(s.angle(), 0.0);
        assert_eq!(s.lap_current(), 1);
    }

    #[test]
    fn test_counter_clockwise_fractional_laps() {
        let mut s = running(-0.1, 0);
        let mut laps = 0;
        for _ in 0..7200 {
            if s.advance() == Advance::LapCompleted {
                laps += 1;
            }
        }
        assert_eq!(laps, 2);
        assert!(s.is_at_origin());
    }
}
