//! Globe Schedule - day/night schedule evaluation.
//!
//! Everything here is a pure function of a timestamp (plus an
//! operator-adjustable offset), so schedule behavior is unit testable
//! against literal times. Callers obtain the timestamp themselves,
//! honoring any pinned `time_override`.

use chrono::{NaiveDateTime, TimeDelta, Timelike};
use globe_protocol::Color;

/// Minutes in a day.
const DAY_MINUTES: u16 = 24 * 60;

/// Dim nightlight default.
const NIGHT_DIM: Color = Color::new(40, 20, 0, 0);
/// Warm tint shown during the dusk window (19:00-19:30).
const DUSK_TINT: Color = Color::new(60, 40, 20, 0);
/// Green-blue tint shown during the dawn window (06:55-06:59).
const DAWN_TINT: Color = Color::new(20, 60, 40, 0);

/// True outside the daytime hours 07:00-18:59. Hour granularity only;
/// used to force the worker into nightlight mode.
pub fn is_night(t: NaiveDateTime) -> bool {
    !(7..=18).contains(&t.hour())
}

/// Color the nightlight should show at time `t`.
///
/// The dusk and dawn tint windows take precedence over the plain
/// night-time dim, so the lamp eases in and out of the night. Outside
/// of night entirely, `current` is returned unchanged.
pub fn nightlight_color(t: NaiveDateTime, current: Color) -> Color {
    if t.hour() == 19 && t.minute() <= 30 {
        DUSK_TINT
    } else if t.hour() == 6 && t.minute() >= 55 {
        DAWN_TINT
    } else if is_night(t) {
        NIGHT_DIM
    } else {
        current
    }
}

/// A schedule entry: at `minute` (of the day), the managed color
/// becomes `color`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakpoint {
    /// Minute of day, 0..1440.
    pub minute: u16,
    pub color: Color,
}

impl Breakpoint {
    pub const fn at(hour: u16, minute: u16, color: Color) -> Self {
        Self {
            minute: hour * 60 + minute,
            color,
        }
    }

    const fn hour(self) -> u16 {
        self.minute / 60
    }
}

/// The managed-mode schedule: a small immutable set of breakpoints
/// partitioning the day into a managed window and a manual window.
#[derive(Debug, Clone)]
pub struct Schedule {
    breakpoints: Vec<Breakpoint>,
}

impl Default for Schedule {
    /// Reference deployment: dawn wake-up, dusk warm-up, dusk wind-down.
    fn default() -> Self {
        Self::new(vec![
            Breakpoint::at(6, 45, Color::new(0x00, 0x20, 0x20, 0x00)),
            Breakpoint::at(19, 0, Color::new(0x40, 0x40, 0x40, 0x40)),
            Breakpoint::at(19, 15, Color::new(0x10, 0x00, 0x00, 0x00)),
        ])
    }
}

impl Schedule {
    pub fn new(breakpoints: Vec<Breakpoint>) -> Self {
        Self { breakpoints }
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    /// Whether the schedule is authoritative at time `t` shifted by
    /// `offset_secs`.
    ///
    /// The manual window is the half-open range `[dawn, dusk)`, where
    /// dawn is the breakpoint with the latest hour before noon and
    /// dusk the earliest after it. A schedule missing either side has
    /// no manual window and is managed all day.
    pub fn is_managed(&self, t: NaiveDateTime, offset_secs: i64) -> bool {
        let now = minute_of_day(t, offset_secs);
        let dawn = self
            .breakpoints
            .iter()
            .filter(|bp| bp.hour() < 12)
            .map(|bp| bp.minute)
            .max();
        let dusk = self
            .breakpoints
            .iter()
            .filter(|bp| bp.hour() > 12)
            .map(|bp| bp.minute)
            .min();
        match (dawn, dusk) {
            (Some(dawn), Some(dusk)) => !(dawn..dusk).contains(&now),
            _ => true,
        }
    }

    /// Color the schedule prescribes at time `t` shifted by
    /// `offset_secs`: the breakpoint with the smallest non-negative
    /// forward distance `(now - breakpoint) mod 1440`.
    ///
    /// An exact distance tie is broken by the smallest breakpoint
    /// minute-of-day, which makes selection deterministic.
    pub fn managed_color(&self, t: NaiveDateTime, offset_secs: i64) -> Option<Color> {
        let now = minute_of_day(t, offset_secs);
        self.breakpoints
            .iter()
            .min_by_key(|bp| (forward_distance(now, bp.minute), bp.minute))
            .map(|bp| bp.color)
    }
}

/// Minutes elapsed since the last occurrence of `from`.
fn forward_distance(now: u16, from: u16) -> u16 {
    (now + DAY_MINUTES - from) % DAY_MINUTES
}

fn minute_of_day(t: NaiveDateTime, offset_secs: i64) -> u16 {
    let shifted = t + TimeDelta::seconds(offset_secs);
    (shifted.hour() * 60 + shifted.minute()) as u16
}
