//! Fixture operating modes.
//!
//! A worker process runs exactly one display mode. The supervisor
//! additionally knows a `Managed` mode, which is not a display mode
//! of its own: it selects which worker is running and hands color
//! authority to the schedule.

use serde::{Deserialize, Serialize};

/// Display mode run by a worker process.
///
/// The ordinal is the worker's process entry parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Mode {
    #[default]
    Rgbw = 0,
    Walk = 1,
    Dance = 2,
    Nightlight = 3,
}

impl Mode {
    pub const COUNT: u8 = 4;

    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    pub const fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(Self::Rgbw),
            1 => Some(Self::Walk),
            2 => Some(Self::Dance),
            3 => Some(Self::Nightlight),
            _ => None,
        }
    }

    /// Next mode in button-advance order, wrapping after the last.
    pub const fn next(self) -> Self {
        match self {
            Self::Rgbw => Self::Walk,
            Self::Walk => Self::Dance,
            Self::Dance => Self::Nightlight,
            Self::Nightlight => Self::Rgbw,
        }
    }
}

/// Supervisor-level mode: either the schedule is authoritative, or the
/// operator manually selected a display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorMode {
    Managed,
    Manual(Mode),
}

impl SupervisorMode {
    /// Reported ordinal: 0 for `Managed`, display ordinal + 1 for
    /// manual modes, matching the historical enum numbering.
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::Managed => 0,
            Self::Manual(mode) => mode.ordinal() + 1,
        }
    }

    pub const fn is_managed(self) -> bool {
        matches!(self, Self::Managed)
    }

    /// Display mode the worker for this supervisor mode runs.
    /// `Managed` runs an Rgbw worker so propagated colors display
    /// immediately.
    pub const fn worker_mode(self) -> Mode {
        match self {
            Self::Managed => Mode::Rgbw,
            Self::Manual(mode) => mode,
        }
    }

    /// Manual button advance. Cycles the four display modes and wraps
    /// away from `Managed`, which is schedule-only and never selected
    /// by hand.
    pub const fn advance(self) -> Self {
        match self {
            Self::Managed => Self::Manual(Mode::Rgbw),
            Self::Manual(mode) => Self::Manual(mode.next()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn advance_cycles_exactly_four_modes() {
        let mut mode = Mode::Rgbw;
        let mut seen = Vec::new();
        for _ in 0..Mode::COUNT {
            seen.push(mode);
            mode = mode.next();
        }
        assert_eq!(mode, Mode::Rgbw);
        assert_eq!(
            seen,
            vec![Mode::Rgbw, Mode::Walk, Mode::Dance, Mode::Nightlight]
        );
    }

    #[test]
    fn ordinal_roundtrip() {
        for ordinal in 0..Mode::COUNT {
            let mode = Mode::from_ordinal(ordinal).unwrap();
            assert_eq!(mode.ordinal(), ordinal);
        }
        assert_eq!(Mode::from_ordinal(4), None);
    }

    #[test]
    fn manual_advance_never_selects_managed() {
        let mut mode = SupervisorMode::Manual(Mode::Rgbw);
        for _ in 0..16 {
            mode = mode.advance();
            assert!(!mode.is_managed());
        }
    }

    #[test]
    fn advance_wraps_away_from_managed() {
        assert_eq!(
            SupervisorMode::Managed.advance(),
            SupervisorMode::Manual(Mode::Rgbw)
        );
        assert_eq!(
            SupervisorMode::Manual(Mode::Nightlight).advance(),
            SupervisorMode::Manual(Mode::Rgbw)
        );
    }

    #[test]
    fn supervisor_ordinals_match_historical_numbering() {
        assert_eq!(SupervisorMode::Managed.ordinal(), 0);
        assert_eq!(SupervisorMode::Manual(Mode::Rgbw).ordinal(), 1);
        assert_eq!(SupervisorMode::Manual(Mode::Nightlight).ordinal(), 4);
    }
}
