//! Light state and the button-driven mode state machine.

use chrono::{Local, NaiveDateTime};
use globe_protocol::{Color, Mode};
use rand::Rng;

/// One of the four color channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red,
    Green,
    Blue,
    White,
}

/// A physical button press, decoded by the interrupt wiring and
/// dispatched through a single handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonCommand {
    PowerToggle,
    ModeAdvance,
    ChannelBump(Channel),
}

/// Complete state of the light as seen by one worker process.
///
/// Created at worker start, mutated by button events and animation
/// ticks, gone when the process exits. `target` is only meaningful in
/// walk mode; `time_override` pins "now" for deterministic schedule
/// behavior in tests and operator experiments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightState {
    pub power: bool,
    pub mode: Mode,
    pub color: Color,
    pub target: Option<Color>,
    pub time_override: Option<NaiveDateTime>,
}

impl LightState {
    /// Initial state for a freshly launched worker: powered on,
    /// white-only color.
    pub fn new(mode: Mode) -> Self {
        Self {
            power: true,
            mode,
            color: Color::new(0, 0, 0, 255),
            target: None,
            time_override: None,
        }
    }

    /// Current time, honoring a pinned override.
    pub fn now(&self) -> NaiveDateTime {
        self.time_override
            .unwrap_or_else(|| Local::now().naive_local())
    }

    pub fn is_night(&self) -> bool {
        globe_schedule::is_night(self.now())
    }

    /// Apply a button command. Returns true when state changed and a
    /// new frame should be emitted; presses whose precondition fails
    /// are ignored, not errors.
    pub fn apply(&mut self, command: ButtonCommand, rng: &mut impl Rng) -> bool {
        match command {
            ButtonCommand::PowerToggle => {
                self.power = !self.power;
                true
            }
            ButtonCommand::ModeAdvance => self.advance_mode(rng),
            ButtonCommand::ChannelBump(channel) => self.bump_channel(channel),
        }
    }

    /// Night-lock clock tick: while the schedule says night, the lamp
    /// is forced into nightlight mode regardless of power or manual
    /// selection. Returns true when the mode was forced.
    pub fn night_lock(&mut self) -> bool {
        if self.is_night() && self.mode != Mode::Nightlight {
            self.mode = Mode::Nightlight;
            true
        } else {
            false
        }
    }

    fn advance_mode(&mut self, rng: &mut impl Rng) -> bool {
        if !self.power || self.is_night() {
            return false;
        }
        self.mode = self.mode.next();
        self.target = None;
        match self.mode {
            Mode::Walk => self.target = Some(random_color(rng)),
            Mode::Dance => self.color = random_color(rng),
            Mode::Rgbw | Mode::Nightlight => {}
        }
        true
    }

    fn bump_channel(&mut self, channel: Channel) -> bool {
        if !self.power || self.mode != Mode::Rgbw {
            return false;
        }
        let value = match channel {
            Channel::Red => &mut self.color.r,
            Channel::Green => &mut self.color.g,
            Channel::Blue => &mut self.color.b,
            Channel::White => &mut self.color.w,
        };
        *value = bump(*value);
        true
    }
}

/// Round up to the next multiple of 16, wrapping 240 -> 0.
fn bump(value: u8) -> u8 {
    let v = u16::from(value);
    ((v - v % 16 + 16) % 256) as u8
}

/// Uniform random color over the rgb channels; generated colors keep
/// the white channel dark.
pub fn random_color(rng: &mut impl Rng) -> Color {
    Color::new(rng.random(), rng.random(), rng.random(), 0)
}
