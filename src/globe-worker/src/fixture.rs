//! The physical fixture: LED globe plus status display.
//!
//! `Fixture::show` turns a light state into one emit cycle. Walk mode
//! produces frames several times a second, so its status-display
//! redraws are throttled to once per second; the globe itself is
//! updated on every frame.

use std::time::{Duration, Instant};

use globe_protocol::{Color, Mode};

use crate::hardware::{DrawCommand, DriverError, LedDriver, StatusDisplay};
use crate::state::LightState;

const DISPLAY_THROTTLE: Duration = Duration::from_secs(1);

pub struct Fixture {
    led: Box<dyn LedDriver>,
    display: Box<dyn StatusDisplay>,
    displayed_at: Option<Instant>,
}

impl Fixture {
    pub fn new(led: Box<dyn LedDriver>, display: Box<dyn StatusDisplay>) -> Self {
        Self {
            led,
            display,
            displayed_at: None,
        }
    }

    /// Emit one frame for `state`.
    pub fn show(&mut self, state: &LightState) -> Result<(), DriverError> {
        if !state.power {
            self.led.render(Color::BLACK.pack())?;
            return self.display.show(&[]);
        }

        if state.mode == Mode::Nightlight {
            let tint = globe_schedule::nightlight_color(state.now(), state.color);
            self.led.render(tint.pack())?;
            return self.display.show(&[]);
        }

        self.led.render(state.color.pack())?;

        let due = state.mode != Mode::Walk
            || self
                .displayed_at
                .is_none_or(|at| at.elapsed() > DISPLAY_THROTTLE);
        if due {
            self.display.show(&[nibble_text(state.color)])?;
            self.displayed_at = Some(Instant::now());
        }
        Ok(())
    }
}

/// Color summary drawn on the display: one hex nibble per channel.
fn nibble_text(color: Color) -> DrawCommand {
    DrawCommand::Text {
        x: 10,
        y: 10,
        text: format!(
            "{:x}{:x}{:x}{:x}",
            color.r / 16,
            color.g / 16,
            color.b / 16,
            color.w / 16
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use globe_protocol::PackedColor;
    use pretty_assertions::assert_eq;

    #[derive(Default, Clone)]
    struct Recorder {
        frames: Arc<Mutex<Vec<PackedColor>>>,
        screens: Arc<Mutex<Vec<Vec<DrawCommand>>>>,
    }

    impl LedDriver for Recorder {
        fn render(&mut self, packed: PackedColor) -> Result<(), DriverError> {
            self.frames.lock().unwrap().push(packed);
            Ok(())
        }
    }

    impl StatusDisplay for Recorder {
        fn show(&mut self, commands: &[DrawCommand]) -> Result<(), DriverError> {
            self.screens.lock().unwrap().push(commands.to_vec());
            Ok(())
        }
    }

    fn fixture() -> (Fixture, Recorder) {
        let recorder = Recorder::default();
        let fixture = Fixture::new(Box::new(recorder.clone()), Box::new(recorder.clone()));
        (fixture, recorder)
    }

    #[test]
    fn powered_off_blanks_globe_and_display() {
        let (mut fixture, recorder) = fixture();
        let mut state = LightState::new(Mode::Dance);
        state.color = Color::new(1, 2, 3, 4);
        state.power = false;

        fixture.show(&state).unwrap();
        assert_eq!(recorder.frames.lock().unwrap().as_slice(), &[0]);
        assert_eq!(recorder.screens.lock().unwrap().as_slice(), &[vec![]]);
    }

    #[test]
    fn rgbw_draws_the_nibble_summary() {
        let (mut fixture, recorder) = fixture();
        let mut state = LightState::new(Mode::Rgbw);
        state.color = Color::new(0x12, 0x34, 0x56, 0x78);

        fixture.show(&state).unwrap();
        assert_eq!(
            recorder.screens.lock().unwrap().as_slice(),
            &[vec![DrawCommand::Text {
                x: 10,
                y: 10,
                text: "1357".into()
            }]]
        );
    }

    #[test]
    fn walk_throttles_display_but_not_globe() {
        let (mut fixture, recorder) = fixture();
        let mut state = LightState::new(Mode::Walk);
        state.color = Color::new(10, 0, 0, 0);

        fixture.show(&state).unwrap();
        state.color.r += 1;
        fixture.show(&state).unwrap();

        assert_eq!(recorder.frames.lock().unwrap().len(), 2);
        assert_eq!(recorder.screens.lock().unwrap().len(), 1);
    }

    #[test]
    fn nightlight_renders_the_schedule_tint() {
        let (mut fixture, recorder) = fixture();
        let mut state = LightState::new(Mode::Nightlight);
        state.color = Color::new(9, 9, 9, 9);
        state.time_override = chrono::NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(23, 0, 0);

        fixture.show(&state).unwrap();
        let expected = Color::new(40, 20, 0, 0).pack();
        assert_eq!(recorder.frames.lock().unwrap().as_slice(), &[expected]);
    }
}
