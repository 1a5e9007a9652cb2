//! Hardware capability interfaces.
//!
//! The physical LED signal generation and the pixel-buffer rendering
//! of the status display live outside this crate; the worker only
//! talks to them through these traits. The in-tree implementations
//! log frames through `tracing` so the binary runs without hardware
//! attached.

use globe_protocol::PackedColor;
use thiserror::Error;
use tracing::trace;

/// Failure in a hardware driver. Init and render failures are fatal
/// for the worker process; the supervisor's next mode switch restarts
/// it.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("LED driver failure: {0}")]
    Led(String),

    #[error("status display failure: {0}")]
    Display(String),
}

/// A drawing primitive for the status display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    Rectangle {
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        fill: bool,
        outline: bool,
    },
    Ellipse {
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        fill: bool,
        outline: bool,
    },
    Line {
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        fill: bool,
    },
    Polygon {
        points: Vec<(i32, i32)>,
        fill: bool,
        outline: bool,
    },
    Text {
        x: i32,
        y: i32,
        text: String,
    },
}

/// Pushes packed color words to the light-emitting element.
pub trait LedDriver: Send {
    fn render(&mut self, packed: PackedColor) -> Result<(), DriverError>;
}

/// Renders draw commands onto the status display. An empty command
/// list blanks the screen.
pub trait StatusDisplay: Send {
    fn show(&mut self, commands: &[DrawCommand]) -> Result<(), DriverError>;
}

/// LED driver that logs frames instead of emitting a signal.
#[derive(Debug, Default)]
pub struct TracingLed;

impl LedDriver for TracingLed {
    fn render(&mut self, packed: PackedColor) -> Result<(), DriverError> {
        trace!(packed = format!("{packed:08x}"), "led frame");
        Ok(())
    }
}

/// Status display that logs draw commands.
#[derive(Debug, Default)]
pub struct TracingDisplay;

impl StatusDisplay for TracingDisplay {
    fn show(&mut self, commands: &[DrawCommand]) -> Result<(), DriverError> {
        trace!(?commands, "display frame");
        Ok(())
    }
}
