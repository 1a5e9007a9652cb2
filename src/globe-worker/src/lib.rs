//! Globe Worker - the process driving one display mode of the lamp.
//!
//! A worker owns the light state for exactly one launch mode, runs the
//! continuous animation loops, renders frames to the LED globe and the
//! status display, and exposes a small HTTP surface for color control.
//! The supervisor process starts and stops workers; a worker never
//! switches its own launch mode (night-lock aside).
//!
//! Everything runs on a single-threaded cooperative scheduler: tasks
//! interleave only at await points, so handler bodies are atomic with
//! respect to other loop-scheduled work.

pub mod engine;
pub mod error;
pub mod fixture;
pub mod hardware;
pub mod server;
pub mod state;
pub mod tasks;

pub use error::{AppError, AppResult};
pub use fixture::Fixture;
pub use state::{ButtonCommand, Channel, LightState};
