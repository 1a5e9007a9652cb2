//! Globe Protocol - shared types for the globe lamp processes.
//!
//! This crate defines the color representation, the packed
//! gamma-corrected encoding consumed by the LED hardware, the hex
//! string codec used on the HTTP surfaces, and the mode enums shared
//! between the worker and supervisor processes.

pub mod color;
pub mod mode;

pub use color::{Color, ColorParseError, PackedColor};
pub use mode::{Mode, SupervisorMode};
