//! Continuous animation generators.
//!
//! Each generator is a plain tick function that re-validates its
//! precondition (mode and power) and reports whether it produced a
//! frame. The async loops in [`crate::tasks`] call these on a fixed
//! period; a mode change away from the animation simply makes the next
//! tick a no-op, so loops idle instead of being cancelled and resume
//! cleanly when the mode returns.

use std::time::Duration;

use globe_protocol::Mode;
use rand::Rng;

use crate::state::{LightState, random_color};

/// Walk step period.
pub const WALK_TICK: Duration = Duration::from_millis(150);
/// Dance step period.
pub const DANCE_TICK: Duration = Duration::from_secs(1);

/// One walk step: every channel moves by exactly one toward the
/// target, never overshooting. When the target is reached (or was
/// never set) a fresh random one is sampled first. Returns true when
/// a frame was produced.
pub fn walk_tick(state: &mut LightState, rng: &mut impl Rng) -> bool {
    if !state.power || state.mode != Mode::Walk {
        return false;
    }
    let target = match state.target {
        Some(target) if target != state.color => target,
        _ => {
            let fresh = random_color(rng);
            state.target = Some(fresh);
            fresh
        }
    };
    state.color.r = step(state.color.r, target.r);
    state.color.g = step(state.color.g, target.g);
    state.color.b = step(state.color.b, target.b);
    state.color.w = step(state.color.w, target.w);
    true
}

/// One dance step: an entirely new random color every tick.
pub fn dance_tick(state: &mut LightState, rng: &mut impl Rng) -> bool {
    if !state.power || state.mode != Mode::Dance {
        return false;
    }
    state.color = random_color(rng);
    true
}

fn step(current: u8, target: u8) -> u8 {
    match current.cmp(&target) {
        std::cmp::Ordering::Less => current + 1,
        std::cmp::Ordering::Greater => current - 1,
        std::cmp::Ordering::Equal => current,
    }
}
