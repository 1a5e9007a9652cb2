//! Cooperative task loops.
//!
//! One logical task per animation loop, one for the night-lock clock
//! tick, one for inbound button events, and one render task that owns
//! the fixture. All of them run on the single-threaded runtime and
//! interleave only at await points; "cancellation" is a loop observing
//! a changed mode or power flag at the top of its next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use crate::engine::{self, DANCE_TICK, WALK_TICK};
use crate::fixture::Fixture;
use crate::hardware::DriverError;
use crate::state::{ButtonCommand, LightState};

/// Night-lock evaluation period.
const NIGHT_TICK: Duration = Duration::from_secs(1);

/// Frame requests are coalesced: a full queue means a render is
/// already pending and the next one will pick up the latest state.
const FRAME_QUEUE: usize = 8;

pub type SharedState = Arc<Mutex<LightState>>;

/// Handle for requesting a render of the current state.
#[derive(Clone)]
pub struct FrameSender(mpsc::Sender<()>);

impl FrameSender {
    pub fn request(&self) {
        let _ = self.0.try_send(());
    }
}

pub fn frame_channel() -> (FrameSender, mpsc::Receiver<()>) {
    let (tx, rx) = mpsc::channel(FRAME_QUEUE);
    (FrameSender(tx), rx)
}

/// Render task. Owns the fixture; every emit cycle flows through here
/// (mirroring the display's command-queue design). A driver failure
/// ends the task with an error, which takes the whole worker process
/// down - render failures are fatal and only an external restart
/// recovers.
pub async fn run_render_loop(
    state: SharedState,
    mut fixture: Fixture,
    mut frames: mpsc::Receiver<()>,
) -> Result<(), DriverError> {
    while frames.recv().await.is_some() {
        let snapshot = *state.lock().await;
        fixture.show(&snapshot)?;
    }
    Ok(())
}

/// Walk animation loop. Idles (without emitting) whenever the mode or
/// power flag does not match; never destroyed, so re-entering walk
/// mode resumes cleanly.
pub async fn run_walk_loop(state: SharedState, frames: FrameSender) {
    let mut ticker = tokio::time::interval(WALK_TICK);
    loop {
        ticker.tick().await;
        let emitted = {
            let mut light = state.lock().await;
            engine::walk_tick(&mut light, &mut rand::rng())
        };
        if emitted {
            frames.request();
        }
    }
}

/// Dance animation loop; same idle semantics as the walk loop.
pub async fn run_dance_loop(state: SharedState, frames: FrameSender) {
    let mut ticker = tokio::time::interval(DANCE_TICK);
    loop {
        ticker.tick().await;
        let emitted = {
            let mut light = state.lock().await;
            engine::dance_tick(&mut light, &mut rand::rng())
        };
        if emitted {
            frames.request();
        }
    }
}

/// Clock tick forcing nightlight mode while the schedule says night.
pub async fn run_night_lock_loop(state: SharedState, frames: FrameSender) {
    let mut ticker = tokio::time::interval(NIGHT_TICK);
    loop {
        ticker.tick().await;
        let forced = state.lock().await.night_lock();
        if forced {
            debug!("night lock forced nightlight mode");
            frames.request();
        }
    }
}

/// Button dispatch loop. Presses arrive from the interrupt wiring over
/// the channel and run here, atomically with respect to the other
/// loops. Presses whose precondition fails are ignored.
pub async fn run_button_loop(
    state: SharedState,
    frames: FrameSender,
    mut buttons: mpsc::Receiver<ButtonCommand>,
) {
    while let Some(command) = buttons.recv().await {
        let changed = {
            let mut light = state.lock().await;
            light.apply(command, &mut rand::rng())
        };
        if changed {
            frames.request();
        } else {
            debug!(?command, "button press ignored");
        }
    }
}
