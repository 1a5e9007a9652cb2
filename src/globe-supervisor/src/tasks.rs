//! Cooperative task loops for the supervisor process.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use crate::supervisor::{Supervisor, SupervisorError};

/// Schedule evaluation period.
pub const SCHEDULE_TICK: Duration = Duration::from_secs(60);

pub type SharedSupervisor = Arc<Mutex<Supervisor>>;

/// Supervisor-side button presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonCommand {
    /// Reserved; currently does nothing at the supervisor level.
    Power,
    /// Advance the manual mode.
    Mode,
}

/// Periodic schedule tick. A spawn failure inside the tick is fatal
/// and ends the loop; delivery failures are absorbed by the delivery
/// itself.
pub async fn run_schedule_loop(supervisor: SharedSupervisor) -> Result<(), SupervisorError> {
    let mut ticker = tokio::time::interval(SCHEDULE_TICK);
    loop {
        ticker.tick().await;
        let pending = {
            let mut supervisor = supervisor.lock().await;
            let color = supervisor.schedule_tick().await?;
            color.map(|color| (color, supervisor.delivery()))
        };
        // Deliveries back off between attempts, so they run with the
        // supervisor lock released; buttons and the HTTP surface keep
        // interleaving while the worker is unreachable.
        if let Some((color, delivery)) = pending {
            delivery.deliver(color).await;
        }
    }
}

/// Button dispatch loop; presses arrive from the interrupt wiring.
pub async fn run_button_loop(
    supervisor: SharedSupervisor,
    mut buttons: mpsc::Receiver<ButtonCommand>,
) -> Result<(), SupervisorError> {
    while let Some(command) = buttons.recv().await {
        match command {
            ButtonCommand::Power => debug!("power button pressed; nothing to do"),
            ButtonCommand::Mode => supervisor.lock().await.on_mode_button().await?,
        }
    }
    Ok(())
}
