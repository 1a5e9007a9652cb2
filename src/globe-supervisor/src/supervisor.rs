//! The supervisor state machine.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use globe_protocol::{Color, Mode, SupervisorMode};
use globe_schedule::Schedule;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::launcher::{WorkerLauncher, WorkerProcess};
use crate::transport::WorkerTransport;

/// Error from supervisor operations. Worker spawn failure is the only
/// fatal one; delivery failures are retried and then swallowed.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to spawn worker process: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Retry policy for color delivery: a fixed backoff and a bounded
/// number of attempts. Exhaustion is non-fatal; the next schedule tick
/// retries from scratch.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            backoff: Duration::from_secs(3),
        }
    }
}

/// The worker the supervisor currently owns.
struct WorkerHandle {
    mode: Mode,
    process: Box<dyn WorkerProcess>,
}

/// Owns the fixture's authoritative mode, the worker process and the
/// operator clock offset.
///
/// `schedule_tick` and `on_mode_button` both mutate the mode and the
/// worker handle with no mutual exclusion beyond the cooperative
/// scheduler: a button press racing a schedule-driven restart resolves
/// last-write-wins, in whatever order the scheduler runs the tasks.
pub struct Supervisor {
    mode: SupervisorMode,
    worker: Option<WorkerHandle>,
    offset_secs: i64,
    schedule: Schedule,
    launcher: Box<dyn WorkerLauncher>,
    transport: Arc<dyn WorkerTransport>,
    retry: RetryPolicy,
    time_override: Option<NaiveDateTime>,
}

impl Supervisor {
    pub fn new(
        schedule: Schedule,
        launcher: Box<dyn WorkerLauncher>,
        transport: Arc<dyn WorkerTransport>,
    ) -> Self {
        Self {
            mode: SupervisorMode::Manual(Mode::Rgbw),
            worker: None,
            offset_secs: 0,
            schedule,
            launcher,
            transport,
            retry: RetryPolicy::default(),
            time_override: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_offset(mut self, offset_secs: i64) -> Self {
        self.offset_secs = offset_secs;
        self
    }

    pub fn mode(&self) -> SupervisorMode {
        self.mode
    }

    pub fn offset_secs(&self) -> i64 {
        self.offset_secs
    }

    pub fn set_offset_secs(&mut self, offset_secs: i64) {
        self.offset_secs = offset_secs;
    }

    /// Pin "now" for deterministic schedule behavior.
    pub fn set_time_override(&mut self, time: Option<NaiveDateTime>) {
        self.time_override = time;
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Mode of the currently running worker, if any.
    pub fn worker_mode(&self) -> Option<Mode> {
        self.worker.as_ref().map(|handle| handle.mode)
    }

    pub fn now(&self) -> NaiveDateTime {
        self.time_override
            .unwrap_or_else(|| Local::now().naive_local())
    }

    /// Whether the schedule is authoritative right now.
    pub fn is_managed(&self) -> bool {
        self.schedule.is_managed(self.now(), self.offset_secs)
    }

    /// Detached handle for delivering colors to the worker. Deliveries
    /// back off between attempts, so callers run them after releasing
    /// the supervisor lock; button presses and the HTTP surface keep
    /// interleaving while a delivery retries.
    pub fn delivery(&self) -> ColorDelivery {
        ColorDelivery {
            transport: self.transport.clone(),
            retry: self.retry,
        }
    }

    /// Terminate the current worker (if any) and spawn a fresh one for
    /// `mode`. At most one worker is ever alive. Spawn failure is
    /// fatal and propagated; it leaves no worker running.
    pub async fn switch_mode(&mut self, mode: SupervisorMode) -> Result<(), SupervisorError> {
        if let Some(mut handle) = self.worker.take() {
            handle.process.terminate();
        }
        let worker_mode = mode.worker_mode();
        let process = self.launcher.spawn(worker_mode).await?;
        self.worker = Some(WorkerHandle {
            mode: worker_mode,
            process,
        });
        self.mode = mode;
        info!(?mode, ?worker_mode, "switched mode");
        Ok(())
    }

    /// Spawn a worker for the current mode if none is running yet.
    pub async fn ensure_worker(&mut self) -> Result<(), SupervisorError> {
        if self.worker.is_none() {
            self.switch_mode(self.mode).await
        } else {
            Ok(())
        }
    }

    /// Periodic schedule evaluation: take authority when the schedule
    /// says so. Returns the color the schedule prescribes; the caller
    /// delivers it through [`Supervisor::delivery`] once the supervisor
    /// lock is released.
    pub async fn schedule_tick(&mut self) -> Result<Option<Color>, SupervisorError> {
        if !self.is_managed() {
            return Ok(None);
        }
        if !self.mode.is_managed() {
            self.switch_mode(SupervisorMode::Managed).await?;
        }
        Ok(self.schedule.managed_color(self.now(), self.offset_secs))
    }

    /// Manual mode button. Ignored while the schedule is authoritative;
    /// otherwise advances through the four display modes (never
    /// selecting managed) and restarts the worker.
    pub async fn on_mode_button(&mut self) -> Result<(), SupervisorError> {
        if self.is_managed() {
            debug!("mode button ignored while managed");
            return Ok(());
        }
        let next = self.mode.advance();
        self.switch_mode(next).await
    }

    /// Current color as reported by the worker; transport failures
    /// surface as `None` (stale state is tolerated until the next
    /// delivery).
    pub async fn worker_color(&self) -> Option<Color> {
        match self.transport.get_color().await {
            Ok(color) => Some(color),
            Err(err) => {
                debug!(%err, "failed to read worker color");
                None
            }
        }
    }
}

/// Pushes a color to the active worker, retrying transport failures
/// with a fixed backoff. Holds no supervisor state, so an in-flight
/// delivery never blocks the mode button or the HTTP surface.
#[derive(Clone)]
pub struct ColorDelivery {
    transport: Arc<dyn WorkerTransport>,
    retry: RetryPolicy,
}

impl ColorDelivery {
    /// Returns whether the color was delivered; exhausted retries are
    /// logged and swallowed.
    pub async fn deliver(&self, color: Color) -> bool {
        for attempt in 1..=self.retry.attempts {
            match self.transport.set_color(color).await {
                Ok(()) => {
                    debug!(%color, attempt, "delivered color to worker");
                    return true;
                }
                Err(err) => {
                    debug!(%color, attempt, %err, "color delivery failed");
                    if attempt < self.retry.attempts {
                        sleep(self.retry.backoff).await;
                    }
                }
            }
        }
        warn!(
            %color,
            attempts = self.retry.attempts,
            "dropping color after exhausting retries; next tick starts over"
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use chrono::NaiveDate;
    use globe_schedule::Breakpoint;
    use pretty_assertions::assert_eq;
    use tokio::sync::Mutex;

    use crate::testing::{MockLauncher, MockTransport};

    const COLOR_A: Color = Color::new(1, 0, 0, 0);
    const COLOR_B: Color = Color::new(2, 0, 0, 0);
    const COLOR_C: Color = Color::new(3, 0, 0, 0);

    fn test_schedule() -> Schedule {
        Schedule::new(vec![
            Breakpoint::at(7, 0, COLOR_A),
            Breakpoint::at(19, 0, COLOR_B),
            Breakpoint::at(19, 30, COLOR_C),
        ])
    }

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn fast_retry(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            backoff: Duration::from_secs(3),
        }
    }

    fn supervisor(transport: Arc<MockTransport>) -> (Supervisor, Arc<crate::testing::SpawnLog>) {
        let (launcher, log) = MockLauncher::new();
        let supervisor = Supervisor::new(test_schedule(), Box::new(launcher), transport);
        (supervisor, log)
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_succeeding_on_the_last_attempt_reports_success() {
        let transport = MockTransport::failing_first(9);
        let (supervisor, _log) = supervisor(transport.clone());
        let supervisor = supervisor.with_retry(fast_retry(10));

        assert!(supervisor.delivery().deliver(COLOR_A).await);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_stops_after_the_attempt_budget() {
        let transport = MockTransport::failing_first(u32::MAX);
        let (supervisor, _log) = supervisor(transport.clone());
        let supervisor = supervisor.with_retry(fast_retry(10));

        assert!(!supervisor.delivery().deliver(COLOR_A).await);
        // Exhausted, swallowed, and no eleventh attempt.
        assert_eq!(transport.calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_backoff_leaves_the_supervisor_unlocked() {
        let transport = MockTransport::failing_first(u32::MAX);
        let (mut supervisor, log) = supervisor(transport.clone());
        supervisor.set_time_override(Some(at(12, 0)));
        let supervisor = supervisor.with_retry(fast_retry(10));
        let shared = Arc::new(Mutex::new(supervisor));

        let delivery = shared.lock().await.delivery();
        let deliver = tokio::spawn(async move { delivery.deliver(COLOR_A).await });

        // One second into the failing delivery, a mode press still
        // gets the lock and restarts the worker.
        tokio::time::sleep(Duration::from_secs(1)).await;
        shared.lock().await.on_mode_button().await.unwrap();
        assert_eq!(log.spawned.lock().unwrap().as_slice(), &[Mode::Walk]);

        assert!(!deliver.await.unwrap());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn switch_mode_terminates_the_previous_worker() {
        let (mut supervisor, log) = supervisor(MockTransport::ok());

        supervisor
            .switch_mode(SupervisorMode::Manual(Mode::Rgbw))
            .await
            .unwrap();
        supervisor
            .switch_mode(SupervisorMode::Manual(Mode::Walk))
            .await
            .unwrap();

        assert_eq!(
            log.spawned.lock().unwrap().as_slice(),
            &[Mode::Rgbw, Mode::Walk]
        );
        assert_eq!(log.terminated.load(Ordering::SeqCst), 1);
        assert_eq!(supervisor.worker_mode(), Some(Mode::Walk));
    }

    #[tokio::test]
    async fn spawn_failure_is_fatal_and_propagated() {
        let transport = MockTransport::ok();
        let (launcher, _log) = MockLauncher::failing();
        let mut supervisor = Supervisor::new(test_schedule(), Box::new(launcher), transport);

        let result = supervisor.switch_mode(SupervisorMode::Manual(Mode::Rgbw)).await;
        assert!(matches!(result, Err(SupervisorError::Spawn(_))));
        assert_eq!(supervisor.worker_mode(), None);
    }

    #[tokio::test]
    async fn schedule_tick_takes_authority_and_yields_the_color() {
        let (mut supervisor, log) = supervisor(MockTransport::ok());
        supervisor.set_time_override(Some(at(19, 10)));

        let pending = supervisor.schedule_tick().await.unwrap();

        assert_eq!(supervisor.mode(), SupervisorMode::Managed);
        // Managed runs an rgbw worker so colors display immediately.
        assert_eq!(log.spawned.lock().unwrap().as_slice(), &[Mode::Rgbw]);
        // 19:00 is the nearest breakpoint behind 19:10.
        assert_eq!(pending, Some(COLOR_B));
    }

    #[tokio::test]
    async fn schedule_tick_is_idle_during_the_manual_window() {
        let (mut supervisor, log) = supervisor(MockTransport::ok());
        supervisor.set_time_override(Some(at(12, 0)));

        let pending = supervisor.schedule_tick().await.unwrap();

        assert_eq!(pending, None);
        assert_eq!(supervisor.mode(), SupervisorMode::Manual(Mode::Rgbw));
        assert!(log.spawned.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn schedule_tick_does_not_restart_an_already_managed_worker() {
        let (mut supervisor, log) = supervisor(MockTransport::ok());
        supervisor.set_time_override(Some(at(20, 0)));

        let first = supervisor.schedule_tick().await.unwrap();
        let second = supervisor.schedule_tick().await.unwrap();

        assert_eq!(log.spawned.lock().unwrap().len(), 1);
        assert_eq!(first, Some(COLOR_C));
        assert_eq!(second, Some(COLOR_C));
    }

    #[tokio::test]
    async fn mode_button_is_ignored_while_managed() {
        let (mut supervisor, log) = supervisor(MockTransport::ok());
        supervisor.set_time_override(Some(at(20, 0)));

        supervisor.on_mode_button().await.unwrap();
        assert!(log.spawned.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn mode_button_advances_and_restarts_the_worker() {
        let (mut supervisor, log) = supervisor(MockTransport::ok());
        supervisor.set_time_override(Some(at(12, 0)));

        supervisor.on_mode_button().await.unwrap();
        supervisor.on_mode_button().await.unwrap();

        assert_eq!(supervisor.mode(), SupervisorMode::Manual(Mode::Dance));
        assert_eq!(
            log.spawned.lock().unwrap().as_slice(),
            &[Mode::Walk, Mode::Dance]
        );
    }

    #[tokio::test]
    async fn offset_moves_the_managed_window() {
        let (mut supervisor, _log) = supervisor(MockTransport::ok());
        supervisor.set_time_override(Some(at(18, 30)));

        assert!(!supervisor.is_managed());
        supervisor.set_offset_secs(3600);
        assert!(supervisor.is_managed());
    }

    #[tokio::test]
    async fn ensure_worker_spawns_only_once() {
        let (mut supervisor, log) = supervisor(MockTransport::ok());

        supervisor.ensure_worker().await.unwrap();
        supervisor.ensure_worker().await.unwrap();

        assert_eq!(log.spawned.lock().unwrap().len(), 1);
        assert_eq!(log.terminated.load(Ordering::SeqCst), 0);
    }
}
