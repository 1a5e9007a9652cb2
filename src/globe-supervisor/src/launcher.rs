//! Worker process launching.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use globe_protocol::Mode;
use tokio::process::{Child, Command};
use tracing::{info, warn};

/// A running worker process. Termination is best effort; worker
/// crashes are not actively detected, so a silently dead worker is
/// only replaced on the next mode switch.
pub trait WorkerProcess: Send + Sync {
    fn terminate(&mut self);
}

/// Spawns a worker for a display mode. Spawn failure is fatal to the
/// caller; it is never retried here.
#[async_trait]
pub trait WorkerLauncher: Send + Sync {
    async fn spawn(&self, mode: Mode) -> io::Result<Box<dyn WorkerProcess>>;
}

/// Launches the real worker binary with the mode ordinal argument.
pub struct ProcessLauncher {
    program: PathBuf,
    worker_listen: String,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>, worker_listen: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            worker_listen: worker_listen.into(),
        }
    }
}

#[async_trait]
impl WorkerLauncher for ProcessLauncher {
    async fn spawn(&self, mode: Mode) -> io::Result<Box<dyn WorkerProcess>> {
        let child = Command::new(&self.program)
            .arg(mode.ordinal().to_string())
            .arg("--listen")
            .arg(&self.worker_listen)
            .kill_on_drop(true)
            .spawn()?;
        info!(?mode, pid = child.id(), "spawned worker");
        Ok(Box::new(ChildProcess(child)))
    }
}

struct ChildProcess(Child);

impl WorkerProcess for ChildProcess {
    fn terminate(&mut self) {
        if let Err(err) = self.0.start_kill() {
            // Already exited or unkillable; the replacement worker
            // takes over either way.
            warn!(%err, "failed to terminate worker");
        }
    }
}
