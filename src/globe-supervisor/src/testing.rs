//! Test doubles for the launcher and transport traits.

use std::io;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use globe_protocol::{Color, Mode};

use crate::launcher::{WorkerLauncher, WorkerProcess};
use crate::transport::{TransportError, WorkerTransport};

/// Record of spawn and terminate calls.
#[derive(Default)]
pub(crate) struct SpawnLog {
    pub spawned: Mutex<Vec<Mode>>,
    pub terminated: AtomicUsize,
}

pub(crate) struct MockLauncher {
    log: Arc<SpawnLog>,
    fail: bool,
}

impl MockLauncher {
    pub fn new() -> (Self, Arc<SpawnLog>) {
        let log = Arc::new(SpawnLog::default());
        (
            Self {
                log: log.clone(),
                fail: false,
            },
            log,
        )
    }

    pub fn failing() -> (Self, Arc<SpawnLog>) {
        let (mut launcher, log) = Self::new();
        launcher.fail = true;
        (launcher, log)
    }
}

#[async_trait]
impl WorkerLauncher for MockLauncher {
    async fn spawn(&self, mode: Mode) -> io::Result<Box<dyn WorkerProcess>> {
        if self.fail {
            return Err(io::Error::other("mock spawn failure"));
        }
        self.log.spawned.lock().unwrap().push(mode);
        Ok(Box::new(MockProcess {
            log: self.log.clone(),
        }))
    }
}

struct MockProcess {
    log: Arc<SpawnLog>,
}

impl WorkerProcess for MockProcess {
    fn terminate(&mut self) {
        self.log.terminated.fetch_add(1, Ordering::SeqCst);
    }
}

/// Transport double that fails a configurable number of leading
/// `set_color` calls and records everything that got through.
pub(crate) struct MockTransport {
    fail_first: u32,
    pub calls: AtomicU32,
    pub sent: Mutex<Vec<Color>>,
    pub reported: Mutex<Option<Color>>,
}

impl MockTransport {
    pub fn ok() -> Arc<Self> {
        Self::failing_first(0)
    }

    pub fn failing_first(fail_first: u32) -> Arc<Self> {
        Arc::new(Self {
            fail_first,
            calls: AtomicU32::new(0),
            sent: Mutex::new(Vec::new()),
            reported: Mutex::new(Some(Color::new(0, 0, 0, 255))),
        })
    }
}

#[async_trait]
impl WorkerTransport for MockTransport {
    async fn set_color(&self, color: Color) -> Result<(), TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first {
            return Err(TransportError::Status(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
            ));
        }
        self.sent.lock().unwrap().push(color);
        Ok(())
    }

    async fn get_color(&self) -> Result<Color, TransportError> {
        self.reported
            .lock()
            .unwrap()
            .ok_or(TransportError::Status(reqwest::StatusCode::BAD_GATEWAY))
    }
}
