//! Globe Supervisor - owns the worker lifecycle and schedule authority.
//!
//! The supervisor runs one child worker process at a time, one per
//! fixture mode. A periodic schedule tick decides when the day/night
//! schedule takes authority over manual control: it switches the
//! fixture into managed mode and pushes schedule-decided colors to the
//! worker over a loopback HTTP channel that may fail and is retried
//! with a fixed backoff.
//!
//! Like the worker, the process is a single-threaded cooperative
//! scheduler; there is no shared memory with the worker and no
//! guarantee about its state between successful propagations.

pub mod error;
pub mod launcher;
pub mod server;
pub mod supervisor;
pub mod tasks;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{AppError, AppResult};
pub use launcher::{ProcessLauncher, WorkerLauncher, WorkerProcess};
pub use supervisor::{ColorDelivery, RetryPolicy, Supervisor, SupervisorError};
pub use transport::{HttpTransport, TransportError, WorkerTransport};
