//! Globe supervisor binary.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use globe_schedule::Schedule;
use globe_supervisor::server::{self, AppState};
use globe_supervisor::{HttpTransport, ProcessLauncher, Supervisor, tasks};

/// Globe lamp supervisor process
#[derive(Parser)]
#[command(name = "globe-supervisor")]
#[command(about = "Owns the globe lamp worker lifecycle and schedule")]
#[command(version)]
struct Args {
    /// Listen address for the state API
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    listen: String,

    /// Worker binary to launch
    #[arg(long, default_value = "globe-worker")]
    worker_program: String,

    /// Address the worker listens on
    #[arg(long, default_value = "127.0.0.1:8888")]
    worker_listen: String,

    /// Initial clock offset in seconds
    #[arg(long, default_value_t = 0)]
    offset: i64,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    json_logs: bool,
}

fn setup_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer()).init();
    }
}

// Single-threaded cooperative scheduler, matching the worker.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_logging(&args.log_level, args.json_logs);

    let launcher = ProcessLauncher::new(&args.worker_program, &args.worker_listen);
    let transport = HttpTransport::new(format!("http://{}", args.worker_listen));
    let supervisor = Supervisor::new(Schedule::default(), Box::new(launcher), Arc::new(transport))
        .with_offset(args.offset);
    let supervisor = Arc::new(Mutex::new(supervisor));

    // Bring the fixture up: give the schedule first say, then fall
    // back to a manual worker if it declined.
    let pending = {
        let mut supervisor = supervisor.lock().await;
        let pending = supervisor
            .schedule_tick()
            .await
            .context("initial schedule tick failed")?;
        supervisor
            .ensure_worker()
            .await
            .context("failed to start initial worker")?;
        pending.map(|color| (color, supervisor.delivery()))
    };
    if let Some((color, delivery)) = pending {
        delivery.deliver(color).await;
    }

    // Physical button interrupts are wired up externally and feed
    // this channel; the handle stays alive for the process lifetime.
    let (_button_tx, button_rx) = mpsc::channel(16);

    let app = server::router(AppState {
        supervisor: supervisor.clone(),
    });
    let listener = TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    info!("listening on {}", args.listen);

    tokio::select! {
        result = tasks::run_schedule_loop(supervisor.clone()) => {
            result.context("schedule loop failed")?;
            Ok(())
        }
        result = tasks::run_button_loop(supervisor, button_rx) => {
            result.context("button loop failed")?;
            Ok(())
        }
        result = axum::serve(listener, app) => {
            result.context("http server failed")?;
            Ok(())
        }
    }
}
