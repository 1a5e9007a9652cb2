//! Globe worker binary.
//!
//! Launched by the supervisor with a single mode-ordinal argument;
//! runs that display mode until terminated.

use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use globe_protocol::Mode;
use globe_worker::hardware::{TracingDisplay, TracingLed};
use globe_worker::server::{self, AppState};
use globe_worker::state::LightState;
use globe_worker::{Fixture, tasks};

/// Globe lamp worker process
#[derive(Parser)]
#[command(name = "globe-worker")]
#[command(about = "Runs one display mode of the globe lamp")]
#[command(version)]
struct Args {
    /// Display mode ordinal (0 rgbw, 1 walk, 2 dance, 3 nightlight)
    mode: u8,

    /// Listen address for the color API
    #[arg(short, long, default_value = "127.0.0.1:8888")]
    listen: String,

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

// Single-threaded cooperative scheduler: tasks interleave only at
// await points, there is no parallel mutation within the process.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_logging(&args.log_level, args.json_logs);

    let Some(mode) = Mode::from_ordinal(args.mode) else {
        bail!("invalid mode ordinal {} (expected 0-3)", args.mode);
    };
    info!(?mode, "starting globe worker");

    let light: tasks::SharedState = Arc::new(Mutex::new(LightState::new(mode)));
    let (frames, frame_rx) = tasks::frame_channel();

    // Physical button interrupts are wired up externally and feed
    // this channel; the handle stays alive for the process lifetime.
    let (_button_tx, button_rx) = mpsc::channel(16);

    let fixture = Fixture::new(Box::new(TracingLed), Box::new(TracingDisplay));
    frames.request(); // initial display cycle

    tokio::spawn(tasks::run_walk_loop(light.clone(), frames.clone()));
    tokio::spawn(tasks::run_dance_loop(light.clone(), frames.clone()));
    tokio::spawn(tasks::run_night_lock_loop(light.clone(), frames.clone()));
    tokio::spawn(tasks::run_button_loop(
        light.clone(),
        frames.clone(),
        button_rx,
    ));

    let app = server::router(AppState {
        light: light.clone(),
        frames,
    });
    let listener = TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    info!("listening on {}", args.listen);

    let render = tasks::run_render_loop(light, fixture, frame_rx);
    tokio::select! {
        result = render => {
            // Driver failure is fatal; the supervisor's next mode
            // switch restarts the process.
            result.context("hardware driver failed")?;
            Ok(())
        }
        result = axum::serve(listener, app) => {
            result.context("http server failed")?;
            Ok(())
        }
    }
}
