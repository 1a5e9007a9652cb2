//! Supervisor HTTP surface.
//!
//! `GET /state` reports the fixture state (worker color, clock,
//! offset, mode, schedule); `POST /state` adjusts the clock offset and
//! sets a manual color. Color changes are only honored while the
//! schedule is not authoritative.

use std::collections::BTreeMap;

use axum::extract::{Form, State};
use axum::routing::get;
use axum::{Json, Router};
use globe_protocol::{Color, Mode, SupervisorMode};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::tasks::SharedSupervisor;

#[derive(Clone)]
pub struct AppState {
    pub supervisor: SharedSupervisor,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/state", get(get_state).post(post_state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Fixture state as reported to the UI.
#[derive(Debug, Serialize)]
pub struct StateResponse {
    /// Worker-reported color, empty while the worker is unreachable.
    pub color: String,
    /// Current time, ISO-8601.
    pub now: String,
    /// Operator clock offset in seconds.
    pub offset: i64,
    /// Supervisor mode ordinal (0 = managed).
    pub mode: u8,
    /// Schedule breakpoints, "HH:MM" -> color hex.
    pub managed_colors: BTreeMap<String, String>,
}

async fn get_state(State(state): State<AppState>) -> Json<StateResponse> {
    let supervisor = state.supervisor.lock().await;
    let color = supervisor
        .worker_color()
        .await
        .map(Color::to_hex)
        .unwrap_or_default();
    let managed_colors = supervisor
        .schedule()
        .breakpoints()
        .iter()
        .map(|bp| {
            let key = format!("{:02}:{:02}", bp.minute / 60, bp.minute % 60);
            (key, bp.color.to_hex())
        })
        .collect();
    Json(StateResponse {
        color,
        now: supervisor.now().format("%Y-%m-%dT%H:%M:%S").to_string(),
        offset: supervisor.offset_secs(),
        mode: supervisor.mode().ordinal(),
        managed_colors,
    })
}

/// Form payload for `POST /state`.
#[derive(Debug, Deserialize)]
struct StateUpdate {
    offset: Option<i64>,
    color: Option<String>,
}

async fn post_state(
    State(state): State<AppState>,
    Form(update): Form<StateUpdate>,
) -> AppResult<&'static str> {
    let color = update
        .color
        .as_deref()
        .map(str::parse::<Color>)
        .transpose()
        .map_err(|err| AppError::BadRequest(format!("invalid color: {err}")))?;

    let pending = {
        let mut supervisor = state.supervisor.lock().await;
        if let Some(offset) = update.offset {
            supervisor.set_offset_secs(offset);
        }
        match color {
            Some(color) if supervisor.is_managed() => {
                // The schedule owns the color right now.
                debug!(%color, "manual color ignored while managed");
                None
            }
            Some(color) => {
                supervisor
                    .switch_mode(SupervisorMode::Manual(Mode::Rgbw))
                    .await
                    .map_err(|err| AppError::Internal(err.to_string()))?;
                Some((color, supervisor.delivery()))
            }
            None => None,
        }
    };
    // Retries run with the lock released; failures are swallowed like
    // any delivery.
    if let Some((color, delivery)) = pending {
        delivery.deliver(color).await;
    }
    Ok("ok")
}
