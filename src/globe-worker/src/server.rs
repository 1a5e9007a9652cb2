//! Worker HTTP surface.
//!
//! `GET /color` returns the current color as eight hex digits;
//! `POST /color` sets the color (and optionally the walk target or a
//! pinned time) and triggers an immediate display cycle. `GET /state`
//! exposes the full light state for the supervisor UI.

use axum::extract::{Form, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, NaiveDateTime};
use globe_protocol::Color;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::error::{AppError, AppResult};
use crate::tasks::{FrameSender, SharedState};

/// Shared handles for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub light: SharedState,
    pub frames: FrameSender,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/color", get(get_color).post(post_color))
        .route("/state", get(get_state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn get_color(State(state): State<AppState>) -> String {
    state.light.lock().await.color.to_hex()
}

/// Form payload for `POST /color`. All fields optional; `time` accepts
/// an empty string to clear the override.
#[derive(Debug, Deserialize)]
struct ColorUpdate {
    color: Option<String>,
    target: Option<String>,
    time: Option<String>,
}

async fn post_color(
    State(state): State<AppState>,
    Form(update): Form<ColorUpdate>,
) -> AppResult<&'static str> {
    // Parse everything before touching state: malformed input is
    // rejected with no state change.
    let color = parse_color(update.color.as_deref())?;
    let target = parse_color(update.target.as_deref())?;
    let time = update
        .time
        .as_deref()
        .map(parse_time_override)
        .transpose()?;

    {
        let mut light = state.light.lock().await;
        if let Some(color) = color {
            light.color = color;
        }
        if let Some(target) = target {
            light.target = Some(target);
        }
        if let Some(overridden) = time {
            light.time_override = overridden;
        }
    }
    state.frames.request();
    Ok("ok")
}

/// Snapshot of the worker's light state.
#[derive(Debug, Serialize)]
pub struct LightSnapshot {
    pub power: bool,
    pub mode: u8,
    pub color: String,
    pub target: Option<String>,
}

async fn get_state(State(state): State<AppState>) -> Json<LightSnapshot> {
    let light = state.light.lock().await;
    Json(LightSnapshot {
        power: light.power,
        mode: light.mode.ordinal(),
        color: light.color.to_hex(),
        target: light.target.map(Color::to_hex),
    })
}

fn parse_color(value: Option<&str>) -> Result<Option<Color>, AppError> {
    value
        .map(str::parse)
        .transpose()
        .map_err(|err| AppError::BadRequest(format!("invalid color: {err}")))
}

/// Parse an ISO-8601 time; an empty string clears the override.
fn parse_time_override(value: &str) -> Result<Option<NaiveDateTime>, AppError> {
    if value.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .map(Some)
        .map_err(|err| AppError::BadRequest(format!("invalid time: {err}")))
}
