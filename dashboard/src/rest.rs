use crate::dashboard::{DashboardHandle, DashboardSnapshot};
use crate::errors::Error;
use crate::model::PumpState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::{error, warn};

#[derive(Clone)]
struct AppState {
    dashboard: DashboardHandle,
}

#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    pump_status: bool,
    override_seconds: i64,
}

/// Operator API: the current view model plus the two pump commands.
pub fn create_router(dashboard: DashboardHandle) -> Router {
    let state = AppState { dashboard };

    Router::new()
        .route("/api/v1/dashboard", get(get_dashboard))
        .route("/api/v1/pump/toggle", post(toggle_pump))
        .route("/api/v1/pump/override", post(set_override))
        .with_state(state)
}

async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    Json(state.dashboard.snapshot())
}

async fn toggle_pump(State(state): State<AppState>) -> Result<Json<PumpState>, AppError> {
    let pump = state.dashboard.toggle().await?;
    Ok(Json(pump))
}

async fn set_override(
    State(state): State<AppState>,
    Json(request): Json<OverrideRequest>,
) -> Result<Json<PumpState>, AppError> {
    let pump = state
        .dashboard
        .set_override(request.pump_status, request.override_seconds)
        .await?;
    Ok(Json(pump))
}

pub struct AppError(anyhow::Error);

fn status_for(err: &anyhow::Error) -> StatusCode {
    match err.downcast_ref::<Error>() {
        Some(Error::Validation(_)) => StatusCode::BAD_REQUEST,
        Some(Error::CommandInProgress) => StatusCode::CONFLICT,
        Some(Error::PumpCommand(_) | Error::SensorFetch(_) | Error::PumpFetch(_)) => {
            StatusCode::BAD_GATEWAY
        }
        Some(Error::Stopped) => StatusCode::SERVICE_UNAVAILABLE,
        None => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!("API error: {}", self.0);
        } else {
            warn!("API request rejected: {}", self.0);
        }

        (status, self.0.to_string()).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
