use crate::telemetry::{Field, PumpControl};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};
use tracing::info;

pub type SharedField = Arc<Mutex<Field>>;

#[derive(Debug, Serialize)]
pub struct PumpView {
    #[serde(flatten)]
    control: PumpControl,
    override_remaining: i64,
}

impl PumpView {
    fn new(control: &PumpControl, now: DateTime<Utc>) -> Self {
        Self {
            control: control.clone(),
            override_remaining: control.override_remaining(now),
        }
    }
}

/// Rejected request body, rendered as `{message, errors}`.
#[derive(Debug, PartialEq)]
pub struct ApiError {
    message: &'static str,
    errors: Map<String, Value>,
}

impl ApiError {
    fn field(message: &'static str, field: &str, reason: &str) -> Self {
        let mut errors = Map::new();
        errors.insert(field.to_string(), json!(reason));
        Self { message, errors }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "message": self.message, "errors": self.errors });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

pub fn create_router(field: SharedField) -> Router {
    Router::new()
        .route("/api/latest/", get(latest))
        .route("/api/pump/", get(pump_status).post(pump_command))
        .route("/api/upload/", post(upload))
        .with_state(field)
}

fn lock(field: &SharedField) -> std::sync::MutexGuard<'_, Field> {
    // A poisoned lock still holds a consistent field
    field.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn latest(State(field): State<SharedField>) -> Response {
    match lock(&field).latest() {
        Some(record) => Json(record.clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "No sensor data available" })),
        )
            .into_response(),
    }
}

async fn pump_status(State(field): State<SharedField>) -> Json<PumpView> {
    let field = lock(&field);
    Json(PumpView::new(&field.control, Utc::now()))
}

async fn pump_command(
    State(field): State<SharedField>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let (pump_status, override_seconds) = parse_pump_command(&body)?;

    let now = Utc::now();
    let mut field = lock(&field);
    field.control.set_manual(pump_status, override_seconds, now);

    match override_seconds {
        Some(secs) => info!("Manual override: pump {} for {}s", on_off(pump_status), secs),
        None => info!("Manual override: pump {} until further notice", on_off(pump_status)),
    }

    Ok(Json(json!({
        "message": "Pump control updated successfully",
        "data": PumpView::new(&field.control, now),
    })))
}

async fn upload(
    State(field): State<SharedField>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (moisture, pump) = parse_upload(&body)?;
    let record = lock(&field).record(moisture, pump, Utc::now());

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Sensor data uploaded successfully", "data": record })),
    ))
}

fn on_off(is_on: bool) -> &'static str {
    if is_on {
        "ON"
    } else {
        "OFF"
    }
}

/// `override_seconds` may be an integer or an integer string; absent or
/// `null` means an indefinite override.
pub fn parse_pump_command(body: &Value) -> Result<(bool, Option<u64>), ApiError> {
    let pump_status = match body.get("pump_status") {
        Some(Value::Bool(status)) => *status,
        None | Some(Value::Null) => {
            return Err(ApiError::field(
                "pump_status is required",
                "pump_status",
                "This field is required.",
            ))
        }
        Some(_) => {
            return Err(ApiError::field(
                "Invalid pump_status",
                "pump_status",
                "Must be a boolean (true/false).",
            ))
        }
    };

    let seconds = match body.get("override_seconds") {
        None | Some(Value::Null) => return Ok((pump_status, None)),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };

    match seconds {
        Some(secs) if secs >= 0 => Ok((pump_status, Some(secs as u64))),
        _ => Err(ApiError::field(
            "Invalid override_seconds",
            "override_seconds",
            "Must be a positive integer.",
        )),
    }
}

pub fn parse_upload(body: &Value) -> Result<(f64, bool), ApiError> {
    const INVALID: &str = "Invalid data";

    // Sensor glitches outside 0..=100 are stored as reported
    let moisture = match body.get("moisture").and_then(Value::as_f64) {
        Some(m) => m,
        None => return Err(ApiError::field(INVALID, "moisture", "A valid number is required.")),
    };

    let pump = match body.get("pump") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(pump)) => *pump,
        Some(_) => return Err(ApiError::field(INVALID, "pump", "Must be a boolean.")),
    };

    Ok((moisture, pump))
}
