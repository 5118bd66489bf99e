use serde::Serialize;
use thiserror::Error;

/// Errors surfaced to the dashboard's consumers.
///
/// Transport details are collapsed into the fetch/command kinds before they
/// get here, so presentation only ever sees this taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Error {
    #[error("Sensor fetch failed: {0}")]
    SensorFetch(String),

    #[error("Pump fetch failed: {0}")]
    PumpFetch(String),

    #[error("Pump command failed: {0}")]
    PumpCommand(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Another pump command is still in progress")]
    CommandInProgress,

    #[error("Dashboard is stopped")]
    Stopped,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by a [`RemoteSource`](crate::source::RemoteSource).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("URL parse error: {0}")]
    UrlParse(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Remote source replied with status {0}")]
    Status(u32),

    #[error("Remote source unavailable: {0}")]
    Unavailable(String),
}

impl From<chipp_http::Error> for TransportError {
    fn from(err: chipp_http::Error) -> Self {
        use chipp_http::ErrorKind;

        match err.kind {
            ErrorKind::HttpError(response) => Self::Status(response.status_code),
            ErrorKind::CurlError(err) => Self::Unavailable(err.to_string()),
            ErrorKind::JsonParseError(err) => Self::Json(err),
        }
    }
}
