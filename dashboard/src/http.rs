use crate::errors::TransportError;
use crate::model::{CommandRequest, MoistureReading, PumpState};
use crate::source::RemoteSource;
use async_trait::async_trait;
use chipp_http::{HttpClient, HttpMethod, NoInterceptor};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use tracing::{debug, trace};

#[derive(Debug, Deserialize)]
struct SensorBody {
    moisture: f64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    timestamp: DateTime<Utc>,
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// RFC 3339, or a local timestamp without offset which is taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp {:?}", raw)))
}

#[derive(Debug, Deserialize)]
struct PumpBody {
    pump_status: bool,
    override_remaining: i64,
}

#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    message: Option<String>,
    data: PumpBody,
}

#[derive(Debug, Serialize)]
struct CommandBody {
    pump_status: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    override_seconds: Option<i64>,
}

impl From<SensorBody> for MoistureReading {
    fn from(body: SensorBody) -> Self {
        Self {
            value: body.moisture,
            observed_at: body.timestamp,
        }
    }
}

impl From<PumpBody> for PumpState {
    fn from(body: PumpBody) -> Self {
        Self {
            is_on: body.pump_status,
            override_remaining: body.override_remaining,
        }
    }
}

impl From<CommandRequest> for CommandBody {
    fn from(command: CommandRequest) -> Self {
        Self {
            pump_status: command.desired_status,
            override_seconds: command.explicit_override(),
        }
    }
}

/// JSON-over-HTTP remote source (`/latest/`, `/pump/`).
pub struct HttpSource {
    client: HttpClient<NoInterceptor>,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = HttpClient::new(base_url.as_str())
            .map_err(|e| TransportError::UrlParse(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/", self.base_url, path)
    }
}

#[async_trait]
impl RemoteSource for HttpSource {
    async fn latest_sensor(&self) -> Result<MoistureReading, TransportError> {
        let request = self
            .client
            .new_request_with_url(self.endpoint("latest"))
            .map_err(|e| TransportError::UrlParse(e.to_string()))?;

        let body: SensorBody = self
            .client
            .perform_request(request, chipp_http::json::parse_json)
            .await?;

        Ok(body.into())
    }

    async fn pump_status(&self) -> Result<PumpState, TransportError> {
        let request = self
            .client
            .new_request_with_url(self.endpoint("pump"))
            .map_err(|e| TransportError::UrlParse(e.to_string()))?;

        let body: PumpBody = self
            .client
            .perform_request(request, chipp_http::json::parse_json)
            .await?;

        Ok(body.into())
    }

    async fn send_pump_command(
        &self,
        command: CommandRequest,
    ) -> Result<PumpState, TransportError> {
        let body = CommandBody::from(command);

        let mut request = self
            .client
            .new_request_with_url(self.endpoint("pump"))
            .map_err(|e| TransportError::UrlParse(e.to_string()))?;
        request.set_method(HttpMethod::Post);
        request.set_json_body(&body);

        trace!("pump command: {:?}", body);

        let response: CommandResponse = self
            .client
            .perform_request(request, chipp_http::json::parse_json)
            .await?;

        if let Some(message) = &response.message {
            debug!("remote source: {}", message);
        }

        Ok(response.data.into())
    }
}
