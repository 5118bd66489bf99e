use std::env;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_SENSOR_POLL_MS: u64 = 2000;
pub const DEFAULT_PUMP_POLL_MS: u64 = 1000;
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";

/// Cadence of the two polling loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub sensor_period: Duration,
    pub pump_period: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            sensor_period: Duration::from_millis(DEFAULT_SENSOR_POLL_MS),
            pump_period: Duration::from_millis(DEFAULT_PUMP_POLL_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub http_addr: String,
    pub poll: PollConfig,
}

impl Config {
    /// Reads `API_BASE_URL`, `HTTP_ADDR`, `SENSOR_POLL_MS` and `PUMP_POLL_MS`,
    /// falling back to the defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_base_url =
            lookup("API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let http_addr = lookup("HTTP_ADDR").unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());
        let sensor_poll_ms: u64 = lookup("SENSOR_POLL_MS")
            .and_then(|v| v.parse().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_SENSOR_POLL_MS);
        let pump_poll_ms: u64 = lookup("PUMP_POLL_MS")
            .and_then(|v| v.parse().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_PUMP_POLL_MS);

        Self {
            api_base_url,
            http_addr,
            poll: PollConfig {
                sensor_period: Duration::from_millis(sensor_poll_ms),
                pump_period: Duration::from_millis(pump_poll_ms),
            },
        }
    }
}
