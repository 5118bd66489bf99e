use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use tracing::error;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref SENSOR_POLLS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_sensor_polls_total",
        "Total sensor fetch attempts"
    ))
    .unwrap();
    pub static ref SENSOR_POLL_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_sensor_poll_failures_total",
        "Total failed sensor fetches"
    ))
    .unwrap();
    pub static ref PUMP_POLLS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_pump_polls_total",
        "Total pump status fetch attempts"
    ))
    .unwrap();
    pub static ref PUMP_POLL_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_pump_poll_failures_total",
        "Total failed pump status fetches"
    ))
    .unwrap();
    pub static ref STALE_RESPONSES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_stale_responses_total",
        "Responses discarded because a newer one was already applied"
    ))
    .unwrap();
    pub static ref COMMANDS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_pump_commands_total",
        "Total pump commands dispatched"
    ))
    .unwrap();
    pub static ref COMMAND_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_pump_command_failures_total",
        "Total pump commands rejected or failed"
    ))
    .unwrap();
    pub static ref COMMAND_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "dashboard_pump_command_latency_seconds",
            "Round trip time of pump commands"
        )
        .buckets(vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0])
    )
    .unwrap();
    pub static ref MOISTURE_PERCENT: Gauge = Gauge::with_opts(Opts::new(
        "dashboard_moisture_percent",
        "Latest applied soil moisture reading"
    ))
    .unwrap();
    pub static ref PUMP_ON: Gauge = Gauge::with_opts(Opts::new(
        "dashboard_pump_on",
        "Latest applied pump status (1 on, 0 off)"
    ))
    .unwrap();
}

pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(SENSOR_POLLS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SENSOR_POLL_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PUMP_POLLS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PUMP_POLL_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STALE_RESPONSES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(COMMANDS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(COMMAND_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(COMMAND_LATENCY_SECONDS.clone()))?;
    REGISTRY.register(Box::new(MOISTURE_PERCENT.clone()))?;
    REGISTRY.register(Box::new(PUMP_ON.clone()))?;
    Ok(())
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
