use crate::cell::{Sequenced, Sequencer, TicketedCell};
use crate::errors::Error;
use crate::health::{HealthState, HealthTracker, LoopHealth};
use crate::metrics::{MOISTURE_PERCENT, SENSOR_POLLS_TOTAL, SENSOR_POLL_FAILURES_TOTAL, STALE_RESPONSES_TOTAL};
use crate::model::MoistureReading;
use crate::schedule::run_periodic;
use crate::source::RemoteSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Keeps the latest moisture reading in sync with the remote source.
pub struct SensorPoller {
    source: Arc<dyn RemoteSource>,
    tickets: Sequencer,
    reading: TicketedCell<MoistureReading>,
    health: HealthTracker,
}

impl SensorPoller {
    pub fn new(source: Arc<dyn RemoteSource>) -> Self {
        Self {
            source,
            tickets: Sequencer::new(),
            reading: TicketedCell::new(),
            health: HealthTracker::new(),
        }
    }

    /// One fetch attempt. Returns true if its response became the held
    /// reading.
    ///
    /// Failures keep the previous reading and are only reported through
    /// [`health`](Self::health).
    pub async fn poll_once(&self) -> bool {
        let ticket = self.tickets.next();
        self.health.begin();
        SENSOR_POLLS_TOTAL.inc();

        match self.source.latest_sensor().await {
            Ok(reading) => {
                self.health.settle(ticket, None);

                let value = reading.value;
                if self.reading.apply(ticket, reading) {
                    MOISTURE_PERCENT.set(value);
                    debug!("Applied moisture reading {:.1}% (ticket {})", value, ticket.value());
                    true
                } else {
                    if !self.reading.is_closed() {
                        STALE_RESPONSES_TOTAL.inc();
                    }
                    debug!("Discarded stale moisture reading (ticket {})", ticket.value());
                    false
                }
            }
            Err(e) => {
                SENSOR_POLL_FAILURES_TOTAL.inc();
                warn!("Sensor fetch failed: {}", e);
                self.health.settle(ticket, Some(Error::SensorFetch(e.to_string())));
                false
            }
        }
    }

    pub async fn run(self: Arc<Self>, period: Duration, shutdown: watch::Receiver<bool>) {
        run_periodic("sensor", period, shutdown, || {
            let poller = self.clone();
            async move {
                poller.poll_once().await;
            }
        })
        .await;
    }

    pub fn reading(&self) -> Option<MoistureReading> {
        self.reading.get()
    }

    pub fn health(&self) -> LoopHealth {
        self.health.snapshot()
    }

    pub fn subscribe_reading(&self) -> watch::Receiver<Sequenced<MoistureReading>> {
        self.reading.subscribe()
    }

    pub fn subscribe_health(&self) -> watch::Receiver<HealthState> {
        self.health.subscribe()
    }

    /// Stops accepting results; late responses are dropped silently.
    pub fn close(&self) {
        self.reading.close();
        self.health.close();
    }
}
