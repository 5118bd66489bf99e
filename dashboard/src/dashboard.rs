use crate::config::PollConfig;
use crate::errors::Result;
use crate::health::{CommandStatus, LoopHealth};
use crate::model::{MoistureLevel, MoistureReading, OverrideMode, PumpState};
use crate::pump::PumpSynchronizer;
use crate::sensor::SensorPoller;
use crate::source::RemoteSource;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

/// Read-only view model handed to presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub moisture: Option<MoistureReading>,
    pub moisture_level: Option<MoistureLevel>,
    pub pump: Option<PumpState>,
    pub override_mode: Option<OverrideMode>,
    pub sensor_health: LoopHealth,
    pub pump_health: LoopHealth,
    pub command: CommandStatus,
    pub connected: bool,
}

impl DashboardSnapshot {
    /// One-line status, e.g. `moisture 41.0% (Moderate) | pump ON | 4m 59s | connected`.
    pub fn summary(&self) -> String {
        let moisture = match &self.moisture {
            Some(reading) => format!("moisture {:.1}% ({})", reading.value, reading.level()),
            None => "moisture --".to_string(),
        };
        let pump = match &self.pump {
            Some(state) if state.is_on => "pump ON",
            Some(_) => "pump OFF",
            None => "pump --",
        };
        let override_mode = self.override_mode.unwrap_or(OverrideMode::Automatic);
        let link = if self.connected { "connected" } else { "disconnected" };

        format!("{} | {} | {} | {}", moisture, pump, override_mode, link)
    }
}

/// Combines the latest inputs into a snapshot. Pure; performs no I/O.
pub fn aggregate(
    moisture: Option<MoistureReading>,
    pump: Option<PumpState>,
    sensor_health: LoopHealth,
    pump_health: LoopHealth,
    command: CommandStatus,
) -> DashboardSnapshot {
    let connected = sensor_health.last_error.is_none() && pump_health.last_error.is_none();

    DashboardSnapshot {
        moisture_level: moisture.as_ref().map(MoistureReading::level),
        override_mode: pump.as_ref().map(PumpState::override_mode),
        moisture,
        pump,
        sensor_health,
        pump_health,
        command,
        connected,
    }
}

fn capture(sensor: &SensorPoller, pump: &PumpSynchronizer) -> DashboardSnapshot {
    aggregate(
        sensor.reading(),
        pump.state(),
        sensor.health(),
        pump.health(),
        pump.command_status(),
    )
}

/// Cheap, clonable access to a running dashboard.
#[derive(Clone)]
pub struct DashboardHandle {
    sensor: Arc<SensorPoller>,
    pump: Arc<PumpSynchronizer>,
    snapshots: watch::Receiver<DashboardSnapshot>,
}

impl DashboardHandle {
    pub fn snapshot(&self) -> DashboardSnapshot {
        capture(&self.sensor, &self.pump)
    }

    /// Receiver that is notified with a fresh snapshot whenever any input
    /// changes.
    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshots.clone()
    }

    pub async fn toggle(&self) -> Result<PumpState> {
        self.pump.toggle().await
    }

    pub async fn set_override(
        &self,
        desired_status: bool,
        override_seconds: i64,
    ) -> Result<PumpState> {
        self.pump.set_override(desired_status, override_seconds).await
    }

    pub fn sensor(&self) -> &SensorPoller {
        &self.sensor
    }

    pub fn pump(&self) -> &PumpSynchronizer {
        &self.pump
    }
}

/// One dashboard session: owns both polling loops and the aggregator.
///
/// Must be started inside a tokio runtime. Dropping a running dashboard
/// signals shutdown but does not wait for the tasks; use [`stop`](Self::stop)
/// for an orderly teardown.
pub struct Dashboard {
    session_id: Uuid,
    handle: DashboardHandle,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Dashboard {
    pub fn start(source: Arc<dyn RemoteSource>, config: PollConfig) -> Self {
        let session_id = Uuid::new_v4();
        let span = info_span!("dashboard", session = %session_id);

        info!(
            parent: &span,
            "Starting dashboard session: sensor every {:?}, pump every {:?}",
            config.sensor_period, config.pump_period
        );

        let sensor = Arc::new(SensorPoller::new(source.clone()));
        let pump = Arc::new(PumpSynchronizer::new(source));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (snapshot_tx, snapshots) = watch::channel(capture(&sensor, &pump));

        let tasks = vec![
            tokio::spawn(
                sensor
                    .clone()
                    .run(config.sensor_period, shutdown_rx.clone())
                    .instrument(span.clone()),
            ),
            tokio::spawn(
                pump.clone()
                    .run(config.pump_period, shutdown_rx.clone())
                    .instrument(span.clone()),
            ),
            tokio::spawn(
                run_aggregator(sensor.clone(), pump.clone(), snapshot_tx, shutdown_rx)
                    .instrument(span),
            ),
        ];

        Self {
            session_id,
            handle: DashboardHandle {
                sensor,
                pump,
                snapshots,
            },
            shutdown,
            tasks,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn handle(&self) -> &DashboardHandle {
        &self.handle
    }

    /// Cancels both timers and the aggregator and waits for them to finish.
    ///
    /// A fetch or command still in flight is allowed to complete; its result
    /// is discarded.
    pub async fn stop(mut self) {
        info!(session = %self.session_id, "Stopping dashboard");
        self.signal_shutdown();

        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                error!("Dashboard task failed: {}", e);
            }
        }

        info!(session = %self.session_id, "Dashboard stopped");
    }

    fn signal_shutdown(&self) {
        self.handle.sensor.close();
        self.handle.pump.close();
        self.shutdown.send_replace(true);
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        if !self.tasks.is_empty() {
            self.signal_shutdown();
        }
    }
}

async fn run_aggregator(
    sensor: Arc<SensorPoller>,
    pump: Arc<PumpSynchronizer>,
    tx: watch::Sender<DashboardSnapshot>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut reading = sensor.subscribe_reading();
    let mut sensor_health = sensor.subscribe_health();
    let mut pump_state = pump.subscribe_state();
    let mut pump_health = pump.subscribe_health();
    let mut command = pump.subscribe_command();

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            Ok(()) = reading.changed() => {}
            Ok(()) = sensor_health.changed() => {}
            Ok(()) = pump_state.changed() => {}
            Ok(()) = pump_health.changed() => {}
            Ok(()) = command.changed() => {}
        }

        let snapshot = capture(&sensor, &pump);
        let published = tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });

        if published {
            debug!("{}", tx.borrow().summary());
        }
    }

    debug!("Aggregator stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use chrono::Utc;

    fn reading(value: f64) -> MoistureReading {
        MoistureReading {
            value,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_connected_when_no_loop_errors() {
        let snapshot = aggregate(
            Some(reading(42.5)),
            Some(PumpState {
                is_on: true,
                override_remaining: 300,
            }),
            LoopHealth::default(),
            LoopHealth::default(),
            CommandStatus::default(),
        );

        assert!(snapshot.connected);
        assert_eq!(snapshot.moisture_level, Some(MoistureLevel::Moderate));
        assert_eq!(snapshot.override_mode, Some(OverrideMode::Remaining(300)));
    }

    #[test]
    fn test_disconnected_on_any_loop_error() {
        let failing = LoopHealth {
            is_fetching: false,
            last_error: Some(Error::PumpFetch("refused".to_string())),
        };

        let snapshot = aggregate(
            None,
            None,
            LoopHealth::default(),
            failing,
            CommandStatus::default(),
        );
        assert!(!snapshot.connected);

        let snapshot = aggregate(
            None,
            None,
            LoopHealth {
                last_error: Some(Error::SensorFetch("refused".to_string())),
                ..Default::default()
            },
            LoopHealth::default(),
            CommandStatus::default(),
        );
        assert!(!snapshot.connected);
    }

    #[test]
    fn test_command_errors_do_not_affect_connected() {
        let snapshot = aggregate(
            None,
            None,
            LoopHealth::default(),
            LoopHealth::default(),
            CommandStatus {
                in_flight: false,
                last_error: Some(Error::PumpCommand("502".to_string())),
            },
        );
        assert!(snapshot.connected);
    }

    #[test]
    fn test_summary() {
        let snapshot = aggregate(
            Some(reading(41.0)),
            Some(PumpState {
                is_on: true,
                override_remaining: -1,
            }),
            LoopHealth::default(),
            LoopHealth::default(),
            CommandStatus::default(),
        );
        assert_eq!(
            snapshot.summary(),
            "moisture 41.0% (Moderate) | pump ON | Indefinite override | connected"
        );

        let empty = aggregate(
            None,
            None,
            LoopHealth::default(),
            LoopHealth::default(),
            CommandStatus::default(),
        );
        assert_eq!(empty.summary(), "moisture -- | pump -- | No override | connected");
    }
}
