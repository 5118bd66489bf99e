use crate::cell::{Sequenced, Sequencer, Ticket, TicketedCell};
use crate::errors::{Error, Result};
use crate::health::{CommandStatus, CommandTracker, HealthState, HealthTracker, LoopHealth};
use crate::metrics::{
    COMMANDS_TOTAL, COMMAND_FAILURES_TOTAL, COMMAND_LATENCY_SECONDS, PUMP_ON, PUMP_POLLS_TOTAL,
    PUMP_POLL_FAILURES_TOTAL, STALE_RESPONSES_TOTAL,
};
use crate::model::{CommandRequest, PumpState};
use crate::schedule::run_periodic;
use crate::source::RemoteSource;
use crate::validate::validate_override_seconds;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Keeps pump status and override countdown in sync with the remote source
/// and dispatches operator commands.
///
/// Polls and command responses share one ticket sequence. A poll takes its
/// ticket when it is issued, a command when its response arrives, so a
/// command result supersedes every poll that was issued before it landed.
pub struct PumpSynchronizer {
    source: Arc<dyn RemoteSource>,
    tickets: Sequencer,
    state: TicketedCell<PumpState>,
    health: HealthTracker,
    command: CommandTracker,
    command_lock: Mutex<()>,
}

impl PumpSynchronizer {
    pub fn new(source: Arc<dyn RemoteSource>) -> Self {
        Self {
            source,
            tickets: Sequencer::new(),
            state: TicketedCell::new(),
            health: HealthTracker::new(),
            command: CommandTracker::new(),
            command_lock: Mutex::new(()),
        }
    }

    /// One fetch attempt. Returns true if its response became the held state.
    pub async fn poll_once(&self) -> bool {
        let ticket = self.tickets.next();
        self.health.begin();
        PUMP_POLLS_TOTAL.inc();

        match self.source.pump_status().await {
            Ok(state) => {
                self.health.settle(ticket, None);
                self.apply(ticket, state, "poll")
            }
            Err(e) => {
                PUMP_POLL_FAILURES_TOTAL.inc();
                warn!("Pump fetch failed: {}", e);
                self.health.settle(ticket, Some(Error::PumpFetch(e.to_string())));
                false
            }
        }
    }

    pub async fn run(self: Arc<Self>, period: Duration, shutdown: watch::Receiver<bool>) {
        run_periodic("pump", period, shutdown, || {
            let synchronizer = self.clone();
            async move {
                synchronizer.poll_once().await;
            }
        })
        .await;
    }

    /// Flips the pump relative to the last known state, letting the remote
    /// source pick its default override policy.
    pub async fn toggle(&self) -> Result<PumpState> {
        let current = self.state.get().unwrap_or_default();
        self.dispatch(CommandRequest::new(!current.is_on, None)).await
    }

    /// Forces the pump for `override_seconds` (1..=3600) before automatic
    /// control resumes. Invalid durations are rejected without a request.
    pub async fn set_override(
        &self,
        desired_status: bool,
        override_seconds: i64,
    ) -> Result<PumpState> {
        let seconds = validate_override_seconds(override_seconds)?;
        self.dispatch(CommandRequest::new(desired_status, Some(i64::from(seconds))))
            .await
    }

    async fn dispatch(&self, request: CommandRequest) -> Result<PumpState> {
        if self.state.is_closed() {
            return Err(Error::Stopped);
        }

        let _guard = self.command_lock.try_lock().map_err(|_| {
            COMMAND_FAILURES_TOTAL.inc();
            debug!("Rejected pump command {:?}: another one is in flight", request);
            Error::CommandInProgress
        })?;

        info!(
            "Sending pump command: status={} override={:?}",
            request.desired_status,
            request.explicit_override()
        );
        self.command.begin();
        COMMANDS_TOTAL.inc();
        let start = Instant::now();

        match self.source.send_pump_command(request).await {
            Ok(state) => {
                COMMAND_LATENCY_SECONDS.observe(start.elapsed().as_secs_f64());
                let ticket = self.tickets.next();
                self.apply(ticket, state, "command");
                self.command.finish(None);
                if self.state.is_closed() {
                    return Err(Error::Stopped);
                }
                Ok(state)
            }
            Err(e) => {
                COMMAND_FAILURES_TOTAL.inc();
                warn!("Pump command failed: {}", e);
                let err = Error::PumpCommand(e.to_string());
                self.command.finish(Some(err.clone()));
                Err(err)
            }
        }
    }

    fn apply(&self, ticket: Ticket, state: PumpState, origin: &str) -> bool {
        if self.state.apply(ticket, state) {
            PUMP_ON.set(if state.is_on { 1.0 } else { 0.0 });
            debug!(
                "Applied pump state from {}: on={} override_remaining={} (ticket {})",
                origin,
                state.is_on,
                state.override_remaining,
                ticket.value()
            );
            true
        } else {
            if !self.state.is_closed() {
                STALE_RESPONSES_TOTAL.inc();
            }
            debug!("Discarded stale pump state from {} (ticket {})", origin, ticket.value());
            false
        }
    }

    pub fn state(&self) -> Option<PumpState> {
        self.state.get()
    }

    pub fn health(&self) -> LoopHealth {
        self.health.snapshot()
    }

    pub fn command_status(&self) -> CommandStatus {
        self.command.snapshot()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<Sequenced<PumpState>> {
        self.state.subscribe()
    }

    pub fn subscribe_health(&self) -> watch::Receiver<HealthState> {
        self.health.subscribe()
    }

    pub fn subscribe_command(&self) -> watch::Receiver<CommandStatus> {
        self.command.subscribe()
    }

    /// Stops accepting results; commands issued afterwards fail with
    /// [`Error::Stopped`].
    pub fn close(&self) {
        self.state.close();
        self.health.close();
    }
}
