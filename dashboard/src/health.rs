use crate::cell::Ticket;
use crate::errors::Error;
use serde::Serialize;
use tokio::sync::watch;

/// Transport health of one polling loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoopHealth {
    pub is_fetching: bool,
    pub last_error: Option<Error>,
}

#[derive(Debug, Default)]
pub struct HealthState {
    in_flight: usize,
    settled: u64,
    closed: bool,
    health: LoopHealth,
}

impl HealthState {
    pub fn health(&self) -> &LoopHealth {
        &self.health
    }
}

/// Tracks attempts of one loop.
///
/// `last_error` is cleared when an attempt begins and only the outcome of an
/// attempt newer than the last settled one may replace it.
#[derive(Debug)]
pub struct HealthTracker {
    tx: watch::Sender<HealthState>,
}

impl HealthTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(HealthState::default());
        Self { tx }
    }

    pub fn begin(&self) {
        self.tx.send_if_modified(|state| {
            if state.closed {
                return false;
            }
            state.in_flight += 1;
            state.health.is_fetching = true;
            state.health.last_error = None;
            true
        });
    }

    pub fn settle(&self, ticket: Ticket, outcome: Option<Error>) {
        let mut outcome = Some(outcome);
        self.tx.send_if_modified(|state| {
            if state.closed {
                return false;
            }
            state.in_flight = state.in_flight.saturating_sub(1);
            state.health.is_fetching = state.in_flight > 0;
            if ticket.value() > state.settled {
                state.settled = ticket.value();
                state.health.last_error = outcome.take().flatten();
            }
            true
        });
    }

    pub fn close(&self) {
        self.tx.send_if_modified(|state| {
            state.closed = true;
            false
        });
    }

    pub fn snapshot(&self) -> LoopHealth {
        self.tx.borrow().health.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<HealthState> {
        self.tx.subscribe()
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// State of the operator command path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandStatus {
    pub in_flight: bool,
    pub last_error: Option<Error>,
}

#[derive(Debug)]
pub struct CommandTracker {
    tx: watch::Sender<CommandStatus>,
}

impl CommandTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(CommandStatus::default());
        Self { tx }
    }

    pub fn begin(&self) {
        self.tx.send_replace(CommandStatus {
            in_flight: true,
            last_error: None,
        });
    }

    pub fn finish(&self, outcome: Option<Error>) {
        self.tx.send_replace(CommandStatus {
            in_flight: false,
            last_error: outcome,
        });
    }

    pub fn snapshot(&self) -> CommandStatus {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CommandStatus> {
        self.tx.subscribe()
    }
}

impl Default for CommandTracker {
    fn default() -> Self {
        Self::new()
    }
}
