#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use dashboard::{CommandRequest, MoistureReading, PumpState, RemoteSource, TransportError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::oneshot;

/// `None` stands for a transport failure.
pub type Reply<T> = Option<T>;

/// One endpoint of the scripted source.
///
/// Calls are answered from `current` unless a gate was queued, in which case
/// the call parks until the test releases the gate.
pub struct Endpoint<T> {
    current: Mutex<Reply<T>>,
    gates: Mutex<VecDeque<oneshot::Receiver<Reply<T>>>>,
    calls: AtomicUsize,
}

impl<T: Clone> Endpoint<T> {
    fn new(current: Reply<T>) -> Self {
        Self {
            current: Mutex::new(current),
            gates: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, reply: Reply<T>) {
        *self.current.lock().unwrap() = reply;
    }

    /// Parks the next call until the returned sender is used.
    pub fn gate(&self) -> oneshot::Sender<Reply<T>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().push_back(rx);
        tx
    }

    fn current(&self) -> Reply<T> {
        self.current.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn answer(&self) -> Result<T, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().pop_front();
        let reply = if let Some(gate) = gate {
            gate.await.unwrap_or(None)
        } else {
            self.current()
        };
        reply.ok_or_else(|| TransportError::Unavailable("connection refused".to_string()))
    }
}

pub struct FakeSource {
    pub sensor: Endpoint<MoistureReading>,
    pub pump: Endpoint<PumpState>,
    pub command: Endpoint<PumpState>,
    pub sent: Mutex<Vec<CommandRequest>>,
    /// When set, commands echo the request like the remote controller does
    /// instead of answering from `command`.
    pub echo_commands: bool,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            sensor: Endpoint::new(Some(reading(50.0, 0))),
            pump: Endpoint::new(Some(pump(false, 0))),
            command: Endpoint::new(None),
            sent: Mutex::new(Vec::new()),
            echo_commands: true,
        }
    }

    pub fn scripted_commands() -> Self {
        Self {
            echo_commands: false,
            ..Self::new()
        }
    }

    pub fn sent(&self) -> Vec<CommandRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteSource for FakeSource {
    async fn latest_sensor(&self) -> Result<MoistureReading, TransportError> {
        self.sensor.answer().await
    }

    async fn pump_status(&self) -> Result<PumpState, TransportError> {
        self.pump.answer().await
    }

    async fn send_pump_command(
        &self,
        command: CommandRequest,
    ) -> Result<PumpState, TransportError> {
        self.sent.lock().unwrap().push(command);
        if self.echo_commands {
            self.command.calls.fetch_add(1, Ordering::SeqCst);
            return Ok(pump(
                command.desired_status,
                command.explicit_override().unwrap_or(-1),
            ));
        }
        self.command.answer().await
    }
}

/// Yields until `endpoint` has been called at least `calls` times.
pub async fn wait_for_calls<T: Clone>(endpoint: &Endpoint<T>, calls: usize) {
    while endpoint.calls() < calls {
        tokio::task::yield_now().await;
    }
}

pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_765_881_000 + seconds, 0).unwrap()
}

pub fn reading(value: f64, seconds: i64) -> MoistureReading {
    MoistureReading {
        value,
        observed_at: at(seconds),
    }
}

pub fn pump(is_on: bool, override_remaining: i64) -> PumpState {
    PumpState {
        is_on,
        override_remaining,
    }
}
