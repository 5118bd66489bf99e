use crate::errors::TransportError;
use crate::model::{CommandRequest, MoistureReading, PumpState};
use async_trait::async_trait;

/// Authoritative, latency-prone owner of moisture and pump state.
#[async_trait]
pub trait RemoteSource: Send + Sync + 'static {
    async fn latest_sensor(&self) -> Result<MoistureReading, TransportError>;

    async fn pump_status(&self) -> Result<PumpState, TransportError>;

    /// Sets the pump; the returned state is the remote's view after applying it.
    async fn send_pump_command(&self, command: CommandRequest)
        -> Result<PumpState, TransportError>;
}
