//! Client-side synchronization core of the irrigation dashboard.
//!
//! Two independently paced polling loops ([`SensorPoller`] every 2 s,
//! [`PumpSynchronizer`] every 1 s) keep local state consistent with a
//! [`RemoteSource`]; [`Dashboard`] owns both loops for one session and
//! aggregates their output into a [`DashboardSnapshot`].

pub mod cell;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod health;
pub mod http;
pub mod metrics;
pub mod model;
pub mod pump;
pub mod rest;
pub mod schedule;
pub mod sensor;
pub mod source;
pub mod validate;

pub use config::{Config, PollConfig};
pub use dashboard::{aggregate, Dashboard, DashboardHandle, DashboardSnapshot};
pub use errors::{Error, TransportError};
pub use health::{CommandStatus, LoopHealth};
pub use model::{CommandRequest, MoistureLevel, MoistureReading, OverrideMode, PumpState};
pub use pump::PumpSynchronizer;
pub use sensor::SensorPoller;
pub use source::RemoteSource;
