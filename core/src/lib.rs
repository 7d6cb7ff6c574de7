//! Platform-agnostic core logic for noisemeter firmware
//!
//! Reads a sound level sensor over I2C, publishes each reading to the
//! telemetry endpoint and keeps a timestamped event log. It has NO hardware
//! dependencies: boards hand in embedded-hal / embedded-io implementations
//! plus the collaborator traits from `hal-abstractions`.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod bus;
pub mod cloud;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod event_log;
pub mod heartbeat;
pub mod reading;
pub mod sensor;
pub mod storage;
pub mod telemetry;
pub mod time;

mod text;

#[cfg(test)]
mod testing;

pub use bus::RegisterBus;
pub use cloud::{CloudSession, Credential, PublishOutcome};
pub use config::Config;
pub use connectivity::{ConnectionState, ConnectivityManager, NetworkCredentials};
pub use error::{
    AuthError, BusError, ConfigError, ConnectivityError, LogError, PublishError, StartupError,
    StorageError,
};
pub use event_log::EventLog;
pub use heartbeat::Heartbeat;
pub use reading::Reading;
pub use sensor::{Identity, SensorDevice};
pub use storage::{CredentialBlock, Entry};
pub use telemetry::{CycleReport, Peripherals, TelemetryLoop};
pub use time::CivilDateTime;
