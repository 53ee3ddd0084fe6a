//! SML meter polling daemon
//!
//! Polls a DWS7612.2 electric power meter over its serial link on a
//! fixed cycle, frames and decodes the positive (1.8.0) and negative
//! (2.8.0) active energy registers, and republishes the readings to the
//! configured sinks (MySQL, MQTT).

pub mod config;
pub mod sink;
pub mod worker;

pub use config::{MeterConfig, MqttConfig, MySqlConfig};
pub use sink::ReadingSink;
pub use worker::{PollingWorker, SerialFactory, SourceFactory, WorkerHandle, WorkerState};
