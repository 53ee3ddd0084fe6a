//! Reading sinks
//!
//! A sink consumes the worker's snapshot once per successful cycle.
//! Sink failures are logged by the worker and never retried; they must
//! not block or fail the polling cycle.

pub mod mqtt;
pub mod mysql;

use async_trait::async_trait;
use sml_core::{MeterSnapshot, SmlResult};

pub use mqtt::MqttSink;
pub use mysql::MySqlSink;

/// Consumer of meter snapshots
#[async_trait]
pub trait ReadingSink: Send + Sync {
    /// Sink name for log context
    fn name(&self) -> &str;

    /// Publish one snapshot
    async fn publish(&self, snapshot: &MeterSnapshot) -> SmlResult<()>;
}
