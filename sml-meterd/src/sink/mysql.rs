//! MySQL sink
//!
//! Writes each snapshot as two rows into the volkszaehler-style `data`
//! table: `(entity_id, time, value)` with a millisecond timestamp.

use crate::config::MySqlConfig;
use crate::sink::ReadingSink;
use async_trait::async_trait;
use sml_core::{MeterSnapshot, SmlError, SmlResult};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};

/// Entity id of the positive active energy series
pub const POSITIVE_ENTITY_ID: u32 = 2;
/// Entity id of the negative active energy series
pub const NEGATIVE_ENTITY_ID: u32 = 3;

const INSERT_SQL: &str = "INSERT INTO `data` (`entity_id`, `time`, `value`) VALUES (?, ?, ?)";

pub struct MySqlSink {
    pool: MySqlPool,
}

impl MySqlSink {
    /// Connect to the configured database
    pub async fn connect(config: &MySqlConfig) -> SmlResult<Self> {
        let url = format!(
            "mysql://{}:{}@{}/{}",
            config.username, config.password, config.hostname, config.database
        );
        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .map_err(|e| SmlError::Sink(format!("MySQL connect failed: {}", e)))?;

        log::info!("Connected to MySQL at {}", config.hostname);
        Ok(Self { pool })
    }
}

#[async_trait]
impl ReadingSink for MySqlSink {
    fn name(&self) -> &str {
        "mysql"
    }

    async fn publish(&self, snapshot: &MeterSnapshot) -> SmlResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| SmlError::Sink(e.to_string()))?;

        sqlx::query(INSERT_SQL)
            .bind(POSITIVE_ENTITY_ID)
            .bind(snapshot.taken_at_ms)
            .bind(snapshot.positive.kwh())
            .execute(&mut *tx)
            .await
            .map_err(|e| SmlError::Sink(e.to_string()))?;

        sqlx::query(INSERT_SQL)
            .bind(NEGATIVE_ENTITY_ID)
            .bind(snapshot.taken_at_ms)
            .bind(snapshot.negative.kwh())
            .execute(&mut *tx)
            .await
            .map_err(|e| SmlError::Sink(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| SmlError::Sink(e.to_string()))?;
        Ok(())
    }
}
