//! MQTT sink
//!
//! Publishes each reading's decimal string to a fixed topic, one topic
//! per direction, QoS 0 fire-and-forget.

use crate::config::MqttConfig;
use crate::sink::ReadingSink;
use async_trait::async_trait;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use sml_core::{MeterSnapshot, SmlError, SmlResult};
use std::time::Duration;

/// Topic for the positive active energy reading
pub const POSITIVE_TOPIC: &str = "meter/energy/positive";
/// Topic for the negative active energy reading
pub const NEGATIVE_TOPIC: &str = "meter/energy/negative";

pub struct MqttSink {
    client: AsyncClient,
    broker: String,
}

impl MqttSink {
    /// Create the client and start its event loop task
    pub fn connect(config: &MqttConfig) -> Self {
        let mut options = MqttOptions::new(&config.client_id, &config.hostname, config.port);
        options.set_keep_alive(Duration::from_secs(30));
        options.set_clean_session(true);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, mut event_loop) = AsyncClient::new(options, 10);

        // The event loop must be polled for the client to make progress;
        // connection errors surface here and on the next publish.
        let broker = config.hostname.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = event_loop.poll().await {
                    log::error!("MQTT connection error ({}): {}", broker, e);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        });

        log::info!("MQTT sink targeting {}:{}", config.hostname, config.port);
        Self {
            client,
            broker: config.hostname.clone(),
        }
    }
}

#[async_trait]
impl ReadingSink for MqttSink {
    fn name(&self) -> &str {
        "mqtt"
    }

    async fn publish(&self, snapshot: &MeterSnapshot) -> SmlResult<()> {
        self.client
            .publish(
                POSITIVE_TOPIC,
                QoS::AtMostOnce,
                false,
                snapshot.positive.to_string(),
            )
            .await
            .map_err(|e| SmlError::Sink(format!("{}: {}", self.broker, e)))?;

        self.client
            .publish(
                NEGATIVE_TOPIC,
                QoS::AtMostOnce,
                false,
                snapshot.negative.to_string(),
            )
            .await
            .map_err(|e| SmlError::Sink(format!("{}: {}", self.broker, e)))?;

        Ok(())
    }
}
