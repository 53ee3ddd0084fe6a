//! Daemon configuration
//!
//! Loaded from a YAML file; every field has a usable default so a
//! missing file yields a meter-only configuration without sinks.

use serde::Deserialize;
use sml_core::{SmlError, SmlResult};
use std::path::Path;

/// Shortest permitted polling cycle. Values below the floor fall back
/// to the default, matching the original logger's behavior.
pub const MIN_CYCLE_SECS: u64 = 2;
pub const DEFAULT_CYCLE_SECS: u64 = 60;

fn default_cycle_secs() -> u64 {
    DEFAULT_CYCLE_SECS
}

fn default_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_read_timeout_secs() -> u64 {
    3
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_mqtt_client_id() -> String {
    "sml-meterd".to_string()
}

/// Top-level daemon configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MeterConfig {
    /// Polling cycle in seconds
    #[serde(default = "default_cycle_secs")]
    pub cycle_secs: u64,
    /// Serial device path of the meter's IR head
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Serial read timeout; also bounds one frame scan
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    #[serde(default)]
    pub mysql: Option<MySqlConfig>,
    #[serde(default)]
    pub mqtt: Option<MqttConfig>,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            cycle_secs: default_cycle_secs(),
            port: default_port(),
            baud_rate: default_baud_rate(),
            read_timeout_secs: default_read_timeout_secs(),
            mysql: None,
            mqtt: None,
        }
    }
}

/// MySQL sink credentials; the sink is enabled only when every field
/// is non-empty
#[derive(Debug, Clone, Deserialize)]
pub struct MySqlConfig {
    pub hostname: String,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl MySqlConfig {
    pub fn is_complete(&self) -> bool {
        !self.hostname.is_empty()
            && !self.username.is_empty()
            && !self.password.is_empty()
            && !self.database.is_empty()
    }
}

/// MQTT sink settings
#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    pub hostname: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    #[serde(default = "default_mqtt_client_id")]
    pub client_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl MeterConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> SmlResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SmlError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let cfg: MeterConfig = serde_yaml::from_str(&text)
            .map_err(|e| SmlError::Config(format!("cannot parse {}: {}", path.display(), e)))?;
        Ok(cfg.normalized())
    }

    /// Load configuration, falling back to defaults when the file is
    /// missing or unreadable
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    /// Enforce the cycle floor and drop incomplete sink sections
    fn normalized(mut self) -> Self {
        if self.cycle_secs < MIN_CYCLE_SECS {
            log::warn!(
                "cycle_secs {} below floor {}, using default {}",
                self.cycle_secs,
                MIN_CYCLE_SECS,
                DEFAULT_CYCLE_SECS
            );
            self.cycle_secs = DEFAULT_CYCLE_SECS;
        }
        if let Some(mysql) = &self.mysql {
            if !mysql.is_complete() {
                log::warn!("mysql section incomplete, sink disabled");
                self.mysql = None;
            }
        }
        self
    }
}
