//! Serial port byte-source implementation

use crate::source::ByteSource;
use async_trait::async_trait;
use sml_core::{SmlError, SmlResult};
use std::fmt;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio_serial::SerialStream;

/// Serial port settings for the meter link
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: tokio_serial::DataBits,
    pub stop_bits: tokio_serial::StopBits,
    pub parity: tokio_serial::Parity,
    pub flow_control: tokio_serial::FlowControl,
    pub timeout: Option<Duration>,
}

impl SerialSettings {
    /// Create new serial settings with the meter's default parameters
    /// (8N1, 3 second read timeout)
    pub fn new(port_name: String, baud_rate: u32) -> Self {
        Self {
            port_name,
            baud_rate,
            data_bits: tokio_serial::DataBits::Eight,
            stop_bits: tokio_serial::StopBits::One,
            parity: tokio_serial::Parity::None,
            flow_control: tokio_serial::FlowControl::None,
            timeout: Some(Duration::from_secs(3)),
        }
    }

    /// Create serial settings with an explicit read timeout
    pub fn with_timeout(port_name: String, baud_rate: u32, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::new(port_name, baud_rate)
        }
    }
}

/// Serial port byte source
///
/// Opened fresh for every polling cycle and closed afterwards, so a
/// wedged port recovers on the next cycle.
pub struct SerialSource {
    stream: Option<SerialStream>,
    settings: SerialSettings,
    closed: bool,
}

impl fmt::Debug for SerialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialSource")
            .field("port_name", &self.settings.port_name)
            .field("closed", &self.closed)
            .finish()
    }
}

impl SerialSource {
    /// Create a new, unopened serial source
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            stream: None,
            settings,
            closed: true,
        }
    }

    /// Open the serial port
    pub async fn open(&mut self) -> SmlResult<()> {
        if !self.closed {
            return Err(SmlError::Connection(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Connection has already been opened",
            )));
        }

        let builder = tokio_serial::new(&self.settings.port_name, self.settings.baud_rate)
            .data_bits(self.settings.data_bits)
            .stop_bits(self.settings.stop_bits)
            .parity(self.settings.parity)
            .flow_control(self.settings.flow_control);

        let stream = SerialStream::open(&builder).map_err(|e| {
            SmlError::Connection(std::io::Error::other(format!(
                "Failed to open serial port {}: {}",
                self.settings.port_name, e
            )))
        })?;

        log::debug!("Opened serial port {}", self.settings.port_name);
        self.stream = Some(stream);
        self.closed = false;
        Ok(())
    }
}

#[async_trait]
impl ByteSource for SerialSource {
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> SmlResult<()> {
        self.settings.timeout = timeout;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> SmlResult<usize> {
        let stream = self.stream.as_mut().ok_or_else(|| {
            SmlError::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Serial stream not connected",
            ))
        })?;

        let result = if let Some(timeout) = self.settings.timeout {
            tokio::time::timeout(timeout, stream.read(buf))
                .await
                .map_err(|_| SmlError::Timeout)?
                .map_err(SmlError::Connection)
        } else {
            stream.read(buf).await.map_err(SmlError::Connection)
        };

        match result {
            Ok(0) => {
                self.closed = true;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                self.closed = true;
                Err(e)
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> SmlResult<()> {
        self.stream = None;
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_settings_defaults() {
        let settings = SerialSettings::new("/dev/ttyUSB0".to_string(), 9600);
        assert_eq!(settings.port_name, "/dev/ttyUSB0");
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_serial_settings_with_timeout() {
        let settings =
            SerialSettings::with_timeout("/dev/ttyUSB1".to_string(), 9600, Duration::from_secs(5));
        assert_eq!(settings.timeout, Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_read_before_open_fails() {
        let mut source = SerialSource::new(SerialSettings::new("/dev/null".to_string(), 9600));
        let mut buf = [0u8; 4];
        assert!(source.read(&mut buf).await.is_err());
    }
}
