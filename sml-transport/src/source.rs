//! Byte-source trait for the transport layer

use async_trait::async_trait;
use sml_core::{SmlError, SmlResult};
use std::time::Duration;

/// Byte-source interface to access the physical stream from a meter
///
/// The framing layer only ever reads; there is no write path towards the
/// meter (the DWS7612 pushes telegrams unsolicited).
#[async_trait]
pub trait ByteSource: Send {
    /// Set the read timeout
    ///
    /// # Arguments
    ///
    /// * `timeout` - The timeout duration. None means infinite timeout.
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> SmlResult<()>;

    /// Read data from the stream
    ///
    /// # Returns
    ///
    /// Number of bytes read, or 0 if EOF
    async fn read(&mut self, buf: &mut [u8]) -> SmlResult<usize>;

    /// Read up to and including `delimiter`
    ///
    /// Returns whatever was read even if the delimiter never appeared
    /// within the source's timeout; the caller must check for it. Bytes
    /// are consumed one at a time so that nothing past the delimiter is
    /// taken from the stream.
    async fn read_until(&mut self, delimiter: &[u8]) -> SmlResult<Vec<u8>> {
        let mut collected = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.read(&mut byte).await {
                Ok(0) => break,
                Ok(_) => {
                    collected.push(byte[0]);
                    if collected.ends_with(delimiter) {
                        break;
                    }
                }
                Err(SmlError::Timeout) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(collected)
    }

    /// Read exact number of bytes from the stream
    ///
    /// # Arguments
    ///
    /// * `buf` - Buffer to read into, will be filled completely
    ///
    /// # Returns
    ///
    /// Returns error if unable to read the exact number of bytes
    async fn read_exact(&mut self, mut buf: &mut [u8]) -> SmlResult<()> {
        while !buf.is_empty() {
            let n = self.read(buf).await?;
            if n == 0 {
                return Err(SmlError::Connection(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "Failed to read exact number of bytes",
                )));
            }
            buf = &mut buf[n..];
        }
        Ok(())
    }

    /// Check if the stream is closed
    fn is_closed(&self) -> bool;

    /// Close the stream
    async fn close(&mut self) -> SmlResult<()>;
}
