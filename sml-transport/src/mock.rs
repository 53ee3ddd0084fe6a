//! Scripted byte source for tests
//!
//! Feeds a fixed byte script to the framing layer; once the script is
//! exhausted the source reports EOF, which `read_until` treats the same
//! way as a serial read timeout.

use crate::source::ByteSource;
use async_trait::async_trait;
use sml_core::{SmlError, SmlResult};
use std::collections::VecDeque;
use std::time::Duration;

/// In-memory byte source driven by a prepared script
#[derive(Debug, Default)]
pub struct MockSource {
    data: VecDeque<u8>,
    closed: bool,
    /// When set, every read past the end of the script fails with a
    /// connection error instead of reporting EOF.
    fail_at_eof: bool,
}

impl MockSource {
    /// Create a mock source that replays `data` and then reports EOF
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into().into(),
            closed: false,
            fail_at_eof: false,
        }
    }

    /// Create a mock source that replays `data` and then errors
    pub fn failing_at_eof(data: impl Into<Vec<u8>>) -> Self {
        Self {
            fail_at_eof: true,
            ..Self::new(data)
        }
    }

    /// Bytes not yet consumed by the reader
    pub fn remaining(&self) -> usize {
        self.data.len()
    }
}

#[async_trait]
impl ByteSource for MockSource {
    async fn set_timeout(&mut self, _timeout: Option<Duration>) -> SmlResult<()> {
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> SmlResult<usize> {
        if self.data.is_empty() {
            if self.fail_at_eof {
                return Err(SmlError::Connection(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "mock source exhausted",
                )));
            }
            return Ok(0);
        }

        let mut n = 0;
        while n < buf.len() {
            match self.data.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> SmlResult<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_until_stops_at_delimiter() {
        let mut source = MockSource::new(vec![1, 2, 3, 0xAA, 0xBB, 9, 9]);
        let data = source.read_until(&[0xAA, 0xBB]).await.unwrap();
        assert_eq!(data, vec![1, 2, 3, 0xAA, 0xBB]);
        assert_eq!(source.remaining(), 2);
    }

    #[tokio::test]
    async fn test_read_until_returns_partial_data_at_eof() {
        let mut source = MockSource::new(vec![1, 2, 3]);
        let data = source.read_until(&[0xAA, 0xBB]).await.unwrap();
        assert_eq!(data, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_read_exact() {
        let mut source = MockSource::new(vec![1, 2, 3, 4]);
        let mut buf = [0u8; 3];
        source.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [1, 2, 3]);

        let mut too_much = [0u8; 2];
        assert!(source.read_exact(&mut too_much).await.is_err());
    }

    #[tokio::test]
    async fn test_failing_source_propagates_error() {
        let mut source = MockSource::failing_at_eof(vec![]);
        let mut buf = [0u8; 1];
        assert!(matches!(
            source.read(&mut buf).await,
            Err(SmlError::Connection(_))
        ));
    }
}
