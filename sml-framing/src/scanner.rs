//! Frame scanner: extracts one validated telegram from a byte stream

use crate::telegram::{find, Telegram, START_MARKER, STOP_MARKER, TRAILER_LEN};
use bytes::{Bytes, BytesMut};
use sml_core::{SmlError, SmlResult};
use sml_transport::ByteSource;

/// Default cap on the scan buffer within one `scan` call.
///
/// The original resync logic bounds buffer growth only by the source's
/// read timeout; a stream that keeps producing misaligned markers can
/// grow the buffer without limit. The cap turns that pathological case
/// into a failed scan that the worker retries on a fresh connection.
pub const DEFAULT_MAX_BUFFER: usize = 1 << 20;

/// Extracts complete telegrams from a raw byte stream
///
/// Handles resynchronization when markers arrive in an invalid relative
/// order: a stop marker belonging to a previous, incomplete frame is
/// skipped by reading on (nothing is discarded) until a start marker
/// followed by a stop marker is seen.
#[derive(Debug, Clone)]
pub struct FrameScanner {
    max_buffer: usize,
}

impl Default for FrameScanner {
    fn default() -> Self {
        Self {
            max_buffer: DEFAULT_MAX_BUFFER,
        }
    }
}

impl FrameScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scanner with an explicit scan-buffer cap (tests use a
    /// small cap to exercise the overflow path)
    pub fn with_max_buffer(max_buffer: usize) -> Self {
        Self { max_buffer }
    }

    /// Read from `source` until one complete telegram has been framed
    ///
    /// # Errors
    ///
    /// * [`SmlError::NoStopMarker`] - the source timed out or hit EOF
    ///   before a stop marker appeared; the only terminal framing failure
    /// * [`SmlError::ScanOverflow`] - the resync buffer exceeded the cap
    /// * Transport errors from the source are passed through
    pub async fn scan<S: ByteSource>(&self, source: &mut S) -> SmlResult<Telegram> {
        let mut buf = BytesMut::new();

        loop {
            if buf.len() > self.max_buffer {
                return Err(SmlError::ScanOverflow {
                    limit: self.max_buffer,
                });
            }

            // Read up to and including the next stop marker. Everything
            // read so far stays in the buffer: the start marker may only
            // arrive after the stop marker of a previous partial frame.
            let chunk = source.read_until(&STOP_MARKER).await?;
            let found_stop = chunk.ends_with(&STOP_MARKER);
            buf.extend_from_slice(&chunk);

            if !found_stop {
                return Err(SmlError::NoStopMarker {
                    bytes_scanned: buf.len(),
                });
            }
            let stop_idx = buf.len() - STOP_MARKER.len();

            // Fill byte and CRC16 follow the stop marker.
            let mut trailer = [0u8; TRAILER_LEN];
            source.read_exact(&mut trailer).await?;
            buf.extend_from_slice(&trailer);

            let Some(start_idx) = find(&buf, &START_MARKER) else {
                continue;
            };

            if stop_idx >= start_idx {
                log::trace!(
                    "Framed telegram: start at {}, stop at {}, {} bytes buffered",
                    start_idx,
                    stop_idx,
                    buf.len()
                );
                let end = stop_idx + STOP_MARKER.len() + TRAILER_LEN;
                return Ok(Telegram::new(Bytes::copy_from_slice(&buf[start_idx..end])));
            }
            // Stop marker precedes the start marker: the frame it closes
            // was never seen from the beginning. Keep reading.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sml_transport::MockSource;

    fn framed(payload: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&START_MARKER);
        data.extend_from_slice(payload);
        data.extend_from_slice(&STOP_MARKER);
        data.extend_from_slice(&[0x01, 0xAB, 0xCD]); // fill + crc
        data
    }

    #[tokio::test]
    async fn test_scan_returns_exact_frame_span() {
        let frame = framed(&[0x10, 0x20, 0x30]);
        let mut stream = vec![0xDE, 0xAD]; // leading noise
        stream.extend_from_slice(&frame);
        stream.extend_from_slice(&[0xBE, 0xEF]); // trailing bytes, not consumed

        let mut source = MockSource::new(stream);
        let telegram = FrameScanner::new().scan(&mut source).await.unwrap();

        assert_eq!(telegram.as_bytes(), &frame[..]);
        assert_eq!(source.remaining(), 2);
    }

    #[tokio::test]
    async fn test_scan_resyncs_past_orphan_stop_marker() {
        // Tail of a previous, incomplete frame: stop marker + trailer
        // with no start marker before it.
        let mut stream = Vec::new();
        stream.extend_from_slice(&[0x42, 0x43]);
        stream.extend_from_slice(&STOP_MARKER);
        stream.extend_from_slice(&[0x00, 0x11, 0x22]);
        let frame = framed(&[0x99]);
        stream.extend_from_slice(&frame);

        let mut source = MockSource::new(stream);
        let telegram = FrameScanner::new().scan(&mut source).await.unwrap();

        assert_eq!(telegram.as_bytes(), &frame[..]);
    }

    #[tokio::test]
    async fn test_scan_fails_without_stop_marker() {
        let mut source = MockSource::new(vec![0x01, 0x02, 0x03, 0x1B, 0x1B]);
        let result = FrameScanner::new().scan(&mut source).await;
        assert!(matches!(
            result,
            Err(SmlError::NoStopMarker { bytes_scanned: 5 })
        ));
    }

    #[tokio::test]
    async fn test_scan_fails_on_empty_source() {
        let mut source = MockSource::new(vec![]);
        let result = FrameScanner::new().scan(&mut source).await;
        assert!(matches!(result, Err(SmlError::NoStopMarker { .. })));
    }

    #[tokio::test]
    async fn test_scan_aborts_when_buffer_cap_exceeded() {
        // Endless orphan stop markers, never a start marker.
        let mut stream = Vec::new();
        for _ in 0..8 {
            stream.extend_from_slice(&STOP_MARKER);
            stream.extend_from_slice(&[0x00, 0x00, 0x00]);
        }

        let mut source = MockSource::new(stream);
        let scanner = FrameScanner::with_max_buffer(16);
        let result = scanner.scan(&mut source).await;
        assert!(matches!(result, Err(SmlError::ScanOverflow { limit: 16 })));
    }

    #[tokio::test]
    async fn test_scan_propagates_transport_errors() {
        let mut source = MockSource::failing_at_eof(vec![0x01]);
        let result = FrameScanner::new().scan(&mut source).await;
        assert!(matches!(result, Err(SmlError::Connection(_))));
    }
}
