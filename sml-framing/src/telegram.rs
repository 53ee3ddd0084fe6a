//! Telegram structure and frame wire constants

use bytes::Bytes;
use std::fmt;

/// Frame start marker: four escape bytes followed by four version bytes
pub const START_MARKER: [u8; 8] = [0x1B, 0x1B, 0x1B, 0x1B, 0x01, 0x01, 0x01, 0x01];

/// Frame stop marker: four escape bytes followed by the terminator
pub const STOP_MARKER: [u8; 5] = [0x1B, 0x1B, 0x1B, 0x1B, 0x1A];

/// Bytes following the stop marker (fill byte + CRC16, not decoded here)
pub const TRAILER_LEN: usize = 3;

/// One complete framed meter message
///
/// Invariant: begins with [`START_MARKER`] and ends with [`STOP_MARKER`]
/// followed by [`TRAILER_LEN`] trailer bytes. Produced by the scanner,
/// consumed read-only by the decoder and discarded after one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Telegram {
    bytes: Bytes,
}

impl Telegram {
    pub(crate) fn new(bytes: Bytes) -> Self {
        Self { bytes }
    }

    /// The raw telegram bytes, markers and trailer included
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Hex dump for diagnostics
impl fmt::Display for Telegram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.bytes.iter() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Find the first occurrence of `needle` in `haystack`
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_subsequence() {
        assert_eq!(find(&[1, 2, 3, 4], &[3, 4]), Some(2));
        assert_eq!(find(&[1, 2, 3, 4], &[4, 5]), None);
        assert_eq!(find(&[1, 2], &[1, 2, 3]), None);
    }

    #[test]
    fn test_telegram_hex_display() {
        let telegram = Telegram::new(Bytes::from_static(&[0x1B, 0x01, 0xFF]));
        assert_eq!(format!("{}", telegram), "1b01ff");
    }
}
