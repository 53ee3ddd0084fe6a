//! Field decoder: locates a tracked OBIS entry and decodes its value

use crate::telegram::{find, Telegram};
use sml_core::{ObisId, Reading};

/// Tag high nibble marking a signed integer
const TAG_SIGNED: u8 = 0x50;
/// Tag high nibble marking an unsigned integer
const TAG_UNSIGNED: u8 = 0x60;
const TAG_TYPE_MASK: u8 = 0xF0;
/// Tag low nibble: total encoded size including the tag byte itself
const TAG_SIZE_MASK: u8 = 0x0F;

/// A tracked data point: its OBIS identifier plus the fixed distance
/// from the identifier's first byte to the value's tag byte.
///
/// The offsets are protocol knowledge for the DWS7612.2 telegram layout,
/// not discovered at runtime.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub obis: ObisId,
    pub value_offset: usize,
}

/// Positive active energy (1.8.0), value tag 20 bytes past the identifier
pub const POSITIVE_ENERGY_FIELD: FieldSpec = FieldSpec {
    obis: ObisId::POSITIVE_ACTIVE_ENERGY,
    value_offset: 20,
};

/// Negative active energy (2.8.0), value tag 17 bytes past the identifier
pub const NEGATIVE_ENERGY_FIELD: FieldSpec = FieldSpec {
    obis: ObisId::NEGATIVE_ACTIVE_ENERGY,
    value_offset: 17,
};

/// Decodes the tracked energy fields out of a complete telegram
pub struct FieldDecoder;

impl FieldDecoder {
    /// Decode one tracked field into a scaled reading
    ///
    /// A telegram without the identifier, or with a truncated or
    /// unrecognized value encoding, yields `Reading::ZERO`. That is the
    /// normal "no data this cycle" case, never an error.
    pub fn decode_field(telegram: &Telegram, field: &FieldSpec) -> Reading {
        let buf = telegram.as_bytes();
        let Some(obis_idx) = find(buf, &field.obis.wire_pattern()) else {
            log::debug!("{} not present in telegram", field.obis);
            return Reading::ZERO;
        };

        match Self::decode_int(buf, obis_idx + field.value_offset) {
            Some((value, _size)) => Reading::from_raw(value),
            None => Reading::ZERO,
        }
    }

    /// Decode a variable-length integer at `offset`
    ///
    /// The tag byte's high nibble selects signedness (`0x5_` signed,
    /// `0x6_` unsigned), its low nibble gives the total encoded size
    /// including the tag. The payload is big-endian. Returns the value
    /// and the total encoded size, or `None` when the buffer is too
    /// short or the tag is not an integer tag.
    fn decode_int(buf: &[u8], offset: usize) -> Option<(i64, u8)> {
        if buf.len() < offset + 2 {
            return None;
        }

        let tag = buf[offset];
        let size = (tag & TAG_SIZE_MASK) as usize;
        if size < 2 || buf.len() - offset < size {
            return None;
        }

        let payload = &buf[offset + 1..offset + size];
        if payload.len() > 8 {
            return None;
        }

        match tag & TAG_TYPE_MASK {
            TAG_SIGNED => Some((be_signed(payload), size as u8)),
            TAG_UNSIGNED => {
                let value = payload.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64);
                i64::try_from(value).ok().map(|v| (v, size as u8))
            }
            _ => None,
        }
    }
}

/// Big-endian two's-complement decode with sign extension
fn be_signed(payload: &[u8]) -> i64 {
    let mut value: i64 = if payload[0] & 0x80 != 0 { -1 } else { 0 };
    for &b in payload {
        value = (value << 8) | b as i64;
    }
    value
}
