use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag byte prefixing a 6-byte OBIS code inside an SML telegram
/// (octet string, length 7 including the tag itself).
const OBIS_WIRE_TAG: u8 = 0x07;

/// OBIS (Object Identification System) identifier for a metered quantity
///
/// OBIS codes are 6-byte identifiers tagging a specific reading inside a
/// telegram. The logger tracks exactly two of them: positive (1.8.0) and
/// negative (2.8.0) active energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObisId {
    bytes: [u8; 6],
}

impl ObisId {
    /// Positive active energy (1-0:1.8.0*255)
    pub const POSITIVE_ACTIVE_ENERGY: ObisId = ObisId::new(1, 0, 1, 8, 0, 255);

    /// Negative active energy (1-0:2.8.0*255)
    pub const NEGATIVE_ACTIVE_ENERGY: ObisId = ObisId::new(1, 0, 2, 8, 0, 255);

    /// Create a new OBIS identifier from individual value group bytes
    pub const fn new(a: u8, b: u8, c: u8, d: u8, e: u8, f: u8) -> Self {
        Self {
            bytes: [a, b, c, d, e, f],
        }
    }

    /// Get the identifier as a byte array
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.bytes
    }

    /// Get the byte pattern this identifier appears as on the wire,
    /// including the leading octet-string tag.
    pub fn wire_pattern(&self) -> [u8; 7] {
        [
            OBIS_WIRE_TAG,
            self.bytes[0],
            self.bytes[1],
            self.bytes[2],
            self.bytes[3],
            self.bytes[4],
            self.bytes[5],
        ]
    }
}

impl fmt::Display for ObisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}:{}.{}.{}*{}",
            self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3], self.bytes[4],
            self.bytes[5]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_energy_wire_pattern() {
        assert_eq!(
            ObisId::POSITIVE_ACTIVE_ENERGY.wire_pattern(),
            [0x07, 0x01, 0x00, 0x01, 0x08, 0x00, 0xFF]
        );
    }

    #[test]
    fn test_negative_energy_wire_pattern() {
        assert_eq!(
            ObisId::NEGATIVE_ACTIVE_ENERGY.wire_pattern(),
            [0x07, 0x01, 0x00, 0x02, 0x08, 0x00, 0xFF]
        );
    }

    #[test]
    fn test_obis_display() {
        assert_eq!(
            format!("{}", ObisId::POSITIVE_ACTIVE_ENERGY),
            "1-0:1.8.0*255"
        );
    }
}
