use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Divisor turning the meter's fixed-point integer encoding into kWh.
pub const SCALE_DIVISOR: f64 = 10000.0;

/// An energy reading in kWh, rounded to 3 decimal places
///
/// A missing or malformed source field yields `Reading::ZERO` rather than
/// an error; a well-formed telegram without one of the tracked OBIS
/// entries is a normal "no data this cycle" case.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Reading(f64);

impl Reading {
    pub const ZERO: Reading = Reading(0.0);

    /// Scale a raw fixed-point meter value into kWh.
    ///
    /// The meter encodes readings with four fixed decimal digits, so the
    /// raw value is divided by 10000 and rounded to 3 decimal places.
    /// Rounding is half-away-from-zero (`f64::round`); dividing by 10
    /// first keeps the half-way case exact (e.g. 255 -> 25.5 -> 26).
    pub fn from_raw(value: i64) -> Self {
        Reading((value as f64 / 10.0).round() / (SCALE_DIVISOR / 10.0))
    }

    /// The reading in kWh
    pub fn kwh(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

/// One polling cycle's pair of readings, published as a single snapshot
///
/// Both fields are written together through one channel send, so a reader
/// never observes a positive reading from one cycle paired with a negative
/// reading from another.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MeterSnapshot {
    /// Positive active energy (1.8.0)
    pub positive: Reading,
    /// Negative active energy (2.8.0)
    pub negative: Reading,
    /// Millisecond unix timestamp of the cycle that produced the snapshot
    pub taken_at_ms: u64,
}

/// Current unix time in milliseconds
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling_rounds_to_three_decimals() {
        assert_eq!(Reading::from_raw(123456789).kwh(), 12345.679);
    }

    #[test]
    fn test_signed_value_keeps_sign() {
        assert_eq!(Reading::from_raw(-12345678).kwh(), -1234.568);
    }

    #[test]
    fn test_half_way_rounds_away_from_zero() {
        // 255 / 10000 = 0.0255, rounded half-away-from-zero to 0.026
        assert_eq!(Reading::from_raw(255).kwh(), 0.026);
    }

    #[test]
    fn test_display_always_three_decimals() {
        assert_eq!(format!("{}", Reading::from_raw(10000)), "1.000");
        assert_eq!(format!("{}", Reading::ZERO), "0.000");
    }
}
