//! Telegram framing and field decoding for the SML meter logger
//!
//! This crate turns the unbounded, noisy serial byte stream into one
//! validated telegram at a time ([`FrameScanner`]) and extracts the two
//! tracked energy readings from it ([`FieldDecoder`]).
//!
//! It is deliberately not a general SML decoder: only the DWS7612.2
//! frame layout and the variable-length integer encoding used by its
//! energy registers are understood.

pub mod decoder;
pub mod scanner;
pub mod telegram;

pub use decoder::{FieldDecoder, FieldSpec, NEGATIVE_ENERGY_FIELD, POSITIVE_ENERGY_FIELD};
pub use scanner::FrameScanner;
pub use telegram::{Telegram, START_MARKER, STOP_MARKER, TRAILER_LEN};
