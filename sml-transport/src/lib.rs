//! Transport layer for the SML meter logger
//!
//! Provides the [`ByteSource`] abstraction over the meter's serial link
//! and a scripted [`mock::MockSource`] for exercising the framing layer
//! without hardware.

pub mod mock;
pub mod serial;
pub mod source;

pub use mock::MockSource;
pub use serial::{SerialSettings, SerialSource};
pub use source::ByteSource;
