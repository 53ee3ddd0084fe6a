//! Core types and utilities for the SML meter logger
//!
//! This crate provides the error taxonomy, OBIS identifiers and the
//! reading/snapshot types shared by all layers.

pub mod error;
pub mod obis;
pub mod reading;

pub use error::{SmlError, SmlResult};
pub use obis::ObisId;
pub use reading::{now_millis, MeterSnapshot, Reading};
