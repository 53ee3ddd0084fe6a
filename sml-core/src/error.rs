use thiserror::Error;

/// Main error type for meter logger operations
#[derive(Error, Debug)]
pub enum SmlError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Timeout")]
    Timeout,

    #[error("No stop marker within timeout after scanning {bytes_scanned} bytes")]
    NoStopMarker { bytes_scanned: usize },

    #[error("Scan buffer exceeded {limit} bytes without a complete frame")]
    ScanOverflow { limit: usize },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sink error: {0}")]
    Sink(String),
}

impl SmlError {
    /// Whether this error belongs to the transport class (port open/read
    /// failures and framing timeouts) that the polling worker retries
    /// with a cooldown.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SmlError::Connection(_)
                | SmlError::Timeout
                | SmlError::NoStopMarker { .. }
                | SmlError::ScanOverflow { .. }
        )
    }
}

/// Result type alias for meter logger operations
pub type SmlResult<T> = Result<T, SmlError>;
