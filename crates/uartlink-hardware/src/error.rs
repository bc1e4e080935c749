//! Error types for transport operations.
//!
//! This module defines the errors a serial transport can report while being
//! opened, configured, written to or closed.

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during serial transport operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Operation requires an open transport.
    #[error("Transport not open: {device}")]
    NotOpen { device: String },

    /// Transport is already open with a registered client.
    #[error("Transport already open: {device}")]
    AlreadyOpen { device: String },

    /// Operation timed out after specified duration.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Device communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Device configuration error.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new not-open error.
    pub fn not_open(device: impl Into<String>) -> Self {
        Self::NotOpen {
            device: device.into(),
        }
    }

    /// Create a new already-open error.
    pub fn already_open(device: impl Into<String>) -> Self {
        Self::AlreadyOpen {
            device: device.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<serialport::Error> for HardwareError {
    fn from(err: serialport::Error) -> Self {
        match err.kind() {
            serialport::ErrorKind::NoDevice => Self::disconnected(err.description),
            serialport::ErrorKind::InvalidInput => Self::configuration(err.description),
            serialport::ErrorKind::Io(kind) => Self::Io(std::io::Error::new(kind, err.description)),
            serialport::ErrorKind::Unknown => Self::communication(err.description),
        }
    }
}
