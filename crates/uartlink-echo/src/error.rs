//! Error types for the byte pipeline.
//!
//! Construction errors ([`EchoError::AllocationFailure`],
//! [`EchoError::TransportOpen`], [`EchoError::Config`],
//! [`EchoError::InvalidEndpointName`]) abort a binding. The remaining
//! variants are returned to the immediate caller of an endpoint operation and
//! never retried internally. Overflow is not an error: it is counted by the
//! FIFO and logged by the receive path.

use uartlink_core::ConfigError;
use uartlink_hardware::HardwareError;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, EchoError>;

/// Errors returned by the byte pipeline.
#[derive(Debug, thiserror::Error)]
pub enum EchoError {
    /// Buffer storage could not be allocated.
    #[error("Failed to allocate {size} byte FIFO")]
    AllocationFailure { size: usize },

    /// Binding properties are unusable.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The transport refused to open.
    #[error("Failed to open transport {device}: {source}")]
    TransportOpen {
        device: String,
        #[source]
        source: HardwareError,
    },

    /// The transport rejected a write; carries the transport's error verbatim.
    #[error("Transport write failed: {0}")]
    TransportWrite(#[source] HardwareError),

    /// Non-blocking read found the FIFO empty.
    #[error("Operation would block")]
    WouldBlock,

    /// A blocked read was interrupted by session close or teardown.
    #[error("Operation cancelled")]
    Cancelled,

    /// The stream endpoint could not be published under this name.
    #[error("Invalid endpoint name {name:?}: {reason}")]
    InvalidEndpointName { name: String, reason: String },

    /// The session or endpoint has been closed.
    #[error("Endpoint {name} is closed")]
    Closed { name: String },
}

impl EchoError {
    /// Create a new allocation failure error.
    pub fn allocation(size: usize) -> Self {
        Self::AllocationFailure { size }
    }

    /// Create a new transport open error.
    pub fn transport_open(device: impl Into<String>, source: HardwareError) -> Self {
        Self::TransportOpen {
            device: device.into(),
            source,
        }
    }

    /// Create a new invalid endpoint name error.
    pub fn invalid_endpoint_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpointName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a new closed error.
    pub fn closed(name: impl Into<String>) -> Self {
        Self::Closed { name: name.into() }
    }

    /// Check whether the error is [`EchoError::WouldBlock`].
    pub fn is_would_block(&self) -> bool {
        matches!(self, Self::WouldBlock)
    }

    /// Check whether the error is [`EchoError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
