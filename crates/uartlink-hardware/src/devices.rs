//! Enum wrapper for serial transport dispatch.
//!
//! The byte pipeline is generic over [`SerialLink`], so a binding is
//! monomorphized for one transport type. [`AnyLink`] lets callers that pick
//! the transport at runtime (for example a CLI choosing between a real port
//! and the mock) keep a single concrete type.
//!
//! # Examples
//!
//! ```
//! use uartlink_hardware::devices::AnyLink;
//! use uartlink_hardware::mock::MockLink;
//! use uartlink_hardware::traits::SerialLink;
//!
//! let (link, _handle) = MockLink::new();
//! let any_link = AnyLink::Mock(link);
//! assert_eq!(any_link.name(), "mock-uart");
//! ```

use std::sync::Arc;

use crate::Result;
use crate::mock::MockLink;
use crate::serial::SerialPortLink;
use crate::traits::{LinkClient, LinkWriter, SerialLink};

/// Enum wrapper for serial transport dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyLink {
    /// Mock link for development and testing.
    Mock(MockLink),

    /// Operating-system serial port.
    Serial(SerialPortLink),
}

impl LinkWriter for AnyLink {
    fn write_buf(&self, data: &[u8]) -> Result<usize> {
        match self {
            Self::Mock(link) => link.write_buf(data),
            Self::Serial(link) => link.write_buf(data),
        }
    }
}

impl SerialLink for AnyLink {
    fn open(&self, client: Arc<dyn LinkClient>) -> Result<()> {
        match self {
            Self::Mock(link) => link.open(client),
            Self::Serial(link) => link.open(client),
        }
    }

    fn close(&self) -> Result<()> {
        match self {
            Self::Mock(link) => link.close(),
            Self::Serial(link) => link.close(),
        }
    }

    fn set_baudrate(&self, baud: u32) -> Result<u32> {
        match self {
            Self::Mock(link) => link.set_baudrate(baud),
            Self::Serial(link) => link.set_baudrate(baud),
        }
    }

    fn set_flow_control(&self, enabled: bool) -> Result<()> {
        match self {
            Self::Mock(link) => link.set_flow_control(enabled),
            Self::Serial(link) => link.set_flow_control(enabled),
        }
    }

    fn is_open(&self) -> bool {
        match self {
            Self::Mock(link) => link.is_open(),
            Self::Serial(link) => link.is_open(),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Mock(link) => link.name(),
            Self::Serial(link) => link.name(),
        }
    }
}

impl From<MockLink> for AnyLink {
    fn from(link: MockLink) -> Self {
        Self::Mock(link)
    }
}

impl From<SerialPortLink> for AnyLink {
    fn from(link: SerialPortLink) -> Self {
        Self::Serial(link)
    }
}
