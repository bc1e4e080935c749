//! Serial transport abstraction layer for the UART link echo/logger.
//!
//! This crate defines the transport collaborator consumed by the byte
//! pipeline: something that can be opened with a receive callback, written
//! to, reconfigured and closed. It ships two implementations:
//!
//! - [`SerialPortLink`]: an operating-system serial port driven by a
//!   dedicated reader thread.
//! - [`MockLink`]: an in-memory link whose reception is driven by a
//!   [`MockLinkHandle`], for tests and emulation.
//!
//! # Receive Model
//!
//! A transport calls [`LinkClient::receive_buf`] from its own producer
//! context whenever bytes arrive. That context is time-sensitive: clients
//! must finish quickly and never block or await.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use uartlink_hardware::{LinkClient, LinkWriter, MockLink, SerialLink};
//!
//! #[derive(Default)]
//! struct Collect(Mutex<Vec<u8>>);
//!
//! impl LinkClient for Collect {
//!     fn receive_buf(&self, _link: &dyn LinkWriter, data: &[u8]) -> usize {
//!         self.0.lock().unwrap().extend_from_slice(data);
//!         data.len()
//!     }
//! }
//!
//! # fn main() -> uartlink_hardware::Result<()> {
//! let (link, handle) = MockLink::new();
//! let collect = Arc::new(Collect::default());
//! link.open(collect.clone())?;
//!
//! handle.inject(b"$GPGGA")?;
//! assert_eq!(collect.0.lock().unwrap().as_slice(), b"$GPGGA");
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T>`][error::Result] with the
//! [`HardwareError`] error type.
//!
//! # Thread Safety
//!
//! All traits require `Send + Sync` and take `&self`: the receive callback,
//! writers and teardown may run on different threads at the same time.

pub mod devices;
pub mod error;
pub mod mock;
pub mod serial;
pub mod traits;

// Re-export commonly used types for convenience
pub use devices::AnyLink;
pub use error::{HardwareError, Result};
pub use mock::{MockLink, MockLinkHandle};
pub use serial::SerialPortLink;
pub use traits::{LinkClient, LinkWriter, SerialLink};
