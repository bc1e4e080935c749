//! Serial transport trait definitions.
//!
//! These traits are the contract between the byte pipeline and whatever moves
//! bytes over the physical link. The transport owns reception: once opened
//! with a [`LinkClient`], it calls [`LinkClient::receive_buf`] from its own
//! producer context every time a chunk arrives.
//!
//! Unlike the async device traits used elsewhere, every method here is
//! synchronous and takes `&self`. The receive callback runs on a
//! time-sensitive path that must not await, and it writes back through the
//! same transport while other tasks may be writing or closing it.

use std::sync::Arc;

use crate::error::Result;

/// Transmit half of a serial transport.
pub trait LinkWriter: Send + Sync {
    /// Queue `data` for transmission.
    ///
    /// Returns the number of bytes the transport accepted, which may be less
    /// than `data.len()`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport is closed or the write fails.
    fn write_buf(&self, data: &[u8]) -> Result<usize>;
}

/// Receiver of inbound bytes, registered with a transport when it opens.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use uartlink_hardware::traits::{LinkClient, LinkWriter};
///
/// #[derive(Default)]
/// struct Counter(AtomicUsize);
///
/// impl LinkClient for Counter {
///     fn receive_buf(&self, _link: &dyn LinkWriter, data: &[u8]) -> usize {
///         self.0.fetch_add(data.len(), Ordering::Relaxed);
///         data.len()
///     }
/// }
/// ```
pub trait LinkClient: Send + Sync {
    /// Handle a chunk of received bytes.
    ///
    /// Called from the transport's producer context, concurrently with any
    /// other use of the transport. Implementations must not block. `link`
    /// writes back through the transport that delivered the chunk.
    ///
    /// Returns the number of bytes consumed.
    fn receive_buf(&self, link: &dyn LinkWriter, data: &[u8]) -> usize;

    /// Transmit space became available again.
    fn write_wakeup(&self) {}
}

/// A serial transport that can be opened, configured and closed.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use uartlink_hardware::mock::MockLink;
/// use uartlink_hardware::traits::{LinkClient, LinkWriter, SerialLink};
///
/// struct Discard;
///
/// impl LinkClient for Discard {
///     fn receive_buf(&self, _link: &dyn LinkWriter, data: &[u8]) -> usize {
///         data.len()
///     }
/// }
///
/// # fn main() -> uartlink_hardware::Result<()> {
/// let (link, _handle) = MockLink::new();
/// link.open(Arc::new(Discard))?;
/// link.set_flow_control(false)?;
/// assert_eq!(link.set_baudrate(115_200)?, 115_200);
/// link.write_buf(b"ping")?;
/// link.close()?;
/// # Ok(())
/// # }
/// ```
pub trait SerialLink: LinkWriter {
    /// Open the transport and register the client that receives inbound bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be opened or is already open.
    fn open(&self, client: Arc<dyn LinkClient>) -> Result<()>;

    /// Close the transport. No receive callback starts after this returns.
    fn close(&self) -> Result<()>;

    /// Set the line rate and return the rate actually applied.
    fn set_baudrate(&self, baud: u32) -> Result<u32>;

    /// Enable or disable hardware (RTS/CTS) flow control.
    fn set_flow_control(&self, enabled: bool) -> Result<()>;

    /// Check whether the transport is currently open.
    fn is_open(&self) -> bool;

    /// Human readable transport name, used in diagnostics.
    fn name(&self) -> &str;
}
