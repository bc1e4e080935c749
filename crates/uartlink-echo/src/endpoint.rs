//! Consumer-facing stream endpoint.
//!
//! A [`StreamEndpoint`] publishes the receive FIFO of one binding under a
//! name. Clients call [`StreamEndpoint::open`] to obtain a [`Session`], the
//! equivalent of an open file handle, and use it to drain received bytes,
//! transmit bytes and query readiness.
//!
//! # Concurrency
//!
//! Any number of sessions may exist at once. They all drain the same FIFO:
//! when bytes arrive, every blocked reader is woken and whichever takes first
//! gets the data; the others go back to waiting. No fairness between readers
//! is provided.
//!
//! ```
//! use std::sync::Arc;
//! use tokio::sync::Notify;
//! use uartlink_echo::{ByteFifo, ReadMode, StreamEndpoint};
//! use uartlink_hardware::MockLink;
//!
//! # #[tokio::main]
//! # async fn main() -> uartlink_echo::Result<()> {
//! let fifo = Arc::new(ByteFifo::with_capacity(64)?);
//! let (link, _handle) = MockLink::new();
//! let endpoint = StreamEndpoint::register("uart3_echo", fifo.clone(), Arc::new(Notify::new()), Arc::new(link))?;
//!
//! let session = endpoint.open()?;
//! assert!(session.read(16, ReadMode::NonBlocking).await.unwrap_err().is_would_block());
//!
//! fifo.append(b"ok");
//! assert_eq!(&session.read(16, ReadMode::Blocking).await?[..], b"ok");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uartlink_core::constants::MAX_TRANSFER_CHUNK;
use uartlink_hardware::SerialLink;

use crate::error::{EchoError, Result};
use crate::fifo::ByteFifo;

/// How a read behaves when the FIFO is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Suspend until data arrives or the read is cancelled.
    #[default]
    Blocking,

    /// Fail immediately with [`EchoError::WouldBlock`].
    NonBlocking,
}

/// Result of a readiness query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// At least one byte can be read without suspending.
    Readable,

    /// The FIFO is empty.
    NotReadable,
}

impl Readiness {
    /// Check whether this is [`Readiness::Readable`].
    pub fn is_readable(self) -> bool {
        self == Self::Readable
    }
}

/// Named read/write/poll surface over one binding's FIFO and transport.
#[derive(Debug)]
pub struct StreamEndpoint<L> {
    name: String,
    fifo: Arc<ByteFifo>,
    readers: Arc<Notify>,
    link: Arc<L>,
    shutdown: CancellationToken,
}

impl<L: SerialLink> StreamEndpoint<L> {
    /// Publish an endpoint named `name` over `fifo` and `link`.
    ///
    /// `readers` is the notification the receive path signals whenever bytes
    /// are stored.
    ///
    /// # Errors
    ///
    /// Returns [`EchoError::InvalidEndpointName`] if the name is empty or
    /// contains a path separator.
    pub fn register(
        name: &str,
        fifo: Arc<ByteFifo>,
        readers: Arc<Notify>,
        link: Arc<L>,
    ) -> Result<Self> {
        if name.is_empty() {
            return Err(EchoError::invalid_endpoint_name(name, "name is empty"));
        }
        if name.contains('/') {
            return Err(EchoError::invalid_endpoint_name(name, "contains '/'"));
        }

        info!("Registered stream endpoint {}", name);
        Ok(Self {
            name: name.to_string(),
            fifo,
            readers,
            link,
            shutdown: CancellationToken::new(),
        })
    }

    /// Open a client session.
    ///
    /// Sessions carry no state of their own besides their cancellation
    /// scope, so opening is idempotent: every session sees the same FIFO.
    ///
    /// # Errors
    ///
    /// Returns [`EchoError::Closed`] after the endpoint has been closed.
    pub fn open(&self) -> Result<Session<L>> {
        if self.shutdown.is_cancelled() {
            return Err(EchoError::closed(&self.name));
        }

        Ok(Session {
            name: self.name.clone(),
            fifo: Arc::clone(&self.fifo),
            readers: Arc::clone(&self.readers),
            link: Arc::clone(&self.link),
            cancel: self.shutdown.child_token(),
        })
    }

    /// Withdraw the endpoint.
    ///
    /// Every blocked read on every session fails with
    /// [`EchoError::Cancelled`] and no new session can be opened. The FIFO
    /// itself is left untouched. Calling this more than once is a no-op.
    pub fn close(&self) {
        if !self.shutdown.is_cancelled() {
            self.shutdown.cancel();
            info!("Deregistered stream endpoint {}", self.name);
        }
    }

    /// Check whether [`StreamEndpoint::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Name the endpoint is published under.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One client's handle on a [`StreamEndpoint`].
///
/// Methods take `&self`, so a session can be shared (e.g. behind an `Arc`)
/// between a task blocked in [`Session::read`] and one that closes it.
#[derive(Debug)]
pub struct Session<L> {
    name: String,
    fifo: Arc<ByteFifo>,
    readers: Arc<Notify>,
    link: Arc<L>,
    cancel: CancellationToken,
}

impl<L: SerialLink> Session<L> {
    /// Drain up to `max_len` received bytes, at most 4096 per call.
    ///
    /// If the FIFO holds data it is returned immediately. Otherwise a
    /// [`ReadMode::NonBlocking`] read fails with [`EchoError::WouldBlock`]
    /// and a [`ReadMode::Blocking`] read suspends until bytes arrive or the
    /// session is cancelled. A zero `max_len` returns an empty buffer.
    ///
    /// # Errors
    ///
    /// - [`EchoError::WouldBlock`]: non-blocking read on an empty FIFO.
    /// - [`EchoError::Cancelled`]: the session or endpoint was closed.
    pub async fn read(&self, max_len: usize, mode: ReadMode) -> Result<Bytes> {
        if self.cancel.is_cancelled() {
            return Err(EchoError::Cancelled);
        }
        if max_len == 0 {
            return Ok(Bytes::new());
        }
        let want = max_len.min(MAX_TRANSFER_CHUNK);

        loop {
            // Register for wakeups before testing the FIFO so an append
            // between the test and the await is not missed.
            let notified = self.readers.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let chunk = self.fifo.take(want);
            if !chunk.is_empty() {
                return Ok(chunk);
            }
            if mode == ReadMode::NonBlocking {
                return Err(EchoError::WouldBlock);
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(EchoError::Cancelled),
                _ = &mut notified => {}
            }
        }
    }

    /// Forward up to 4096 bytes of `data` to the transport.
    ///
    /// Returns the number of bytes the transport accepted.
    ///
    /// # Errors
    ///
    /// - [`EchoError::TransportWrite`]: the transport rejected the write.
    /// - [`EchoError::Closed`]: the session or endpoint was closed.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        if self.cancel.is_cancelled() {
            return Err(EchoError::closed(&self.name));
        }
        if data.is_empty() {
            return Ok(0);
        }

        let len = data.len().min(MAX_TRANSFER_CHUNK);
        self.link
            .write_buf(&data[..len])
            .map_err(EchoError::TransportWrite)
    }

    /// Report whether a read would return data right now.
    pub fn poll(&self) -> Readiness {
        if self.fifo.is_empty() {
            Readiness::NotReadable
        } else {
            Readiness::Readable
        }
    }

    /// Wait until the FIFO is readable, without consuming anything.
    ///
    /// This is the registration half of [`Session::poll`] for event loops
    /// that multiplex several sources: it completes as soon as data is
    /// present and leaves the read itself to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`EchoError::Cancelled`] if the session is closed while
    /// waiting.
    pub async fn readable(&self) -> Result<()> {
        loop {
            let notified = self.readers.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.cancel.is_cancelled() {
                return Err(EchoError::Cancelled);
            }
            if self.poll().is_readable() {
                return Ok(());
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(EchoError::Cancelled),
                _ = &mut notified => {}
            }
        }
    }

    /// Close this session, cancelling its blocked reads.
    ///
    /// Other sessions and the shared FIFO are unaffected. Idempotent.
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            debug!("Closing session on {}", self.name);
            self.cancel.cancel();
        }
    }

    /// Token that cancels this session's blocked reads when triggered, for
    /// wiring to signal handlers or timeouts.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Check whether this session or its endpoint has been closed.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
