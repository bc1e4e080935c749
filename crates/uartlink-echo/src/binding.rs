//! Per-device binding lifecycle.
//!
//! A [`LinkBinding`] owns everything attached to one serial link: the
//! receive FIFO, the transport, the stream endpoint and the inspector.
//! Nothing is shared between bindings, so several links can be bound side
//! by side.
//!
//! # Lifecycle
//!
//! Binding constructs in dependency order and unwinds whatever was already
//! built if a later step fails:
//!
//! 1. Validate the configuration
//! 2. Allocate the FIFO
//! 3. Open the transport with the receive path as its client
//! 4. Configure the line (flow control, baud rate, greeting)
//! 5. Register the stream endpoint
//! 6. Arm the inspector
//!
//! Teardown runs in reverse: cancel the inspector and wait for it, close
//! the endpoint, close the transport, release the FIFO. Teardown errors are
//! logged, never returned.
//!
//! # Examples
//!
//! ```
//! use uartlink_core::LinkConfig;
//! use uartlink_echo::{LinkBinding, ReadMode};
//! use uartlink_hardware::MockLink;
//!
//! # #[tokio::main]
//! # async fn main() -> uartlink_echo::Result<()> {
//! let (link, handle) = MockLink::new();
//! let binding = LinkBinding::bind(link, LinkConfig::default()).await?;
//!
//! let session = binding.open()?;
//! handle.inject(b"$GPRMC").unwrap();
//! assert_eq!(&session.read(64, ReadMode::Blocking).await?[..], b"$GPRMC");
//!
//! binding.unbind().await;
//! assert!(!handle.is_open());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::{Notify, broadcast};
use tracing::{error, info, warn};
use uartlink_core::LinkConfig;
use uartlink_hardware::SerialLink;

use crate::endpoint::{Session, StreamEndpoint};
use crate::error::{EchoError, Result};
use crate::fifo::{ByteFifo, FifoStats};
use crate::inspector::{InspectionReport, InspectorState, PeriodicInspector};
use crate::receive::ReceivePath;

/// Capacity of the inspection report channel; slow subscribers lag.
const REPORT_CHANNEL_CAPACITY: usize = 16;

/// Everything attached to one bound serial link.
#[derive(Debug)]
pub struct LinkBinding<L: SerialLink> {
    config: LinkConfig,
    link: Arc<L>,
    fifo: Arc<ByteFifo>,
    endpoint: StreamEndpoint<L>,
    inspector: PeriodicInspector,
    reports: broadcast::Sender<InspectionReport>,
    torn_down: bool,
}

impl<L: SerialLink> LinkBinding<L> {
    /// Bind `link` with `config`.
    ///
    /// Must be called from within a tokio runtime; the inspector is spawned
    /// on it.
    ///
    /// # Errors
    ///
    /// - [`EchoError::Config`]: a property is unusable.
    /// - [`EchoError::AllocationFailure`]: the FIFO could not be allocated.
    /// - [`EchoError::TransportOpen`]: the transport refused to open.
    /// - [`EchoError::InvalidEndpointName`]: the endpoint could not be
    ///   registered; the transport is closed again before returning.
    pub async fn bind(link: L, config: LinkConfig) -> Result<Self> {
        config.validate()?;

        let link = Arc::new(link);
        let fifo = Arc::new(ByteFifo::with_capacity(config.capacity).inspect_err(|e| {
            error!("failed to alloc fifo: {}", e);
        })?);
        let readers = Arc::new(Notify::new());

        let receiver = ReceivePath::new(
            Arc::clone(&fifo),
            Arc::clone(&readers),
            config.echo,
            link.name(),
        );
        link.open(Arc::new(receiver)).map_err(|source| {
            error!("failed to open {}: {}", link.name(), source);
            EchoError::transport_open(link.name(), source)
        })?;

        configure_line(link.as_ref(), &config);

        let endpoint = match StreamEndpoint::register(
            &config.endpoint_name,
            Arc::clone(&fifo),
            readers,
            Arc::clone(&link),
        ) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                error!("failed to register endpoint: {}", e);
                close_link(link.as_ref());
                return Err(e);
            }
        };

        let (reports, _) = broadcast::channel(REPORT_CHANNEL_CAPACITY);
        let inspector =
            PeriodicInspector::arm(Arc::clone(&fifo), config.period_ms, reports.clone());

        info!(
            device = %link.name(),
            "echo_back={}, poll-period-ms={}",
            config.echo, config.period_ms
        );

        Ok(Self {
            config,
            link,
            fifo,
            endpoint,
            inspector,
            reports,
            torn_down: false,
        })
    }

    /// Tear the binding down and release its resources.
    ///
    /// Blocked reads on any session fail with [`EchoError::Cancelled`].
    pub async fn unbind(mut self) {
        self.teardown().await;
    }

    async fn teardown(&mut self) {
        if self.torn_down {
            return;
        }

        self.inspector.cancel().await;
        self.endpoint.close();
        close_link(self.link.as_ref());

        // Set last so that drop finishes an abandoned unbind.
        self.torn_down = true;
        info!(device = %self.link.name(), "unbound");
    }

    /// Open a client session on the stream endpoint.
    pub fn open(&self) -> Result<Session<L>> {
        self.endpoint.open()
    }

    /// The stream endpoint published by this binding.
    pub fn endpoint(&self) -> &StreamEndpoint<L> {
        &self.endpoint
    }

    /// Subscribe to inspection reports published from now on.
    pub fn subscribe_reports(&self) -> broadcast::Receiver<InspectionReport> {
        self.reports.subscribe()
    }

    /// Current state of the periodic inspector.
    pub fn inspector_state(&self) -> InspectorState {
        self.inspector.state()
    }

    /// Snapshot of the receive FIFO counters.
    pub fn stats(&self) -> FifoStats {
        self.fifo.stats()
    }

    /// Configuration the binding was created with.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// The bound transport.
    pub fn link(&self) -> &L {
        &self.link
    }
}

impl<L: SerialLink> Drop for LinkBinding<L> {
    fn drop(&mut self) {
        if !self.torn_down {
            // The inspector's own drop stops its task without joining it.
            warn!(device = %self.link.name(), "binding dropped without unbind");
            self.endpoint.close();
            close_link(self.link.as_ref());
        }
    }
}

fn configure_line<L: SerialLink>(link: &L, config: &LinkConfig) {
    if let Err(e) = link.set_flow_control(false) {
        warn!("failed to disable flow control on {}: {}", link.name(), e);
    }

    match link.set_baudrate(config.speed) {
        Ok(applied) => info!("configured baudrate {}", applied),
        Err(e) => warn!("failed to set baudrate {}: {}", config.speed, e),
    }

    if let Some(greeting) = &config.greeting {
        if let Err(e) = link.write_buf(greeting.as_bytes()) {
            warn!("failed to send greeting: {}", e);
        }
    }
}

fn close_link<L: SerialLink>(link: &L) {
    if link.is_open() {
        if let Err(e) = link.close() {
            warn!("failed to close {}: {}", link.name(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::ReadMode;
    use uartlink_hardware::MockLink;

    #[tokio::test]
    async fn test_bind_configures_line() {
        let (link, handle) = MockLink::new();
        let config = LinkConfig::default().with_speed(57600);

        let binding = LinkBinding::bind(link, config).await.unwrap();

        assert!(handle.is_open());
        assert_eq!(handle.baudrate(), Some(57600));
        assert_eq!(handle.flow_control(), Some(false));
        assert!(handle.written().is_empty());
        assert_eq!(binding.inspector_state(), InspectorState::Armed);
        assert_eq!(binding.endpoint().name(), "uart3_echo");

        binding.unbind().await;
    }

    #[tokio::test]
    async fn test_greeting_sent_once() {
        let (link, handle) = MockLink::new();
        let config = LinkConfig::default().with_greeting("[uartlink] online\r\n");

        let binding = LinkBinding::bind(link, config).await.unwrap();
        assert_eq!(handle.written(), b"[uartlink] online\r\n");

        binding.unbind().await;
    }

    #[tokio::test]
    async fn test_invalid_config_opens_nothing() {
        let (link, handle) = MockLink::new();
        let config = LinkConfig::default().with_capacity(0);

        let result = LinkBinding::bind(link, config).await;
        assert!(matches!(result, Err(EchoError::Config(_))));
        assert_eq!(handle.open_count(), 0);
    }

    #[tokio::test]
    async fn test_drop_without_unbind_closes_link() {
        let (link, handle) = MockLink::new();
        let binding = LinkBinding::bind(link, LinkConfig::default()).await.unwrap();
        let session = binding.open().unwrap();

        drop(binding);

        assert!(!handle.is_open());
        assert!(session.is_closed());
    }

    #[tokio::test]
    async fn test_interrupted_unbind_still_releases_link() {
        let (link, handle) = MockLink::new();
        let binding = LinkBinding::bind(link, LinkConfig::default()).await.unwrap();
        let session = Arc::new(binding.open().unwrap());

        let reader = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.read(10, ReadMode::Blocking).await })
        };
        tokio::task::yield_now().await;

        // The inspector join is still pending on the first poll, so the
        // unbind future is dropped part way through teardown.
        let finished = tokio::select! {
            biased;
            _ = binding.unbind() => true,
            _ = std::future::ready(()) => false,
        };
        assert!(!finished);

        assert!(!handle.is_open());
        assert_eq!(handle.close_count(), 1);
        assert!(session.is_closed());

        let result = tokio::time::timeout(std::time::Duration::from_secs(1), reader)
            .await
            .expect("blocked reader was not released")
            .unwrap();
        assert!(matches!(result, Err(EchoError::Cancelled)));
    }
}
