//! Receive path: the transport's entry point into the pipeline.

use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{debug, warn};
use uartlink_hardware::{LinkClient, LinkWriter};

use crate::fifo::ByteFifo;

/// Client registered with the transport when a link is bound.
///
/// Runs on the transport's producer context for every inbound chunk. It
/// stores the chunk in the FIFO, wakes blocked readers and optionally echoes
/// the chunk back. It never blocks and always reports the whole chunk as
/// consumed, even when part of it was dropped on overflow.
#[derive(Debug)]
pub struct ReceivePath {
    fifo: Arc<ByteFifo>,
    readers: Arc<Notify>,
    echo: bool,
    device: String,
}

impl ReceivePath {
    /// Create a receive path storing into `fifo` and waking `readers`.
    pub fn new(
        fifo: Arc<ByteFifo>,
        readers: Arc<Notify>,
        echo: bool,
        device: impl Into<String>,
    ) -> Self {
        Self {
            fifo,
            readers,
            echo,
            device: device.into(),
        }
    }

    /// Whether received chunks are written back to the transport.
    pub fn echo_enabled(&self) -> bool {
        self.echo
    }
}

impl LinkClient for ReceivePath {
    fn receive_buf(&self, link: &dyn LinkWriter, data: &[u8]) -> usize {
        debug!(device = %self.device, "rx {} bytes", data.len());
        if data.is_empty() {
            return 0;
        }

        let stored = self.fifo.append(data);
        if stored < data.len() {
            warn!(
                device = %self.device,
                "fifo overflow: dropped {} bytes",
                data.len() - stored
            );
        }
        if stored > 0 {
            self.readers.notify_waiters();
        }

        if self.echo {
            match link.write_buf(data) {
                Ok(n) => debug!(device = %self.device, "echoed {} bytes", n),
                Err(e) => warn!(device = %self.device, "echo failed: {}", e),
            }
        }

        data.len()
    }
}
