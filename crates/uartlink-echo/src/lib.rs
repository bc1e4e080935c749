//! Serial link byte pipeline.
//!
//! This crate implements the buffering core of the UART echo/logger: bytes
//! received by a transport flow through a bounded FIFO to any number of
//! client sessions, while a background inspector periodically logs what is
//! waiting.
//!
//! # Architecture
//!
//! ```text
//!                ┌─────────────┐   append   ┌──────────┐   take    ┌──────────┐
//! transport ────►│ ReceivePath │───────────►│ ByteFifo │──────────►│ Session  │──► client
//!  (producer)    └──────┬──────┘            └────┬─────┘           └────┬─────┘
//!                       │ echo                   │ peek                 │ write
//!                       ▼                        ▼                      ▼
//!                   transport         PeriodicInspector             transport
//! ```
//!
//! - [`ByteFifo`]: fixed-capacity FIFO; overflow drops the excess and counts it.
//! - [`ReceivePath`]: transport callback; never blocks.
//! - [`StreamEndpoint`] / [`Session`]: read, write and poll for clients.
//! - [`PeriodicInspector`]: self-rescheduling preview of the FIFO head.
//! - [`LinkBinding`]: builds all of the above for one link and tears it
//!   down in reverse order.
//!
//! # Example
//!
//! ```
//! use uartlink_core::LinkConfig;
//! use uartlink_echo::{LinkBinding, ReadMode};
//! use uartlink_hardware::MockLink;
//!
//! # #[tokio::main]
//! # async fn main() -> uartlink_echo::Result<()> {
//! let (link, handle) = MockLink::new();
//! let binding = LinkBinding::bind(link, LinkConfig::default().with_echo(true)).await?;
//! let session = binding.open()?;
//!
//! handle.inject(b"ping").unwrap();
//!
//! assert_eq!(&session.read(16, ReadMode::Blocking).await?[..], b"ping");
//! assert_eq!(handle.written(), b"ping");
//!
//! binding.unbind().await;
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod endpoint;
pub mod error;
pub mod fifo;
pub mod inspector;
pub mod receive;

pub use binding::LinkBinding;
pub use endpoint::{ReadMode, Readiness, Session, StreamEndpoint};
pub use error::{EchoError, Result};
pub use fifo::{ByteFifo, FifoStats};
pub use inspector::{InspectionReport, InspectorState, PeriodicInspector, format_preview};
pub use receive::ReceivePath;
