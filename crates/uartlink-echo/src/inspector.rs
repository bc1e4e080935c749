//! Periodic FIFO inspection.
//!
//! The [`PeriodicInspector`] is a background task that, once per period,
//! peeks at the head of the receive FIFO and emits a diagnostic line without
//! consuming anything. It keeps re-arming itself until cancelled.
//!
//! # State Machine
//!
//! ```text
//!          period elapsed: inspect, re-arm
//!            ┌───────┐
//!            │       ▼
//!        ┌───┴────────────┐   cancel()   ┌───────────┐
//! arm ──►│     Armed      │─────────────►│ Cancelled │
//!        └────────────────┘              └───────────┘
//! ```
//!
//! [`PeriodicInspector::cancel`] is the synchronous join point of a binding:
//! it returns only after an inspection already in flight has finished and
//! the task has stopped, so the FIFO may be released right after.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uartlink_core::constants::PREVIEW_LEN;

use crate::fifo::ByteFifo;

/// Lifecycle state of a [`PeriodicInspector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectorState {
    /// Will inspect again when the period elapses.
    Armed,

    /// Terminal; no further inspection will start.
    Cancelled,
}

/// Outcome of one inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectionReport {
    /// The FIFO held `total` bytes; `preview` is its head.
    Data {
        period_ms: u32,
        total: usize,
        preview: Bytes,
    },

    /// The FIFO was empty.
    Empty { period_ms: u32 },
}

impl InspectionReport {
    /// Inspect `fifo` once without consuming anything.
    pub fn capture(fifo: &ByteFifo, period_ms: u32) -> Self {
        let (total, preview) = fifo.preview(PREVIEW_LEN);
        if total == 0 {
            Self::Empty { period_ms }
        } else {
            Self::Data {
                period_ms,
                total,
                preview,
            }
        }
    }

    /// Check whether the FIFO held any bytes.
    pub fn has_data(&self) -> bool {
        matches!(self, Self::Data { .. })
    }
}

impl fmt::Display for InspectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data {
                period_ms,
                total,
                preview,
            } => f.write_str(&format_preview(*period_ms, *total, preview)),
            Self::Empty { period_ms } => write!(f, "poll {} ms: no data", period_ms),
        }
    }
}

/// Format an inspection line: period, buffered total and a hex preview.
///
/// ```
/// use uartlink_echo::inspector::format_preview;
///
/// assert_eq!(
///     format_preview(1000, 40, &[0x24, 0x47, 0x0a]),
///     "poll 1000 ms: fifo 40 bytes, first 3: 24 47 0a"
/// );
/// ```
pub fn format_preview(period_ms: u32, total: usize, preview: &[u8]) -> String {
    use fmt::Write;

    let mut line = format!(
        "poll {} ms: fifo {} bytes, first {}:",
        period_ms,
        total,
        preview.len()
    );
    for byte in preview {
        // Writing to a String cannot fail
        let _ = write!(line, " {:02x}", byte);
    }
    line
}

/// Self-rescheduling diagnostic task over one FIFO.
#[derive(Debug)]
pub struct PeriodicInspector {
    period_ms: u32,
    cancel: CancellationToken,
    state: Arc<watch::Sender<InspectorState>>,
    task: Option<JoinHandle<()>>,
}

impl PeriodicInspector {
    /// Spawn the inspection task on the current tokio runtime.
    ///
    /// The first inspection runs one period after arming. Each report is
    /// logged and published on `reports`; having no subscribers is fine.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn arm(
        fifo: Arc<ByteFifo>,
        period_ms: u32,
        reports: broadcast::Sender<InspectionReport>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let (state, _) = watch::channel(InspectorState::Armed);
        let state = Arc::new(state);

        let task = tokio::spawn(run(
            fifo,
            period_ms,
            cancel.clone(),
            Arc::clone(&state),
            reports,
        ));

        debug!("Inspector armed with {} ms period", period_ms);
        Self {
            period_ms,
            cancel,
            state,
            task: Some(task),
        }
    }

    /// Cancel the task and wait until it has stopped.
    ///
    /// An inspection in flight is allowed to finish; none starts afterwards.
    /// On return the state is [`InspectorState::Cancelled`]. Calling this
    /// again is a no-op.
    pub async fn cancel(&mut self) {
        self.cancel.cancel();

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Inspector task ended abnormally: {}", e);
            }
        }

        self.state.send_replace(InspectorState::Cancelled);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> InspectorState {
        *self.state.borrow()
    }

    /// Watch for state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<InspectorState> {
        self.state.subscribe()
    }

    /// Inspection period in milliseconds.
    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }
}

impl Drop for PeriodicInspector {
    fn drop(&mut self) {
        // Without an async context the task cannot be joined, only stopped.
        if let Some(task) = self.task.take() {
            self.cancel.cancel();
            task.abort();
        }
    }
}

async fn run(
    fifo: Arc<ByteFifo>,
    period_ms: u32,
    cancel: CancellationToken,
    state: Arc<watch::Sender<InspectorState>>,
    reports: broadcast::Sender<InspectionReport>,
) {
    let period = Duration::from_millis(u64::from(period_ms));

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(period) => {}
        }

        let report = InspectionReport::capture(&fifo, period_ms);
        if report.has_data() {
            info!("{}", report);
        } else {
            debug!("{}", report);
        }
        let _ = reports.send(report);
    }

    state.send_replace(InspectorState::Cancelled);
    debug!("Inspector stopped");
}
