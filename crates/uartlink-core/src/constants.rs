//! Core constants for the UART link echo/logger.
//!
//! These values are the defaults applied when a binding does not supply the
//! corresponding property, plus the fixed limits of the byte pipeline.
//!
//! # Usage
//!
//! ```
//! use uartlink_core::constants::*;
//!
//! assert_eq!(DEFAULT_SPEED, 115_200);
//! assert!(PREVIEW_LEN <= MAX_TRANSFER_CHUNK);
//!
//! use std::time::Duration;
//! let period = Duration::from_millis(DEFAULT_POLL_PERIOD_MS as u64);
//! assert_eq!(period.as_secs(), 1);
//! ```

// ============================================================================
// Link Defaults
// ============================================================================

/// Default transport bitrate (`current-speed` property).
pub const DEFAULT_SPEED: u32 = 115_200;

/// Echo-back is disabled unless requested.
///
/// Leave it off when TX and RX are wired as a loopback, otherwise every
/// received chunk is transmitted and received again indefinitely.
pub const DEFAULT_ECHO: bool = false;

/// Default inspector period in milliseconds (`poll-period-ms` property).
pub const DEFAULT_POLL_PERIOD_MS: u32 = 1000;

/// Default receive FIFO capacity in bytes (`fifo-size` property).
pub const DEFAULT_FIFO_CAPACITY: usize = 4096;

/// Default name under which the stream endpoint is published.
pub const DEFAULT_ENDPOINT_NAME: &str = "uart3_echo";

// ============================================================================
// Pipeline Limits
// ============================================================================

/// Upper bound on bytes moved by a single endpoint `read` or `write`.
///
/// Requests above this size are clamped, never rejected.
pub const MAX_TRANSFER_CHUNK: usize = 4096;

/// Number of leading FIFO bytes shown by each inspection.
pub const PREVIEW_LEN: usize = 32;
