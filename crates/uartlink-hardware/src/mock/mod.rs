//! Mock transport implementations for testing and development.
//!
//! This module provides a simulated serial link that can be controlled
//! programmatically without requiring physical hardware.

pub mod link;

// Re-export commonly used types
pub use link::{MockLink, MockLinkHandle};
