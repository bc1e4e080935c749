//! Common test utilities for integration tests.
//!
//! Helpers here build bindings over a mock link and generate recognisable
//! byte patterns, so a misordered or truncated stream shows up in the
//! first differing byte of an assertion.

#![allow(dead_code)]

use uartlink_core::LinkConfig;
use uartlink_echo::LinkBinding;
use uartlink_hardware::{MockLink, MockLinkHandle};

/// Bytes `0, 1, 2, ..., 255, 0, 1, ...` of the given length.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 256) as u8).collect()
}

/// Bind a fresh mock link with `config`.
pub async fn bind_mock(config: LinkConfig) -> (LinkBinding<MockLink>, MockLinkHandle) {
    let (link, handle) = MockLink::new();
    let binding = LinkBinding::bind(link, config)
        .await
        .expect("mock binding should succeed");
    (binding, handle)
}

/// Bind a named mock link with `config`.
pub async fn bind_named(
    name: &str,
    config: LinkConfig,
) -> (LinkBinding<MockLink>, MockLinkHandle) {
    let (link, handle) = MockLink::with_name(name.to_string());
    let binding = LinkBinding::bind(link, config)
        .await
        .expect("mock binding should succeed");
    (binding, handle)
}
