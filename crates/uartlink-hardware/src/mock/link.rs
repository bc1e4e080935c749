//! Mock serial transport for testing and development.
//!
//! This module provides a simulated serial link that can be driven
//! programmatically without physical hardware: inbound bytes are injected
//! through a [`MockLinkHandle`], and everything written to the link is
//! recorded for inspection.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    HardwareError, Result,
    traits::{LinkClient, LinkWriter, SerialLink},
};

/// Mock serial link for testing and development.
///
/// Reception is simulated by [`MockLinkHandle::inject`], which calls the
/// registered client synchronously on the injecting thread, the same way a
/// real transport calls it from its receive context.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use uartlink_hardware::mock::MockLink;
/// use uartlink_hardware::traits::{LinkClient, LinkWriter, SerialLink};
///
/// struct Echo;
///
/// impl LinkClient for Echo {
///     fn receive_buf(&self, link: &dyn LinkWriter, data: &[u8]) -> usize {
///         link.write_buf(data).ok();
///         data.len()
///     }
/// }
///
/// # fn main() -> uartlink_hardware::Result<()> {
/// let (link, handle) = MockLink::new();
/// link.open(Arc::new(Echo))?;
///
/// assert_eq!(handle.inject(b"abc")?, 3);
/// assert_eq!(handle.written(), b"abc");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MockLink {
    shared: Arc<MockShared>,
}

impl MockLink {
    /// Create a new mock link with the default name.
    ///
    /// Returns a tuple of (MockLink, MockLinkHandle) where the handle drives
    /// reception and observes transmission.
    pub fn new() -> (Self, MockLinkHandle) {
        Self::with_name("mock-uart".to_string())
    }

    /// Create a new mock link with a custom name.
    pub fn with_name(name: String) -> (Self, MockLinkHandle) {
        let shared = Arc::new(MockShared {
            name,
            state: Mutex::new(MockState::default()),
        });

        let link = Self {
            shared: Arc::clone(&shared),
        };
        let handle = MockLinkHandle { shared };

        (link, handle)
    }
}

impl LinkWriter for MockLink {
    fn write_buf(&self, data: &[u8]) -> Result<usize> {
        self.shared.write_buf(data)
    }
}

impl SerialLink for MockLink {
    fn open(&self, client: Arc<dyn LinkClient>) -> Result<()> {
        let mut state = self.shared.lock();
        if let Some(message) = state.open_failure.take() {
            return Err(HardwareError::communication(message));
        }
        if state.client.is_some() {
            return Err(HardwareError::already_open(&self.shared.name));
        }
        state.client = Some(client);
        state.open_count += 1;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let mut state = self.shared.lock();
        if state.client.take().is_none() {
            return Err(HardwareError::not_open(&self.shared.name));
        }
        // A failed close still detaches the client, like a device that
        // vanished mid-teardown.
        if let Some(message) = state.close_failure.take() {
            return Err(HardwareError::communication(message));
        }
        state.close_count += 1;
        Ok(())
    }

    fn set_baudrate(&self, baud: u32) -> Result<u32> {
        if baud == 0 {
            return Err(HardwareError::configuration("baud rate must be non-zero"));
        }
        self.shared.lock().baud = Some(baud);
        Ok(baud)
    }

    fn set_flow_control(&self, enabled: bool) -> Result<()> {
        self.shared.lock().flow_control = Some(enabled);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.shared.lock().client.is_some()
    }

    fn name(&self) -> &str {
        &self.shared.name
    }
}

/// Handle for driving a mock link.
///
/// The handle can be cloned and shared across threads, e.g. one thread
/// playing the remote device while tests read from the pipeline.
#[derive(Debug, Clone)]
pub struct MockLinkHandle {
    shared: Arc<MockShared>,
}

impl MockLinkHandle {
    /// Deliver `data` to the registered client as one received chunk.
    ///
    /// Returns the number of bytes the client reported as consumed.
    ///
    /// # Errors
    ///
    /// Returns an error if the link is not open.
    pub fn inject(&self, data: &[u8]) -> Result<usize> {
        // The client may write back through the link, so the state lock must
        // not be held across the callback.
        let client = self
            .shared
            .lock()
            .client
            .clone()
            .ok_or_else(|| HardwareError::not_open(&self.shared.name))?;

        Ok(client.receive_buf(self.shared.as_ref(), data))
    }

    /// Signal the client that transmit space became available.
    pub fn wakeup(&self) -> Result<()> {
        let client = self
            .shared
            .lock()
            .client
            .clone()
            .ok_or_else(|| HardwareError::not_open(&self.shared.name))?;
        client.write_wakeup();
        Ok(())
    }

    /// All bytes accepted by the link so far, in order.
    pub fn written(&self) -> Vec<u8> {
        self.shared.lock().written.clone()
    }

    /// Discard the recorded transmit bytes.
    pub fn clear_written(&self) {
        self.shared.lock().written.clear();
    }

    /// Make the next `open` fail with a communication error.
    pub fn fail_next_open(&self, message: impl Into<String>) {
        self.shared.lock().open_failure = Some(message.into());
    }

    /// Make the next `close` report a communication error.
    pub fn fail_next_close(&self, message: impl Into<String>) {
        self.shared.lock().close_failure = Some(message.into());
    }

    /// Make every write fail with a communication error until cleared.
    pub fn fail_writes(&self, message: Option<String>) {
        self.shared.lock().write_failure = message;
    }

    /// Accept at most `limit` bytes per write, simulating a full TX FIFO.
    pub fn set_write_limit(&self, limit: Option<usize>) {
        self.shared.lock().write_limit = limit;
    }

    /// Check whether a client is currently registered.
    pub fn is_open(&self) -> bool {
        self.shared.lock().client.is_some()
    }

    /// Number of successful opens.
    pub fn open_count(&self) -> usize {
        self.shared.lock().open_count
    }

    /// Number of successful closes.
    pub fn close_count(&self) -> usize {
        self.shared.lock().close_count
    }

    /// Last baud rate applied, if any.
    pub fn baudrate(&self) -> Option<u32> {
        self.shared.lock().baud
    }

    /// Last flow control setting applied, if any.
    pub fn flow_control(&self) -> Option<bool> {
        self.shared.lock().flow_control
    }

    /// Get the link name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }
}

#[derive(Debug)]
struct MockShared {
    name: String,
    state: Mutex<MockState>,
}

impl MockShared {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LinkWriter for MockShared {
    fn write_buf(&self, data: &[u8]) -> Result<usize> {
        let mut state = self.lock();
        if state.client.is_none() {
            return Err(HardwareError::not_open(&self.name));
        }
        if let Some(message) = &state.write_failure {
            return Err(HardwareError::communication(message.clone()));
        }
        let accepted = state.write_limit.map_or(data.len(), |limit| data.len().min(limit));
        state.written.extend_from_slice(&data[..accepted]);
        Ok(accepted)
    }
}

#[derive(Default)]
struct MockState {
    client: Option<Arc<dyn LinkClient>>,
    written: Vec<u8>,
    baud: Option<u32>,
    flow_control: Option<bool>,
    open_failure: Option<String>,
    close_failure: Option<String>,
    write_failure: Option<String>,
    write_limit: Option<usize>,
    open_count: usize,
    close_count: usize,
}

impl std::fmt::Debug for MockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockState")
            .field("open", &self.client.is_some())
            .field("written", &self.written.len())
            .field("baud", &self.baud)
            .field("flow_control", &self.flow_control)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recorder {
        received: Mutex<Vec<u8>>,
        wakeups: AtomicUsize,
    }

    impl LinkClient for Recorder {
        fn receive_buf(&self, _link: &dyn LinkWriter, data: &[u8]) -> usize {
            self.received.lock().unwrap().extend_from_slice(data);
            data.len()
        }

        fn write_wakeup(&self) {
            self.wakeups.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_mock_link_inject_reaches_client() {
        let (link, handle) = MockLink::new();
        let recorder = Arc::new(Recorder::default());
        link.open(recorder.clone()).unwrap();

        assert_eq!(handle.inject(b"hello").unwrap(), 5);
        assert_eq!(handle.inject(b" world").unwrap(), 6);

        assert_eq!(recorder.received.lock().unwrap().as_slice(), b"hello world");
    }

    #[test]
    fn test_mock_link_inject_requires_open() {
        let (_link, handle) = MockLink::new();
        let result = handle.inject(b"x");
        assert!(matches!(result, Err(HardwareError::NotOpen { .. })));
    }

    #[test]
    fn test_mock_link_double_open_rejected() {
        let (link, _handle) = MockLink::new();
        link.open(Arc::new(Recorder::default())).unwrap();

        let result = link.open(Arc::new(Recorder::default()));
        assert!(matches!(result, Err(HardwareError::AlreadyOpen { .. })));
    }

    #[test]
    fn test_mock_link_write_records_bytes() {
        let (link, handle) = MockLink::new();
        link.open(Arc::new(Recorder::default())).unwrap();

        assert_eq!(link.write_buf(b"abc").unwrap(), 3);
        assert_eq!(link.write_buf(b"def").unwrap(), 3);
        assert_eq!(handle.written(), b"abcdef");

        handle.clear_written();
        assert!(handle.written().is_empty());
    }

    #[test]
    fn test_mock_link_write_when_closed() {
        let (link, _handle) = MockLink::new();
        assert!(link.write_buf(b"abc").is_err());
    }

    #[test]
    fn test_mock_link_write_limit() {
        let (link, handle) = MockLink::new();
        link.open(Arc::new(Recorder::default())).unwrap();
        handle.set_write_limit(Some(2));

        assert_eq!(link.write_buf(b"abcd").unwrap(), 2);
        assert_eq!(handle.written(), b"ab");
    }

    #[test]
    fn test_mock_link_scripted_failures() {
        let (link, handle) = MockLink::new();

        handle.fail_next_open("port busy");
        assert!(link.open(Arc::new(Recorder::default())).is_err());
        assert!(!handle.is_open());

        // The failure is consumed by the first attempt
        link.open(Arc::new(Recorder::default())).unwrap();

        handle.fail_writes(Some("line break".to_string()));
        assert!(matches!(
            link.write_buf(b"x"),
            Err(HardwareError::CommunicationError { .. })
        ));

        handle.fail_writes(None);
        assert_eq!(link.write_buf(b"x").unwrap(), 1);
    }

    #[test]
    fn test_mock_link_close() {
        let (link, handle) = MockLink::new();
        link.open(Arc::new(Recorder::default())).unwrap();
        assert!(link.is_open());

        link.close().unwrap();
        assert!(!link.is_open());
        assert_eq!(handle.open_count(), 1);
        assert_eq!(handle.close_count(), 1);

        // Closing twice reports the link as not open
        assert!(link.close().is_err());
    }

    #[test]
    fn test_mock_link_failed_close_detaches_client() {
        let (link, handle) = MockLink::new();
        link.open(Arc::new(Recorder::default())).unwrap();
        handle.fail_next_close("device removed");

        assert!(link.close().is_err());
        assert!(!handle.is_open());
        assert_eq!(handle.close_count(), 0);
    }

    #[test]
    fn test_mock_link_configuration() {
        let (link, handle) = MockLink::with_name("uart3".to_string());
        assert_eq!(link.name(), "uart3");
        assert_eq!(handle.name(), "uart3");

        assert_eq!(handle.baudrate(), None);
        assert_eq!(link.set_baudrate(9600).unwrap(), 9600);
        assert_eq!(handle.baudrate(), Some(9600));
        assert!(link.set_baudrate(0).is_err());

        link.set_flow_control(false).unwrap();
        assert_eq!(handle.flow_control(), Some(false));
    }

    #[test]
    fn test_mock_link_wakeup() {
        let (link, handle) = MockLink::new();
        let recorder = Arc::new(Recorder::default());
        link.open(recorder.clone()).unwrap();

        handle.wakeup().unwrap();
        assert_eq!(recorder.wakeups.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_mock_link_handle_clone_across_threads() {
        let (link, handle) = MockLink::new();
        let recorder = Arc::new(Recorder::default());
        link.open(recorder.clone()).unwrap();

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let handle = handle.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        handle.inject(b"x").unwrap();
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(recorder.received.lock().unwrap().len(), 400);
    }
}
