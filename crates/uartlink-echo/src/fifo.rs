//! Bounded receive FIFO.
//!
//! [`ByteFifo`] is a fixed-capacity ring of bytes shared between the receive
//! path (producer) and the stream endpoint and inspector (consumers). Every
//! operation runs under one short mutex critical section that never waits on
//! anything else, so the producer can call [`ByteFifo::append`] from its
//! time-sensitive context.
//!
//! # Overflow Policy
//!
//! When a chunk does not fit, the leading bytes that fit are stored and the
//! rest is dropped. Bytes already buffered are never evicted. Dropped bytes
//! are only counted:
//!
//! ```
//! use uartlink_echo::ByteFifo;
//!
//! let fifo = ByteFifo::with_capacity(4).unwrap();
//! assert_eq!(fifo.append(b"abcdef"), 4);
//! assert_eq!(fifo.overflow_count(), 2);
//! assert_eq!(&fifo.take(16)[..], b"abcd");
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::{Bytes, BytesMut};

use crate::error::{EchoError, Result};

/// Point-in-time counters of a [`ByteFifo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FifoStats {
    /// Fixed capacity in bytes.
    pub capacity: usize,

    /// Bytes currently buffered.
    pub stored: usize,

    /// Total bytes dropped because the FIFO was full.
    pub overflow_count: u64,
}

/// Fixed-capacity FIFO byte store with overflow accounting.
#[derive(Debug)]
pub struct ByteFifo {
    capacity: usize,
    ring: Mutex<Ring>,
}

#[derive(Debug)]
struct Ring {
    buf: Box<[u8]>,
    /// Read cursor: index of the oldest buffered byte.
    head: usize,
    len: usize,
    overflow: u64,
}

impl ByteFifo {
    /// Allocate a FIFO holding at most `capacity` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EchoError::AllocationFailure`] if the storage cannot be
    /// allocated or `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(EchoError::allocation(capacity));
        }

        let mut storage = Vec::new();
        storage
            .try_reserve_exact(capacity)
            .map_err(|_| EchoError::allocation(capacity))?;
        storage.resize(capacity, 0);

        Ok(Self {
            capacity,
            ring: Mutex::new(Ring {
                buf: storage.into_boxed_slice(),
                head: 0,
                len: 0,
                overflow: 0,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Ring> {
        // The ring is consistent after every statement that mutates it, so
        // a panic elsewhere while holding the lock leaves usable data.
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store as many leading bytes of `data` as fit and drop the rest.
    ///
    /// Returns the number of bytes stored. Never blocks beyond the critical
    /// section and never evicts buffered bytes.
    pub fn append(&self, data: &[u8]) -> usize {
        let mut ring = self.lock();
        let stored = data.len().min(self.capacity - ring.len);

        let tail = (ring.head + ring.len) % self.capacity;
        let first = stored.min(self.capacity - tail);
        ring.buf[tail..tail + first].copy_from_slice(&data[..first]);
        ring.buf[..stored - first].copy_from_slice(&data[first..stored]);

        ring.len += stored;
        ring.overflow += (data.len() - stored) as u64;
        stored
    }

    /// Remove and return up to `max_len` bytes in arrival order.
    ///
    /// Returns an empty buffer if nothing is stored.
    pub fn take(&self, max_len: usize) -> Bytes {
        let mut ring = self.lock();
        let out = ring.copy_front(self.capacity, max_len);
        ring.head = (ring.head + out.len()) % self.capacity;
        ring.len -= out.len();
        if ring.len == 0 {
            ring.head = 0;
        }
        out
    }

    /// Return up to `max_len` leading bytes without consuming them.
    pub fn peek(&self, max_len: usize) -> Bytes {
        self.lock().copy_front(self.capacity, max_len)
    }

    /// Return the stored byte count together with up to `max_len` leading
    /// bytes, both read under the same critical section.
    pub fn preview(&self, max_len: usize) -> (usize, Bytes) {
        let ring = self.lock();
        (ring.len, ring.copy_front(self.capacity, max_len))
    }

    /// Check whether no bytes are stored.
    pub fn is_empty(&self) -> bool {
        self.lock().len == 0
    }

    /// Number of bytes currently stored.
    pub fn len(&self) -> usize {
        self.lock().len
    }

    /// Fixed capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total bytes dropped on overflow since creation.
    pub fn overflow_count(&self) -> u64 {
        self.lock().overflow
    }

    /// Capacity, stored count and overflow total, read together.
    pub fn stats(&self) -> FifoStats {
        let ring = self.lock();
        FifoStats {
            capacity: self.capacity,
            stored: ring.len,
            overflow_count: ring.overflow,
        }
    }
}

impl Ring {
    fn copy_front(&self, capacity: usize, max_len: usize) -> Bytes {
        let n = self.len.min(max_len);
        if n == 0 {
            return Bytes::new();
        }

        let first = n.min(capacity - self.head);
        let mut out = BytesMut::with_capacity(n);
        out.extend_from_slice(&self.buf[self.head..self.head + first]);
        out.extend_from_slice(&self.buf[..n - first]);
        out.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_new_fifo_is_empty() {
        let fifo = ByteFifo::with_capacity(4096).unwrap();
        assert!(fifo.is_empty());
        assert_eq!(fifo.len(), 0);
        assert_eq!(fifo.capacity(), 4096);
        assert_eq!(fifo.overflow_count(), 0);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = ByteFifo::with_capacity(0);
        assert!(matches!(result, Err(EchoError::AllocationFailure { .. })));
    }

    #[test]
    fn test_append_then_take_3000_bytes() {
        let fifo = ByteFifo::with_capacity(4096).unwrap();
        let data = pattern(3000);

        assert_eq!(fifo.append(&data), 3000);
        let out = fifo.take(3000);

        assert_eq!(&out[..], &data[..]);
        assert_eq!(fifo.len(), 0);
        assert!(fifo.is_empty());
    }

    #[test]
    fn test_single_oversized_chunk() {
        let fifo = ByteFifo::with_capacity(4096).unwrap();
        let data = pattern(5000);

        assert_eq!(fifo.append(&data), 4096);
        assert_eq!(fifo.len(), 4096);
        assert_eq!(fifo.overflow_count(), 904);

        // The leading bytes are the ones kept
        assert_eq!(&fifo.take(4096)[..], &data[..4096]);
    }

    #[test]
    fn test_full_fifo_keeps_old_bytes() {
        let fifo = ByteFifo::with_capacity(8).unwrap();
        fifo.append(b"01234567");

        assert_eq!(fifo.append(b"89"), 0);
        assert_eq!(fifo.overflow_count(), 2);
        assert_eq!(&fifo.take(8)[..], b"01234567");
    }

    #[test]
    fn test_overflow_count_accumulates() {
        let fifo = ByteFifo::with_capacity(4).unwrap();
        fifo.append(b"abc");
        fifo.append(b"def");
        fifo.append(b"gh");

        assert_eq!(fifo.overflow_count(), 4);
        assert_eq!(&fifo.take(4)[..], b"abcd");

        // Draining does not reset the counter
        assert_eq!(fifo.overflow_count(), 4);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(5, 5)]
    #[case(10, 10)]
    #[case(100, 10)]
    fn test_take_bounded_by_max_len(#[case] max_len: usize, #[case] expected: usize) {
        let fifo = ByteFifo::with_capacity(64).unwrap();
        fifo.append(&pattern(10));

        assert_eq!(fifo.take(max_len).len(), expected);
        assert_eq!(fifo.len(), 10 - expected);
    }

    #[test]
    fn test_take_from_empty_returns_empty() {
        let fifo = ByteFifo::with_capacity(16).unwrap();
        assert!(fifo.take(16).is_empty());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let fifo = ByteFifo::with_capacity(16).unwrap();
        fifo.append(b"hello world");

        assert_eq!(&fifo.peek(5)[..], b"hello");
        assert_eq!(&fifo.peek(5)[..], b"hello");
        assert_eq!(fifo.len(), 11);
        assert_eq!(&fifo.take(11)[..], b"hello world");
    }

    #[test]
    fn test_preview_reports_total() {
        let fifo = ByteFifo::with_capacity(64).unwrap();
        fifo.append(&pattern(40));

        let (total, head) = fifo.preview(32);
        assert_eq!(total, 40);
        assert_eq!(&head[..], &pattern(40)[..32]);
        assert_eq!(fifo.len(), 40);
    }

    #[test]
    fn test_wraparound_preserves_order() {
        let fifo = ByteFifo::with_capacity(8).unwrap();

        fifo.append(b"abcdef");
        assert_eq!(&fifo.take(4)[..], b"abcd");

        // Write cursor wraps past the end of storage
        assert_eq!(fifo.append(b"ghijkl"), 6);
        assert_eq!(fifo.len(), 8);
        assert_eq!(&fifo.peek(8)[..], b"efghijkl");
        assert_eq!(&fifo.take(3)[..], b"efg");
        assert_eq!(&fifo.take(8)[..], b"hijkl");
        assert!(fifo.is_empty());
    }

    #[test]
    fn test_stats_snapshot() {
        let fifo = ByteFifo::with_capacity(4).unwrap();
        fifo.append(b"abcdef");

        assert_eq!(
            fifo.stats(),
            FifoStats {
                capacity: 4,
                stored: 4,
                overflow_count: 2,
            }
        );
    }

    #[test]
    fn test_concurrent_producers_and_consumer() {
        use std::sync::Arc;

        let fifo = Arc::new(ByteFifo::with_capacity(256).unwrap());
        let producers: Vec<_> = (0..4)
            .map(|_| {
                let fifo = Arc::clone(&fifo);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        fifo.append(&[0xAA; 7]);
                    }
                })
            })
            .collect();

        let mut drained = 0usize;
        while producers.iter().any(|p| !p.is_finished()) {
            drained += fifo.take(64).len();
        }
        for producer in producers {
            producer.join().unwrap();
        }
        drained += fifo.take(usize::MAX).len();

        // Every byte is either delivered or counted as dropped
        assert_eq!(drained as u64 + fifo.overflow_count(), 4 * 1000 * 7);
    }
}
