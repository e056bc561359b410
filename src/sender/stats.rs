//! stats.rs
//! Contention-free counters for the sender pipeline.
//!
//! Producer side (`try_send`) and drain side only ever `fetch_add` with relaxed
//! ordering: no locks, no allocation, safe from the real-time callback.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct SendStats {
    enqueued: AtomicU64,
    dropped_full: AtomicU64,
    discarded_no_endpoint: AtomicU64,
    encode_failures: AtomicU64,
    transport_failures: AtomicU64,
    datagrams_sent: AtomicU64,
    bytes_sent: AtomicU64,
}

/// Point-in-time copy of [`SendStats`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub enqueued: u64,
    pub dropped_full: u64,
    pub discarded_no_endpoint: u64,
    pub encode_failures: u64,
    pub transport_failures: u64,
    pub datagrams_sent: u64,
    pub bytes_sent: u64,
}

impl SendStats {
    #[inline]
    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped_full(&self) {
        self.dropped_full.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_no_endpoint(&self) {
        self.discarded_no_endpoint.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_encode_failure(&self) {
        self.encode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_failure(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self, bytes: usize) {
        self.datagrams_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped_full: self.dropped_full.load(Ordering::Relaxed),
            discarded_no_endpoint: self.discarded_no_endpoint.load(Ordering::Relaxed),
            encode_failures: self.encode_failures.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            datagrams_sent: self.datagrams_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_records() {
        let stats = SendStats::default();
        stats.record_enqueued();
        stats.record_enqueued();
        stats.record_dropped_full();
        stats.record_sent(48);
        stats.record_sent(16);

        let snap = stats.snapshot();
        assert_eq!(snap.enqueued, 2);
        assert_eq!(snap.dropped_full, 1);
        assert_eq!(snap.datagrams_sent, 2);
        assert_eq!(snap.bytes_sent, 64);
        assert_eq!(snap.transport_failures, 0);
    }
}
