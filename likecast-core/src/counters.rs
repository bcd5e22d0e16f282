//! Running totals of dispatch work, reported by the health endpoint.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct DispatchCounters {
    events_queued: AtomicU64,
    events_dropped: AtomicU64,
    events_dispatched: AtomicU64,
    snapshot_failures: AtomicU64,
    likes_sent: AtomicU64,
    like_failures: AtomicU64,
    refreshes: AtomicU64,
    refresh_failures: AtomicU64,
}

/// Point-in-time copy of [`DispatchCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CountersSnapshot {
    pub events_queued: u64,
    pub events_dropped: u64,
    pub events_dispatched: u64,
    pub snapshot_failures: u64,
    pub likes_sent: u64,
    pub like_failures: u64,
    pub refreshes: u64,
    pub refresh_failures: u64,
}

impl DispatchCounters {
    pub fn event_queued(&self) {
        self.events_queued.fetch_add(1, Ordering::Relaxed);
    }

    /// The dispatcher queue was full and the event was discarded.
    pub fn event_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn event_dispatched(&self) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot_failed(&self) {
        self.snapshot_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn like_sent(&self) {
        self.likes_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn like_failed(&self) {
        self.like_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn refreshed(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn refresh_failed(&self) {
        self.refresh_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            events_queued: self.events_queued.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            snapshot_failures: self.snapshot_failures.load(Ordering::Relaxed),
            likes_sent: self.likes_sent.load(Ordering::Relaxed),
            like_failures: self.like_failures.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            refresh_failures: self.refresh_failures.load(Ordering::Relaxed),
        }
    }
}
