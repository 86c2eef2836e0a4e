use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::utils::CachePadded;

/// Tick counters shared between the tick loop and observers.
#[derive(Debug, Default)]
pub struct TickStats {
    counters: CachePadded<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    ticks: AtomicU64,
    presented: AtomicU64,
    skipped_reads: AtomicU64,
    inert: AtomicU64,
}

/// Point-in-time copy of [`TickStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSnapshot {
    pub ticks: u64,
    pub presented: u64,
    pub skipped_reads: u64,
    pub inert: u64,
}

impl TickStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_tick(&self) {
        self.counters.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_presented(&self) {
        self.counters.presented.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped_read(&self) {
        self.counters.skipped_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_inert(&self) {
        self.counters.inert.fetch_add(1, Ordering::Relaxed);
    }

    pub fn presented(&self) -> u64 {
        self.counters.presented.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TickSnapshot {
        TickSnapshot {
            ticks: self.counters.ticks.load(Ordering::Relaxed),
            presented: self.counters.presented.load(Ordering::Relaxed),
            skipped_reads: self.counters.skipped_reads.load(Ordering::Relaxed),
            inert: self.counters.inert.load(Ordering::Relaxed),
        }
    }
}
