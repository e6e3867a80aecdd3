//! Availability accounting across the lifetime of the monitor

use serde::Serialize;
use std::sync::RwLock;

#[derive(Debug, Default)]
struct Counters {
    total: u64,
    succeeded: u64,
}

/// Point-in-time view of the availability counters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AvailabilitySnapshot {
    pub probes_total: u64,
    pub probes_succeeded: u64,
    pub availability_percent: f64,
}

/// Tracks probe outcomes and derives the availability percentage.
///
/// Both counters live under one lock so a snapshot always observes a
/// consistent pair.
#[derive(Debug, Default)]
pub struct AvailabilityTracker {
    counters: RwLock<Counters>,
}

impl AvailabilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one probe outcome.
    pub fn record(&self, success: bool) {
        let mut counters = self.counters.write().unwrap_or_else(|e| e.into_inner());
        counters.total += 1;
        if success {
            counters.succeeded += 1;
        }
    }

    /// Snapshot the counters and the derived percentage.
    pub fn snapshot(&self) -> AvailabilitySnapshot {
        let counters = self.counters.read().unwrap_or_else(|e| e.into_inner());
        AvailabilitySnapshot {
            probes_total: counters.total,
            probes_succeeded: counters.succeeded,
            availability_percent: percent(counters.succeeded, counters.total),
        }
    }

    pub fn availability_percent(&self) -> f64 {
        self.snapshot().availability_percent
    }
}

/// Availability as a percentage, defined as 0.0 before any probe has run.
fn percent(succeeded: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (succeeded as f64 / total as f64) * 100.0
}
