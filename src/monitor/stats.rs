/*!
 * Monitor Statistics
 * Lock-free counters with a serializable snapshot
 */

use crate::core::serde::is_zero_u64;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of a monitor's counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonitorStatsSnapshot {
    /// Cleanups accepted into the registration table
    pub registered: u64,
    /// Notifications deposited by reclamation passes
    pub enqueued: u64,
    /// Cleanups that ran to completion
    pub cleanups_run: u64,
    /// Cleanups that returned an error or panicked
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub cleanups_failed: u64,
    /// Entries removed because their wrapper was dropped or cleared first
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub evicted: u64,
    /// Notifications that found no entry (shutdown races)
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub discarded: u64,
    /// Entries dropped unrun at shutdown
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub invalidated: u64,
    /// Cleanups still waiting for their target
    pub pending: u64,
    /// Handles still watched by the reclaimer
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub watched: u64,
    /// Notifications deposited but not yet drained
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub queued: u64,
}

impl MonitorStatsSnapshot {
    /// Cleanups that were invoked, successful or not
    pub fn cleanups_invoked(&self) -> u64 {
        self.cleanups_run + self.cleanups_failed
    }

    /// Fraction of invoked cleanups that failed
    pub fn failure_rate(&self) -> f64 {
        let invoked = self.cleanups_invoked();
        if invoked == 0 {
            0.0
        } else {
            self.cleanups_failed as f64 / invoked as f64
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct MonitorStats {
    registered: AtomicU64,
    enqueued: AtomicU64,
    cleanups_run: AtomicU64,
    cleanups_failed: AtomicU64,
    evicted: AtomicU64,
    discarded: AtomicU64,
    invalidated: AtomicU64,
}

impl MonitorStats {
    #[inline]
    pub fn record_registered(&self) {
        self.registered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_enqueued(&self, count: usize) {
        self.enqueued.fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_cleanup(&self, succeeded: bool) {
        if succeeded {
            self.cleanups_run.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cleanups_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_evicted(&self) {
        self.evicted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_invalidated(&self, count: usize) {
        self.invalidated.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self, pending: usize) -> MonitorStatsSnapshot {
        MonitorStatsSnapshot {
            registered: self.registered.load(Ordering::Relaxed),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            cleanups_run: self.cleanups_run.load(Ordering::Relaxed),
            cleanups_failed: self.cleanups_failed.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            invalidated: self.invalidated.load(Ordering::Relaxed),
            pending: pending as u64,
            watched: 0,
            queued: 0,
        }
    }
}
