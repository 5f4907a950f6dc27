/*!
 * Shared Monitor State
 * Registration, reclamation and dispatch shared by both monitor strategies
 */

use super::cleanup::IntoCleanup;
use super::registry::RegistrationTable;
use super::stats::{MonitorStats, MonitorStatsSnapshot};
use crate::core::{MonitorError, MonitorResult, ReferenceKind};
use crate::reclaim::{Notification, Reclaimer, WatchHandle};
use crate::references::{Reference, Referent};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::{debug, trace, warn};

/// Monitor lifecycle
///
/// Foreground monitors go straight from `Active` to `ShutDown`; background
/// monitors pass through `Draining` while workers finish queued notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MonitorState {
    Active = 0,
    Draining = 1,
    ShutDown = 2,
}

impl MonitorState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => MonitorState::Active,
            1 => MonitorState::Draining,
            _ => MonitorState::ShutDown,
        }
    }
}

/// Who keeps the wrapper of a registration alive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Retention {
    /// The monitor keeps it (`when_weakly_reachable`, `when_unreachable`)
    Monitor,
    /// The caller keeps it; dropping every clone cancels the cleanup
    Caller,
}

pub(crate) struct MonitorCore {
    table: RegistrationTable,
    reclaimer: Reclaimer,
    stats: MonitorStats,
    state: AtomicU8,
}

impl MonitorCore {
    pub fn new() -> Self {
        Self {
            table: RegistrationTable::new(),
            reclaimer: Reclaimer::new(),
            stats: MonitorStats::default(),
            state: AtomicU8::new(MonitorState::Active as u8),
        }
    }

    #[inline]
    pub fn state(&self) -> MonitorState {
        MonitorState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state() == MonitorState::Active
    }

    /// Move from `from` to `to`; returns `false` if another transition won
    pub fn transition(&self, from: MonitorState, to: MonitorState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn set_state(&self, state: MonitorState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Validate, wrap, record and watch one registration
    ///
    /// Arguments are checked before any state is touched, so an invalid call
    /// leaves no entry behind. Once the monitor is no longer active the call
    /// is accepted but inert: a wrapper comes back, no cleanup is recorded.
    pub fn register<T, R, C>(
        &self,
        kind: ReferenceKind,
        target: R,
        cleanup: C,
        retention: Retention,
    ) -> MonitorResult<Reference<T>>
    where
        T: ?Sized + Send + Sync + 'static,
        R: Referent<T>,
        C: IntoCleanup,
    {
        let target = target
            .into_target()
            .ok_or_else(|| MonitorError::invalid_argument("target is absent"))?;
        let cleanup = cleanup
            .into_cleanup()
            .ok_or_else(|| MonitorError::invalid_argument("cleanup is absent"))?;

        let reference = Reference::watching(kind, &target);
        drop(target);

        if !self.is_active() {
            debug!(id = %reference.id(), %kind, "monitor is shut down, registration is inert");
            return Ok(reference);
        }

        let id = reference.id();
        self.table.register(id, cleanup);

        let handle = match retention {
            Retention::Monitor => WatchHandle::Owned(reference.erased()),
            Retention::Caller => WatchHandle::Held(reference.downgrade_handle()),
        };
        let watched = self.reclaimer.enqueue_on_reclaim(id, kind, handle);
        if !watched || !self.is_active() {
            // lost a race with shutdown
            if watched {
                self.reclaimer.clear_handle(id);
            }
            self.table.take_if_present(id);
            debug!(%id, %kind, "shutdown raced registration, registration is inert");
            return Ok(reference);
        }

        self.stats.record_registered();
        debug!(%id, %kind, ?retention, "cleanup registered");
        Ok(reference)
    }

    /// Run one reclamation pass; returns the number of notifications deposited
    pub fn collect(&self) -> usize {
        let outcome = self.reclaimer.collect();

        for id in outcome.abandoned {
            if self.table.take_if_present(id).is_some() {
                self.stats.record_evicted();
                trace!(%id, "wrapper dropped or cleared before reclamation, cleanup evicted");
            }
        }

        if outcome.enqueued > 0 {
            self.stats.record_enqueued(outcome.enqueued);
            trace!(count = outcome.enqueued, "notifications enqueued");
        }
        outcome.enqueued
    }

    /// Drain deposited notifications on the calling thread
    pub fn drain_pending(&self) -> usize {
        let mut dispatched = 0;
        while let Some(notification) = self.reclaimer.try_next() {
            if self.dispatch(notification) {
                dispatched += 1;
            }
        }
        dispatched
    }

    /// Clear the wrapper, then run its cleanup if it is still registered
    ///
    /// Failures are contained here and never reach the caller or the worker loop.
    /// Returns whether a cleanup was invoked.
    pub fn dispatch(&self, notification: Notification) -> bool {
        let id = notification.id();
        notification.clear();

        let Some(cleanup) = self.table.take_if_present(id) else {
            self.stats.record_discarded();
            trace!(%id, "notification arrived without a registered cleanup");
            return false;
        };

        match cleanup.run() {
            Ok(()) => {
                self.stats.record_cleanup(true);
                trace!(%id, kind = %notification.kind(), "cleanup completed");
            }
            Err(e) => {
                self.stats.record_cleanup(false);
                warn!(%id, kind = %notification.kind(), error = %e, "cleanup failed");
            }
        }
        true
    }

    /// Stop watching and disconnect the notification channel
    pub fn close_reclaimer(&self) -> usize {
        self.reclaimer.close()
    }

    /// Drop every registered cleanup and every queued notification unrun
    pub fn invalidate(&self) -> usize {
        let removed = self.table.invalidate_all();
        self.stats.record_invalidated(removed);
        let discarded = self.reclaimer.discard_queued();
        if removed > 0 || discarded > 0 {
            debug!(removed, discarded, "registration table invalidated");
        }
        removed
    }

    pub fn subscribe(&self) -> flume::Receiver<Notification> {
        self.reclaimer.subscribe()
    }

    pub fn pending_cleanups(&self) -> usize {
        self.table.len()
    }

    pub fn stats(&self) -> MonitorStatsSnapshot {
        let mut snapshot = self.stats.snapshot(self.table.len());
        snapshot.queued = self.reclaimer.queued() as u64;
        snapshot.watched = self.reclaimer.watched() as u64;
        snapshot
    }
}
