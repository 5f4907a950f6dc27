/*!
 * Foreground Monitor
 *
 * Cooperative monitor that reclaims and runs cleanups on the caller's thread
 */

use super::cleanup::IntoCleanup;
use super::shared::{MonitorCore, MonitorState, Retention};
use super::stats::MonitorStatsSnapshot;
use super::ReachabilityMonitor;
use crate::core::{MonitorResult, ReferenceKind};
use crate::references::{Reference, Referent};
use tracing::info;

/// Monitor for environments that may not spawn threads
///
/// Cleanups run inside registration calls: every registration first records
/// its own cleanup, then runs a reclamation pass and drains ready cleanups on
/// the calling thread before returning. Cleanup timing is therefore coupled
/// to how often the monitor is called, not to a timer. Call `collect()` to
/// force a pass between registrations.
///
/// Each pass scans every watched handle, so a registration costs time linear
/// in the number of live registrations. Registering `n` long-lived targets
/// is quadratic overall; prefer a `BackgroundMonitor` for large populations.
///
/// After `request_shutdown()` registrations still validate and return
/// wrappers, but no cleanup is recorded for them.
pub struct ForegroundMonitor {
    core: MonitorCore,
}

impl ForegroundMonitor {
    pub fn new() -> Self {
        Self {
            core: MonitorCore::new(),
        }
    }

    fn register_and_drain<T, R, C>(
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
        let reference = self.core.register(kind, target, cleanup, retention)?;
        self.drain();
        Ok(reference)
    }

    /// Reclaim and run ready cleanups inline. Returns the number enqueued.
    fn drain(&self) -> usize {
        if !self.core.is_active() {
            return 0;
        }
        let enqueued = self.core.collect();
        self.core.drain_pending();
        enqueued
    }
}

impl Default for ForegroundMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ReachabilityMonitor for ForegroundMonitor {
    fn when_weakly_reachable<T, R, C>(&self, target: R, cleanup: C) -> MonitorResult<()>
    where
        T: ?Sized + Send + Sync + 'static,
        R: Referent<T>,
        C: IntoCleanup,
    {
        self.register_and_drain(ReferenceKind::Weak, target, cleanup, Retention::Monitor)
            .map(drop)
    }

    fn when_unreachable<T, R, C>(&self, target: R, cleanup: C) -> MonitorResult<()>
    where
        T: ?Sized + Send + Sync + 'static,
        R: Referent<T>,
        C: IntoCleanup,
    {
        self.register_and_drain(ReferenceKind::Phantom, target, cleanup, Retention::Monitor)
            .map(drop)
    }

    fn weak_reference<T, R, C>(&self, referent: R, cleanup: C) -> MonitorResult<Reference<T>>
    where
        T: ?Sized + Send + Sync + 'static,
        R: Referent<T>,
        C: IntoCleanup,
    {
        self.register_and_drain(ReferenceKind::Weak, referent, cleanup, Retention::Caller)
    }

    fn phantom_reference<T, R, C>(&self, referent: R, cleanup: C) -> MonitorResult<Reference<T>>
    where
        T: ?Sized + Send + Sync + 'static,
        R: Referent<T>,
        C: IntoCleanup,
    {
        self.register_and_drain(ReferenceKind::Phantom, referent, cleanup, Retention::Caller)
    }

    fn request_shutdown(&self) {
        if !self.core.transition(MonitorState::Active, MonitorState::ShutDown) {
            return;
        }
        let dropped_watches = self.core.close_reclaimer();
        let invalidated = self.core.invalidate();
        info!(dropped_watches, invalidated, "foreground monitor shut down");
    }

    fn collect(&self) -> usize {
        self.drain()
    }

    fn state(&self) -> MonitorState {
        self.core.state()
    }

    fn pending_cleanups(&self) -> usize {
        self.core.pending_cleanups()
    }

    fn stats(&self) -> MonitorStatsSnapshot {
        self.core.stats()
    }
}
