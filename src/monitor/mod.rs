/*!
 * Reachability Monitors
 *
 * Run cleanup commands after objects become weakly reachable or completely
 * unreachable.
 *
 * ## Strategies
 *
 * - **ForegroundMonitor**: reclamation and cleanup happen on the caller's
 *   thread, during the next registration call. No threads are spawned.
 * - **BackgroundMonitor**: a reclamation thread scans on a timer and a fixed
 *   pool of workers runs cleanups.
 *
 * ## Weakly Reachable vs. Unreachable
 *
 * With reference-counted targets both conditions mean "the last strong handle
 * was dropped". The difference left is ordering: within one reclamation pass
 * every weak notification is delivered before any phantom notification, and a
 * phantom wrapper is cleared before its cleanup runs.
 *
 * ## Returned Wrappers
 *
 * `weak_reference` and `phantom_reference` hand the wrapper to the caller. The
 * cleanup only runs while the caller keeps at least one clone of it; dropping
 * or clearing the wrapper first cancels the cleanup. This suits collections
 * whose internal bookkeeping only needs cleaning while the collection itself
 * is alive.
 */

mod background;
mod cleanup;
mod shared;
mod foreground;
mod registry;
mod stats;

pub use self::background::BackgroundMonitor;
pub use self::cleanup::{Cleanup, IntoCleanup};
pub use self::shared::MonitorState;
pub use self::foreground::ForegroundMonitor;
pub use self::stats::MonitorStatsSnapshot;

use crate::core::MonitorResult;
use crate::references::{Reference, Referent};

/// Common surface of both monitor strategies
///
/// Every registration fails with `InvalidArgument` when the target or the
/// cleanup is absent, without recording anything. After shutdown,
/// registrations are accepted but inert.
pub trait ReachabilityMonitor {
    /// Run `cleanup` once no strong handle to `target` remains
    fn when_weakly_reachable<T, R, C>(&self, target: R, cleanup: C) -> MonitorResult<()>
    where
        T: ?Sized + Send + Sync + 'static,
        R: Referent<T>,
        C: IntoCleanup;

    /// Run `cleanup` once no handle of any kind to `target` remains
    fn when_unreachable<T, R, C>(&self, target: R, cleanup: C) -> MonitorResult<()>
    where
        T: ?Sized + Send + Sync + 'static,
        R: Referent<T>,
        C: IntoCleanup;

    /// Weak wrapper whose `cleanup` runs once the referent is weakly reachable
    ///
    /// If every clone of the wrapper is dropped first, the cleanup never runs.
    fn weak_reference<T, R, C>(&self, referent: R, cleanup: C) -> MonitorResult<Reference<T>>
    where
        T: ?Sized + Send + Sync + 'static,
        R: Referent<T>,
        C: IntoCleanup;

    /// Phantom wrapper whose `cleanup` runs once the referent is unreachable
    ///
    /// Unlike a raw phantom handle, `get()` returns the referent while it is
    /// still strongly reachable. The wrapper is cleared before the cleanup
    /// runs. If every clone of the wrapper is dropped first, the cleanup never
    /// runs.
    fn phantom_reference<T, R, C>(&self, referent: R, cleanup: C) -> MonitorResult<Reference<T>>
    where
        T: ?Sized + Send + Sync + 'static,
        R: Referent<T>,
        C: IntoCleanup;

    /// Stop the monitor; cleanups that have not started will never run. Idempotent.
    fn request_shutdown(&self);

    /// Force a reclamation pass; returns the number of notifications deposited
    fn collect(&self) -> usize;

    fn state(&self) -> MonitorState;

    fn is_shut_down(&self) -> bool {
        self.state() != MonitorState::Active
    }

    /// Cleanups registered and not yet run or dropped
    fn pending_cleanups(&self) -> usize;

    fn stats(&self) -> MonitorStatsSnapshot;
}
