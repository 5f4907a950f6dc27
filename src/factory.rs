/*!
 * Factory
 * Public entry points for monitors and strong references
 */

use crate::core::{MonitorConfig, MonitorError, MonitorResult};
use crate::monitor::{BackgroundMonitor, ForegroundMonitor};
use crate::references::{Reference, Referent};

/// Monitor that runs cleanups on the caller's thread during registration calls
///
/// Only use this where spawning background threads is not allowed.
pub fn foreground_monitor() -> ForegroundMonitor {
    ForegroundMonitor::new()
}

/// Equivalent to `background_monitor(1)`
pub fn default_background_monitor() -> MonitorResult<BackgroundMonitor> {
    background_monitor(1)
}

/// Monitor that runs cleanups on `workers` background threads
///
/// Fails with `InvalidArgument` when `workers` is 0.
pub fn background_monitor(workers: usize) -> MonitorResult<BackgroundMonitor> {
    BackgroundMonitor::new(workers)
}

pub fn background_monitor_with_config(config: MonitorConfig) -> MonitorResult<BackgroundMonitor> {
    BackgroundMonitor::with_config(config)
}

/// Strong reference to `referent`
///
/// Behaves like a plain `Arc` but shares the `Reference` type with weak and
/// phantom wrappers, so code supporting several reference strengths can hold
/// all of them uniformly. Two strong references to the same allocation are
/// equal and hash alike.
pub fn strong_reference<T, R>(referent: R) -> MonitorResult<Reference<T>>
where
    T: ?Sized,
    R: Referent<T>,
{
    referent
        .into_target()
        .map(Reference::strong)
        .ok_or_else(|| MonitorError::invalid_argument("referent is absent"))
}
