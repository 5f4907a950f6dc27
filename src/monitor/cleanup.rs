/*!
 * Cleanup Actions
 *
 * Boxed cleanup commands with contained failure
 */

use crate::core::{MonitorError, MonitorResult};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

type Action = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

/// A cleanup command, run at most once
///
/// Built from any `FnOnce() + Send + 'static` closure, or from a fallible
/// closure with [`Cleanup::fallible`]. Cleanups must not capture a strong
/// handle to their own target, or the target never becomes unreachable.
pub struct Cleanup {
    // locked only to make the table shareable across threads
    action: Mutex<Action>,
}

impl Cleanup {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::from_action(Box::new(move || -> anyhow::Result<()> {
            f();
            Ok(())
        }))
    }

    /// Cleanup whose error is reported as a `CleanupFailure`
    pub fn fallible<F, E>(f: F) -> Self
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: Into<anyhow::Error>,
    {
        Self::from_action(Box::new(move || -> anyhow::Result<()> {
            f().map_err(Into::into)
        }))
    }

    fn from_action(action: Action) -> Self {
        Self {
            action: Mutex::new(action),
        }
    }

    /// Run the cleanup, converting errors and panics into `CleanupFailure`
    pub fn run(self) -> MonitorResult<()> {
        let action = self.action.into_inner();
        match panic::catch_unwind(AssertUnwindSafe(action)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(MonitorError::cleanup_failure(format!("{:#}", e))),
            Err(payload) => Err(MonitorError::cleanup_failure(format!(
                "panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cleanup").finish_non_exhaustive()
    }
}

/// Values accepted as a cleanup argument
///
/// `None` stands for an absent cleanup and is rejected with `InvalidArgument`.
pub trait IntoCleanup {
    fn into_cleanup(self) -> Option<Cleanup>;
}

impl<F> IntoCleanup for F
where
    F: FnOnce() + Send + 'static,
{
    #[inline]
    fn into_cleanup(self) -> Option<Cleanup> {
        Some(Cleanup::new(self))
    }
}

impl IntoCleanup for Cleanup {
    #[inline]
    fn into_cleanup(self) -> Option<Cleanup> {
        Some(self)
    }
}

impl IntoCleanup for Option<Cleanup> {
    #[inline]
    fn into_cleanup(self) -> Option<Cleanup> {
        self
    }
}
