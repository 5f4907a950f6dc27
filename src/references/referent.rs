/*!
 * Referent Arguments
 *
 * Conversions from the handle shapes callers have into a live target
 */

use std::sync::{Arc, Weak};

/// Anything that may resolve to a live `Arc<T>`
///
/// Monitors and the strong-reference factory accept targets through this
/// trait. A value that resolves to `None` (an empty `Option` or a dangling
/// `Weak`) is reported as `InvalidArgument`.
pub trait Referent<T: ?Sized> {
    /// Resolve into an owning handle, or `None` when the target is absent
    fn into_target(self) -> Option<Arc<T>>;
}

impl<T: ?Sized> Referent<T> for Arc<T> {
    #[inline]
    fn into_target(self) -> Option<Arc<T>> {
        Some(self)
    }
}

impl<T: ?Sized> Referent<T> for &Arc<T> {
    #[inline]
    fn into_target(self) -> Option<Arc<T>> {
        Some(Arc::clone(self))
    }
}

impl<T: ?Sized> Referent<T> for &Weak<T> {
    #[inline]
    fn into_target(self) -> Option<Arc<T>> {
        self.upgrade()
    }
}

impl<T: ?Sized> Referent<T> for Option<Arc<T>> {
    #[inline]
    fn into_target(self) -> Option<Arc<T>> {
        self
    }
}

impl<T: ?Sized> Referent<T> for Option<&Arc<T>> {
    #[inline]
    fn into_target(self) -> Option<Arc<T>> {
        self.cloned()
    }
}
