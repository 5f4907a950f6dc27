/*!
 * Reference Wrappers
 *
 * Strong, weak and phantom handles with identity-based equality
 */

use crate::core::{RegistrationId, ReferenceKind};
use crate::reclaim::ReclaimHandle;
use parking_lot::Mutex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// What a wrapper currently holds
enum Slot<T: ?Sized> {
    /// Owning handle, keeps the target alive
    Strong(Arc<T>),
    /// Non-owning handle, weak or phantom
    Handle(Weak<T>),
    Released,
}

pub(crate) struct ReferenceInner<T: ?Sized> {
    id: RegistrationId,
    kind: ReferenceKind,
    identity: usize,
    // holds the allocation so `identity` is never handed to another target
    _pin: Weak<T>,
    slot: Mutex<Slot<T>>,
    cleared: AtomicBool,
}

/// Handle to a target object with a declared reachability strength
///
/// Cloning a `Reference` clones the handle, not the wrapper: clones share the
/// same registration and the same cleared state. A monitor only runs the
/// cleanup of a caller-held wrapper while at least one clone is alive.
///
/// Equality and hashing use the kind and the identity of the target
/// allocation, never its value, and stay stable after `clear()`. A wrapper
/// keeps the target's allocation (not the value) reserved while any clone is
/// alive, so a freed address is never reused by a target it would match.
pub struct Reference<T: ?Sized> {
    inner: Arc<ReferenceInner<T>>,
}

#[inline]
fn identity_of<T: ?Sized>(target: &Arc<T>) -> usize {
    Arc::as_ptr(target) as *const () as usize
}

impl<T: ?Sized> Reference<T> {
    /// Wrapper owning the target
    pub(crate) fn strong(target: Arc<T>) -> Self {
        let identity = identity_of(&target);
        let pin = Arc::downgrade(&target);
        Self::from_slot(ReferenceKind::Strong, identity, pin, Slot::Strong(target))
    }

    /// Non-owning wrapper of the given kind
    pub(crate) fn watching(kind: ReferenceKind, target: &Arc<T>) -> Self {
        debug_assert!(!kind.is_strong());
        Self::from_slot(
            kind,
            identity_of(target),
            Arc::downgrade(target),
            Slot::Handle(Arc::downgrade(target)),
        )
    }

    fn from_slot(kind: ReferenceKind, identity: usize, pin: Weak<T>, slot: Slot<T>) -> Self {
        Self {
            inner: Arc::new(ReferenceInner {
                id: RegistrationId::next(),
                kind,
                identity,
                _pin: pin,
                slot: Mutex::new(slot),
                cleared: AtomicBool::new(false),
            }),
        }
    }

    /// Get the target if it is still available
    ///
    /// - Strong: always the target, until cleared.
    /// - Weak: the target until its last strong handle is dropped.
    /// - Phantom: the target while it is still strongly reachable; absent once
    ///   unreachable or once the monitor cleared it before running the cleanup.
    pub fn get(&self) -> Option<Arc<T>> {
        match &*self.inner.slot.lock() {
            Slot::Strong(target) => Some(Arc::clone(target)),
            Slot::Handle(handle) => handle.upgrade(),
            Slot::Released => None,
        }
    }

    /// Release the held handle. Idempotent.
    ///
    /// On a strong wrapper this drops the owning handle, so the target may be
    /// reclaimed. On a registered weak or phantom wrapper it detaches the
    /// registration: the cleanup will not run.
    pub fn clear(&self) {
        self.inner.release();
    }

    /// Whether `clear()` was called, by the caller or by a monitor
    pub fn is_cleared(&self) -> bool {
        self.inner.cleared.load(Ordering::Acquire)
    }

    pub fn kind(&self) -> ReferenceKind {
        self.inner.kind
    }

    /// Registration slot of this wrapper instance
    pub fn id(&self) -> RegistrationId {
        self.inner.id
    }

    /// Whether both wrappers are handles to the same wrapper instance
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether this wrapper points at the given target allocation
    pub fn refers_to(&self, target: &Arc<T>) -> bool {
        self.inner.identity == identity_of(target)
    }

    pub(crate) fn downgrade_handle(&self) -> Weak<dyn ReclaimHandle>
    where
        T: Send + Sync + 'static,
    {
        let erased: Arc<dyn ReclaimHandle> = self.erased();
        Arc::downgrade(&erased)
    }

    pub(crate) fn erased(&self) -> Arc<dyn ReclaimHandle>
    where
        T: Send + Sync + 'static,
    {
        self.inner.clone()
    }
}

impl<T: ?Sized> ReferenceInner<T> {
    fn release(&self) {
        let released = {
            let mut slot = self.slot.lock();
            self.cleared.store(true, Ordering::Release);
            std::mem::replace(&mut *slot, Slot::Released)
        };
        // the target's destructor may run here, outside the lock
        drop(released);
    }
}

impl<T: ?Sized + Send + Sync> ReclaimHandle for ReferenceInner<T> {
    fn id(&self) -> RegistrationId {
        self.id
    }

    fn kind(&self) -> ReferenceKind {
        self.kind
    }

    fn is_cleared(&self) -> bool {
        self.cleared.load(Ordering::Acquire)
    }

    fn is_target_reclaimed(&self) -> bool {
        match &*self.slot.lock() {
            Slot::Handle(handle) => handle.strong_count() == 0,
            Slot::Strong(_) | Slot::Released => false,
        }
    }

    fn clear(&self) {
        self.release();
    }
}

impl<T: ?Sized> Clone for Reference<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: ?Sized> PartialEq for Reference<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.kind == other.inner.kind && self.inner.identity == other.inner.identity
    }
}

impl<T: ?Sized> Eq for Reference<T> {}

impl<T: ?Sized> Hash for Reference<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.kind.hash(state);
        self.inner.identity.hash(state);
    }
}

impl<T: ?Sized> fmt::Debug for Reference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("identity", &format_args!("{:#x}", self.inner.identity))
            .field("cleared", &self.is_cleared())
            .finish()
    }
}
