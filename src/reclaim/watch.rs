/*!
 * Watches
 * One watched handle and its reachability status
 */

use super::ReclaimHandle;
use crate::core::{RegistrationId, ReferenceKind};
use std::sync::{Arc, Weak};

/// How the reclaimer holds a watched wrapper
pub(crate) enum WatchHandle {
    /// The monitor owns the wrapper (`when_*` registrations)
    Owned(Arc<dyn ReclaimHandle>),
    /// The caller owns the wrapper; once every clone is gone the watch is abandoned
    Held(Weak<dyn ReclaimHandle>),
}

pub(crate) enum WatchStatus {
    Pending,
    Ready(Arc<dyn ReclaimHandle>),
    Abandoned,
}

pub(crate) struct Watch {
    id: RegistrationId,
    kind: ReferenceKind,
    handle: WatchHandle,
}

impl Watch {
    pub fn new(id: RegistrationId, kind: ReferenceKind, handle: WatchHandle) -> Self {
        Self { id, kind, handle }
    }

    #[inline]
    pub fn id(&self) -> RegistrationId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    pub fn status(&self) -> WatchStatus {
        let handle = match &self.handle {
            WatchHandle::Owned(handle) => Arc::clone(handle),
            WatchHandle::Held(handle) => match handle.upgrade() {
                Some(handle) => handle,
                None => return WatchStatus::Abandoned,
            },
        };

        if handle.is_cleared() {
            WatchStatus::Abandoned
        } else if handle.is_target_reclaimed() {
            WatchStatus::Ready(handle)
        } else {
            WatchStatus::Pending
        }
    }
}
