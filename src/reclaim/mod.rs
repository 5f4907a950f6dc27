/*!
 * Reclamation Primitive
 *
 * Watches weak and phantom handles and deposits them on a notification
 * channel once their targets lose the last strong handle.
 *
 * ## Memory Model
 *
 * Targets are reference counted (`Arc`). A handle is ready once
 * `Weak::strong_count()` reaches zero. Nothing pushes that transition to us,
 * so reclamation happens in explicit passes (`collect`): the foreground
 * monitor runs one on every registration, the background monitor runs one on
 * a timer, and callers may force one at any time.
 *
 * Within one pass weak handles are deposited before phantom handles. That is
 * the only ordering the channel carries; delivery across passes and across
 * handles is otherwise unspecified.
 */

mod watch;

pub(crate) use watch::{Watch, WatchHandle, WatchStatus};

use crate::core::{RegistrationId, ReferenceKind};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

/// Reclamation view of a reference wrapper
pub(crate) trait ReclaimHandle: Send + Sync {
    fn id(&self) -> RegistrationId;

    fn kind(&self) -> ReferenceKind;

    /// Cleared explicitly, before or after delivery
    fn is_cleared(&self) -> bool;

    /// The reachability condition for this handle holds
    fn is_target_reclaimed(&self) -> bool;

    fn clear(&self);
}

/// A handle whose target became unreachable
pub(crate) struct Notification {
    handle: Arc<dyn ReclaimHandle>,
}

impl Notification {
    #[inline]
    pub fn id(&self) -> RegistrationId {
        self.handle.id()
    }

    #[inline]
    pub fn kind(&self) -> ReferenceKind {
        self.handle.kind()
    }

    /// Detach the wrapper so `get()` reports absent from now on
    #[inline]
    pub fn clear(&self) {
        self.handle.clear();
    }
}

/// Result of one reclamation pass
#[derive(Debug, Default)]
pub(crate) struct CollectOutcome {
    /// Handles deposited on the channel
    pub enqueued: usize,
    /// Handles dropped by their owner or cleared before reclamation
    pub abandoned: Vec<RegistrationId>,
}

/// Watch list plus notification channel
pub(crate) struct Reclaimer {
    watches: Mutex<Vec<Watch>>,
    sender: Mutex<Option<flume::Sender<Notification>>>,
    receiver: flume::Receiver<Notification>,
}

impl Reclaimer {
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            watches: Mutex::new(Vec::new()),
            sender: Mutex::new(Some(sender)),
            receiver,
        }
    }

    /// Watch a handle until its reachability condition holds
    ///
    /// Returns `false` once the reclaimer is closed.
    pub fn enqueue_on_reclaim(&self, id: RegistrationId, kind: ReferenceKind, handle: WatchHandle) -> bool {
        if self.is_closed() {
            return false;
        }
        self.watches.lock().push(Watch::new(id, kind, handle));
        true
    }

    /// Stop watching a handle. Returns whether it was still watched.
    pub fn clear_handle(&self, id: RegistrationId) -> bool {
        let removed = {
            let mut watches = self.watches.lock();
            watches
                .iter()
                .position(|watch| watch.id() == id)
                .map(|index| watches.swap_remove(index))
        };
        removed.is_some()
    }

    /// Run one reclamation pass
    ///
    /// The watch list is taken out of its lock for the scan and the pending
    /// watches are merged back afterwards, so registrations are not blocked
    /// while a pass is running. A pass still costs time linear in the number
    /// of watched handles.
    pub fn collect(&self) -> CollectOutcome {
        let mut outcome = CollectOutcome::default();
        let mut ready = Vec::new();
        let mut released = Vec::new();

        let scanned = std::mem::take(&mut *self.watches.lock());
        let mut pending = Vec::with_capacity(scanned.len());
        for watch in scanned {
            match watch.status() {
                WatchStatus::Pending => pending.push(watch),
                WatchStatus::Ready(handle) => {
                    ready.push(handle);
                    released.push(watch);
                }
                WatchStatus::Abandoned => {
                    trace!(id = %watch.id(), kind = %watch.kind(), "watch abandoned before reclamation");
                    outcome.abandoned.push(watch.id());
                    released.push(watch);
                }
            }
        }

        if !pending.is_empty() {
            let mut watches = self.watches.lock();
            // a close during the scan already forgot these
            if !self.is_closed() {
                watches.append(&mut pending);
            }
        }
        drop(released);

        if ready.is_empty() {
            return outcome;
        }

        // weak before phantom
        ready.sort_by_key(|handle| handle.kind());

        let sender = self.sender.lock().clone();
        let Some(sender) = sender else {
            return outcome;
        };
        for handle in ready {
            if sender.send(Notification { handle }).is_ok() {
                outcome.enqueued += 1;
            }
        }

        outcome
    }

    /// Take one notification without blocking
    pub fn try_next(&self) -> Option<Notification> {
        self.receiver.try_recv().ok()
    }

    /// Additional consumer of the notification channel
    pub fn subscribe(&self) -> flume::Receiver<Notification> {
        self.receiver.clone()
    }

    /// Stop accepting watches, forget pending ones and disconnect the channel
    ///
    /// Notifications already deposited stay receivable until drained.
    /// Returns the number of watches dropped.
    pub fn close(&self) -> usize {
        let sender = self.sender.lock().take();
        drop(sender);
        let watches = std::mem::take(&mut *self.watches.lock());
        watches.len()
    }

    /// Discard every deposited notification
    pub fn discard_queued(&self) -> usize {
        self.receiver.drain().count()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Number of handles still being watched
    pub fn watched(&self) -> usize {
        self.watches.lock().len()
    }

    /// Number of notifications waiting to be drained
    pub fn queued(&self) -> usize {
        self.receiver.len()
    }
}
