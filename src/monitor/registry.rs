/*!
 * Registration Table
 * Concurrent map from wrapper registrations to their cleanup actions
 */

use super::cleanup::Cleanup;
use crate::core::RegistrationId;
use ahash::RandomState;
use dashmap::DashMap;

/// Thread-safe `RegistrationId -> Cleanup` map
///
/// Every mutation is a single atomic insert, take or bulk removal, so a
/// cleanup can be handed out at most once.
pub(crate) struct RegistrationTable {
    entries: DashMap<RegistrationId, Cleanup, RandomState>,
}

impl RegistrationTable {
    pub fn new() -> Self {
        Self {
            entries: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Insert a cleanup under a freshly allocated id
    pub fn register(&self, id: RegistrationId, cleanup: Cleanup) {
        let previous = self.entries.insert(id, cleanup);
        debug_assert!(previous.is_none(), "registration id {} reused", id);
    }

    /// Remove and return the cleanup if it is still registered
    #[inline]
    pub fn take_if_present(&self, id: RegistrationId) -> Option<Cleanup> {
        self.entries.remove(&id).map(|(_, cleanup)| cleanup)
    }

    /// Drop every entry without running it. Returns the number removed.
    pub fn invalidate_all(&self) -> usize {
        let ids: Vec<RegistrationId> = self.entries.iter().map(|entry| *entry.key()).collect();

        // take one by one so cleanup closures are dropped outside the shard locks
        let mut removed = 0;
        for id in ids {
            if self.take_if_present(id).is_some() {
                removed += 1;
            }
        }

        if removed > 0 {
            self.entries.shrink_to_fit();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
