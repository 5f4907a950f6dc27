/*!
 * Core Types
 * Common types used across the monitor
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REGISTRATION_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of one reference wrapper instance
///
/// Every `Reference` gets its own id at construction, so two wrappers over the
/// same target compare equal but still occupy distinct registration slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationId(u64);

impl RegistrationId {
    /// Allocate the next process-unique id
    #[inline]
    pub(crate) fn next() -> Self {
        Self(NEXT_REGISTRATION_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reg-{}", self.0)
    }
}

/// Declared reachability strength of a reference wrapper
///
/// The ordering matters: within one reclamation pass, weak notifications are
/// deposited before phantom ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// Keeps the target alive
    Strong,
    /// Notified once no strong handles remain
    Weak,
    /// Notified once no strong handles remain, after weak notifications
    Phantom,
}

impl ReferenceKind {
    #[inline]
    pub fn is_strong(&self) -> bool {
        matches!(self, ReferenceKind::Strong)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Strong => "strong",
            ReferenceKind::Weak => "weak",
            ReferenceKind::Phantom => "phantom",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
