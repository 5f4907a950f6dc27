/*!
 * Serde Helpers
 * Skip predicates for compact serialized snapshots
 */

/// Skip serializing if value is zero
pub fn is_zero_u64(value: &u64) -> bool {
    *value == 0
}
