//! Strongly-typed identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique [`PoolId`] allocation.
static POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier for a tracked allocator.
///
/// Allocated from a monotonic atomic counter via [`PoolId::next`]. Every
/// handle carries the id of the allocator that issued it, so a handle
/// presented to a different pool is recognised as untracked instead of
/// aliasing whatever block happens to sit at the same index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(u64);

impl PoolId {
    /// Allocate a fresh, unique pool ID.
    ///
    /// Each call returns a new ID that has never been returned before
    /// within this process. Thread-safe.
    pub fn next() -> Self {
        Self(POOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_is_unique_and_increasing() {
        let a = PoolId::next();
        let b = PoolId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn display_is_prefixed() {
        let id = PoolId::next();
        assert_eq!(id.to_string(), format!("pool#{}", id.get()));
    }
}
