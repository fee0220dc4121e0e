//! Block handles and allocation kinds.
//!
//! A [`BlockHandle`] names one lease on one block. It is generation-scoped:
//! every new lease of a block bumps the block's generation, so a handle
//! kept past its `deallocate` is detected in O(1) without any lookup
//! table, and never aliases the block's next lessee.

use std::fmt;

use crate::id::PoolId;

/// Opaque reference to a leased block.
///
/// Handles are plain `Copy` values. Holding one does not keep the block
/// alive; the issuing allocator owns all block memory outright and the
/// handle only identifies which lease a caller is talking about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockHandle {
    pool: PoolId,
    index: u32,
    generation: u32,
}

impl BlockHandle {
    /// Create a new handle.
    ///
    /// Only allocators construct handles; callers receive them from
    /// `allocate` and hand them back unchanged.
    pub fn new(pool: PoolId, index: u32, generation: u32) -> Self {
        Self {
            pool,
            index,
            generation,
        }
    }

    /// The allocator that issued this handle.
    pub fn pool(&self) -> PoolId {
        self.pool
    }

    /// Slot index of the block within its allocator.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Lease generation of the block when this handle was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/block{}@gen{}", self.pool, self.index, self.generation)
    }
}

/// Shape of an allocation as declared by the caller.
///
/// Tracked separately so that an allocation made as an array and released
/// as a single object (or the other way round) can be flagged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AllocKind {
    /// One object.
    Single,
    /// A contiguous run of objects.
    Array,
}

impl fmt::Display for AllocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Array => write!(f, "array"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_return_constructor_values() {
        let pool = PoolId::next();
        let h = BlockHandle::new(pool, 7, 3);
        assert_eq!(h.pool(), pool);
        assert_eq!(h.index(), 7);
        assert_eq!(h.generation(), 3);
    }

    #[test]
    fn generation_distinguishes_leases() {
        let pool = PoolId::next();
        assert_ne!(BlockHandle::new(pool, 0, 1), BlockHandle::new(pool, 0, 2));
    }

    #[test]
    fn display_names_pool_block_and_generation() {
        let pool = PoolId::next();
        let h = BlockHandle::new(pool, 4, 9);
        assert_eq!(h.to_string(), format!("{pool}/block4@gen9"));
    }

    #[test]
    fn kind_display() {
        assert_eq!(AllocKind::Single.to_string(), "single");
        assert_eq!(AllocKind::Array.to_string(), "array");
    }
}
