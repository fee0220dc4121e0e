//! Fixed-capacity memory blocks.
//!
//! A [`Block`] is one contiguous byte buffer owned by the pool. Its
//! capacity is fixed at creation; the pool only ever flips it between
//! free and leased, or drops it at teardown.

use std::time::{Duration, Instant};

use larder_core::PoolError;

/// One physical memory region owned by the pool.
///
/// Invariant: a free block has an empty owner and no lease timestamp.
pub struct Block {
    /// Backing storage. Allocated to full capacity at creation.
    data: Vec<u8>,
    /// Label of the current lessee; empty while free.
    owner: String,
    in_use: bool,
    /// Bumped on every lease so old handles can be told apart.
    generation: u32,
    leased_at: Option<Instant>,
}

impl Block {
    /// Allocate a zero-initialised block of `size` bytes.
    ///
    /// Returns `OutOfMemory` when the system allocator refuses the
    /// reservation; nothing is left half-built in that case.
    pub(crate) fn try_new(size: usize) -> Result<Self, PoolError> {
        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| PoolError::OutOfMemory { requested: size })?;
        data.resize(size, 0);
        Ok(Self {
            data,
            owner: String::new(),
            in_use: false,
            generation: 0,
            leased_at: None,
        })
    }

    /// Start a lease for `owner` and return the new generation.
    ///
    /// The whole block is zeroed so the lessee never sees bytes left by
    /// a previous lease.
    pub(crate) fn lease(&mut self, owner: &str) -> u32 {
        debug_assert!(!self.in_use, "leasing a block that is already in use");
        self.in_use = true;
        self.owner.clear();
        self.owner.push_str(owner);
        self.generation = self.generation.wrapping_add(1);
        self.leased_at = Some(Instant::now());
        self.data.fill(0);
        self.generation
    }

    /// End the current lease and poison the contents with `fill`.
    ///
    /// Returns the block size so the caller can adjust its counters.
    pub(crate) fn release(&mut self, fill: u8) -> usize {
        debug_assert!(self.in_use, "releasing a free block");
        self.in_use = false;
        self.owner.clear();
        self.leased_at = None;
        self.data.fill(fill);
        self.data.len()
    }

    /// Capacity in bytes. Never changes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Whether a lease is outstanding.
    pub fn in_use(&self) -> bool {
        self.in_use
    }

    /// Whether the block can satisfy a request of `requested` bytes.
    pub fn fits(&self, requested: usize) -> bool {
        !self.in_use && self.data.len() >= requested
    }

    /// Label of the current lessee, or `""` while free.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Lease generation. Zero until the first lease.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Time since the current lease began, if leased.
    pub fn age(&self) -> Option<Duration> {
        self.leased_at.map(|t| t.elapsed())
    }

    /// Address of the first byte, for diagnostics only.
    pub fn address(&self) -> usize {
        self.data.as_ptr() as usize
    }

    /// The block's bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}
