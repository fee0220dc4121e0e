//! The first-fit block pool.
//!
//! [`MemoryPool`] owns an ordered list of [`Block`]s. Requests are served
//! by scanning that list in order and leasing the first free block that is
//! large enough. When nothing fits, a block of exactly the requested size
//! is appended. Blocks are never shrunk, split or removed before teardown.
//!
//! ```text
//! MemoryPool
//! ├── Block[] (pool order: pre-allocated size classes, then growth)
//! ├── counters (total / used / peak bytes, lease and misuse counts)
//! └── DiagnosticLog (bounded misuse history, also sent to tracing)
//! ```
//!
//! The scan is linear first-fit: a block larger than needed
//! may be chosen, and the whole block is charged to `used_bytes`.

use larder_core::{
    BlockHandle, Diagnostic, DiagnosticLog, Inspect, Leak, LeakReport, PoolError, PoolId,
};

use crate::block::Block;
use crate::config::PoolConfig;
use crate::stats::PoolStats;
use crate::status::{BlockStatus, PoolStatus};

/// Outcome of a successful [`MemoryPool::deallocate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Release {
    /// The handle whose lease ended.
    pub handle: BlockHandle,
    /// Capacity of the released block.
    pub size: usize,
    /// Lessee recorded at allocation.
    pub owner: String,
    /// Whether the releasing caller differed from `owner`.
    pub ownership_mismatch: bool,
}

/// A pool of reusable byte blocks with lease tracking.
///
/// Single-threaded: every mutating operation takes `&mut self`. The pool
/// is `Send`, so callers that need sharing can wrap it in their own lock.
pub struct MemoryPool {
    id: PoolId,
    config: PoolConfig,
    blocks: Vec<Block>,
    total_bytes: usize,
    used_bytes: usize,
    peak_bytes: usize,
    allocations: u64,
    deallocations: u64,
    bytes_leased: u64,
    growth_events: u64,
    double_frees: u64,
    untracked_frees: u64,
    ownership_mismatches: u64,
    diagnostics: DiagnosticLog,
    /// Set once the teardown report has run.
    torn_down: bool,
}

impl MemoryPool {
    /// Create a pool with the default size classes.
    pub fn new() -> Self {
        Self::build(PoolConfig::default())
    }

    /// Create a pool from a custom config.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Config` if the config fails validation.
    pub fn with_config(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: PoolConfig) -> Self {
        let id = PoolId::next();
        let mut blocks = Vec::new();
        let mut total_bytes = 0usize;
        for class in &config.size_classes {
            for _ in 0..class.count {
                match Block::try_new(class.block_size) {
                    Ok(block) => {
                        total_bytes += block.size();
                        blocks.push(block);
                    }
                    Err(e) => {
                        tracing::warn!(
                            pool = %id,
                            size = class.block_size,
                            error = %e,
                            "failed to pre-allocate block"
                        );
                    }
                }
            }
        }
        tracing::info!(
            pool = %id,
            blocks = blocks.len(),
            bytes = total_bytes,
            "memory pool initialized"
        );
        let diagnostics = DiagnosticLog::new(config.diagnostic_history);
        Self {
            id,
            config,
            blocks,
            total_bytes,
            used_bytes: 0,
            peak_bytes: 0,
            allocations: 0,
            deallocations: 0,
            bytes_leased: 0,
            growth_events: 0,
            double_frees: 0,
            untracked_frees: 0,
            ownership_mismatches: 0,
            diagnostics,
            torn_down: false,
        }
    }

    /// Lease a block of at least `requested_size` bytes to `requester`.
    ///
    /// Scans blocks in pool order and takes the first free one whose size
    /// is at least `requested_size`. If none fits, appends a new block of
    /// exactly `requested_size`. The leased block is zero-filled.
    ///
    /// # Errors
    ///
    /// - `InvalidSize` for a zero-byte request.
    /// - `OutOfMemory` if a new block could not be reserved. The pool is
    ///   unchanged in that case.
    pub fn allocate(
        &mut self,
        requested_size: usize,
        requester: &str,
    ) -> Result<BlockHandle, PoolError> {
        if requested_size == 0 {
            return Err(self.refuse(PoolError::InvalidSize {
                requester: requester.to_string(),
            }));
        }

        if let Some(index) = self.blocks.iter().position(|b| b.fits(requested_size)) {
            return Ok(self.lease(index, requester));
        }

        // Handles address blocks by u32 index.
        if self.blocks.len() >= u32::MAX as usize {
            return Err(self.out_of_memory(requested_size, requester));
        }
        let block = match Block::try_new(requested_size) {
            Ok(block) => block,
            Err(_) => return Err(self.out_of_memory(requested_size, requester)),
        };
        self.blocks.push(block);
        self.total_bytes += requested_size;
        self.growth_events += 1;
        tracing::debug!(
            pool = %self.id,
            size = requested_size,
            %requester,
            "no suitable block found, created new block"
        );
        Ok(self.lease(self.blocks.len() - 1, requester))
    }

    fn lease(&mut self, index: usize, requester: &str) -> BlockHandle {
        let block = &mut self.blocks[index];
        let generation = block.lease(requester);
        let size = block.size();
        self.used_bytes += size;
        self.peak_bytes = self.peak_bytes.max(self.used_bytes);
        self.allocations += 1;
        self.bytes_leased += size as u64;
        let handle = BlockHandle::new(self.id, index as u32, generation);
        tracing::debug!(
            pool = %self.id,
            block = %handle,
            size,
            %requester,
            "allocated block"
        );
        handle
    }

    fn out_of_memory(&mut self, requested: usize, requester: &str) -> PoolError {
        self.diagnostics.record(
            self.id,
            Diagnostic::OutOfMemory {
                requested,
                requester: requester.to_string(),
            },
        );
        PoolError::OutOfMemory { requested }
    }

    /// Record the diagnostic for a refused operation and hand the error back.
    fn refuse(&mut self, error: PoolError) -> PoolError {
        match &error {
            PoolError::DoubleFree { .. } => self.double_frees += 1,
            PoolError::UntrackedMemory { .. } => self.untracked_frees += 1,
            _ => {}
        }
        if let Some(diagnostic) = Diagnostic::from_error(&error) {
            self.diagnostics.record(self.id, diagnostic);
        }
        error
    }

    /// End the lease named by `handle`.
    ///
    /// Pass `None` to model a null handle. A release by someone other
    /// than the lessee is logged as an ownership mismatch but still goes
    /// ahead. Released blocks are overwritten with the configured release
    /// fill byte.
    ///
    /// # Errors
    ///
    /// None of these change pool state:
    /// - `NullHandle` when `handle` is `None`.
    /// - `UntrackedMemory` when the handle was not issued by this pool.
    /// - `DoubleFree` when the handle's lease has already ended, including
    ///   when the block has since been leased again.
    pub fn deallocate(
        &mut self,
        handle: impl Into<Option<BlockHandle>>,
        requester: &str,
    ) -> Result<Release, PoolError> {
        let Some(handle) = handle.into() else {
            return Err(self.refuse(PoolError::NullHandle {
                requester: requester.to_string(),
            }));
        };
        let Some(index) = self.index_of(handle) else {
            return Err(self.refuse(PoolError::UntrackedMemory {
                handle,
                requester: requester.to_string(),
            }));
        };

        let block = &self.blocks[index];
        if !block.in_use() || block.generation() != handle.generation() {
            return Err(self.refuse(PoolError::DoubleFree {
                handle,
                requester: requester.to_string(),
            }));
        }

        let owner = block.owner().to_string();
        let ownership_mismatch = owner != requester;
        if ownership_mismatch {
            self.ownership_mismatches += 1;
            self.diagnostics.record(
                self.id,
                Diagnostic::OwnershipMismatch {
                    handle,
                    owner: owner.clone(),
                    requester: requester.to_string(),
                },
            );
        }

        let size = self.blocks[index].release(self.config.release_fill);
        self.used_bytes -= size;
        self.deallocations += 1;
        tracing::debug!(
            pool = %self.id,
            block = %handle,
            size,
            %requester,
            "deallocated block"
        );
        Ok(Release {
            handle,
            size,
            owner,
            ownership_mismatch,
        })
    }

    /// Block index for a handle issued by this pool, if in range.
    fn index_of(&self, handle: BlockHandle) -> Option<usize> {
        let index = handle.index() as usize;
        (handle.pool() == self.id && index < self.blocks.len()).then_some(index)
    }

    /// Index of the block behind a live lease.
    fn live_index(&self, handle: BlockHandle) -> Result<usize, PoolError> {
        let index = self
            .index_of(handle)
            .ok_or_else(|| PoolError::UntrackedMemory {
                handle,
                requester: String::new(),
            })?;
        let block = &self.blocks[index];
        if !block.in_use() || block.generation() != handle.generation() {
            return Err(PoolError::StaleHandle {
                handle,
                current_generation: block.generation(),
            });
        }
        Ok(index)
    }

    /// Read the memory of a live lease. The slice spans the whole block.
    ///
    /// # Errors
    ///
    /// `UntrackedMemory` for a foreign handle, `StaleHandle` once the
    /// lease has ended.
    pub fn block(&self, handle: BlockHandle) -> Result<&[u8], PoolError> {
        let index = self.live_index(handle)?;
        Ok(self.blocks[index].bytes())
    }

    /// Write access to the memory of a live lease.
    ///
    /// # Errors
    ///
    /// Same as [`block`](Self::block).
    pub fn block_mut(&mut self, handle: BlockHandle) -> Result<&mut [u8], PoolError> {
        let index = self.live_index(handle)?;
        Ok(self.blocks[index].bytes_mut())
    }

    /// Every block still leased, in pool order.
    pub fn report_leaks(&self) -> LeakReport {
        let leaks = self
            .blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.in_use())
            .map(|(index, b)| Leak {
                handle: BlockHandle::new(self.id, index as u32, b.generation()),
                address: b.address(),
                size: b.size(),
                owner: Some(b.owner().to_string()),
                kind: None,
                age: b.age().unwrap_or_default(),
            })
            .collect();
        LeakReport::new(self.id, leaks)
    }

    /// Snapshot of the aggregate counters.
    pub fn report_statistics(&self) -> PoolStats {
        PoolStats {
            total_bytes: self.total_bytes,
            used_bytes: self.used_bytes,
            peak_bytes: self.peak_bytes,
            active_count: self.blocks.iter().filter(|b| b.in_use()).count(),
            block_count: self.blocks.len(),
            allocations: self.allocations,
            deallocations: self.deallocations,
            bytes_leased: self.bytes_leased,
            growth_events: self.growth_events,
            double_frees: self.double_frees,
            untracked_frees: self.untracked_frees,
            ownership_mismatches: self.ownership_mismatches,
        }
    }

    /// Per-block view of the pool.
    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            pool: self.id,
            total_bytes: self.total_bytes,
            used_bytes: self.used_bytes,
            blocks: self
                .blocks
                .iter()
                .enumerate()
                .map(|(index, b)| BlockStatus {
                    index,
                    size: b.size(),
                    owner: b.in_use().then(|| b.owner().to_string()),
                    address: b.address(),
                })
                .collect(),
        }
    }

    /// Recompute derived counters from the blocks and compare.
    ///
    /// # Errors
    ///
    /// `AccountingMismatch` if a byte counter drifted, `CorruptState` if a
    /// per-block invariant is broken.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.deallocations > self.allocations {
            return Err(PoolError::CorruptState {
                reason: format!(
                    "{} deallocations exceed {} allocations",
                    self.deallocations, self.allocations
                ),
            });
        }
        let mut used = 0usize;
        let mut total = 0usize;
        for (index, block) in self.blocks.iter().enumerate() {
            total += block.size();
            if block.in_use() {
                used += block.size();
            } else if !block.owner().is_empty() {
                return Err(PoolError::CorruptState {
                    reason: format!("free block {index} still names owner '{}'", block.owner()),
                });
            }
        }
        if used != self.used_bytes {
            return Err(PoolError::AccountingMismatch {
                recorded: self.used_bytes,
                computed: used,
            });
        }
        if total != self.total_bytes {
            return Err(PoolError::AccountingMismatch {
                recorded: self.total_bytes,
                computed: total,
            });
        }
        Ok(())
    }

    /// Report leaks and release every block.
    ///
    /// Returns the leak report instead of only logging it. Dropping the
    /// pool afterwards does not report again.
    pub fn shutdown(mut self) -> LeakReport {
        self.teardown()
    }

    fn teardown(&mut self) -> LeakReport {
        tracing::info!(pool = %self.id, "destroying memory pool");
        let report = self.report_leaks();
        report.log();
        let cleaned = self.blocks.len();
        self.blocks.clear();
        self.total_bytes = 0;
        self.used_bytes = 0;
        self.torn_down = true;
        tracing::info!(pool = %self.id, blocks = cleaned, "memory pool destroyed");
        report
    }

    /// Identity of this pool.
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// The config the pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Number of blocks owned by the pool.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Blocks in pool order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Sum of all block sizes.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Sum of leased block sizes.
    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    /// Highest `used_bytes` observed.
    pub fn peak_bytes(&self) -> usize {
        self.peak_bytes
    }

    /// Misuse history.
    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }
}

impl Default for MemoryPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MemoryPool {
    fn drop(&mut self) {
        if !self.torn_down {
            self.teardown();
        }
    }
}

impl Inspect for MemoryPool {
    fn id(&self) -> PoolId {
        self.id
    }

    fn report_leaks(&self) -> LeakReport {
        MemoryPool::report_leaks(self)
    }

    fn validate(&self) -> Result<(), PoolError> {
        MemoryPool::validate(self)
    }

    fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }
}
