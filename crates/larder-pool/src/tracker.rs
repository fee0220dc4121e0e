//! Instrumented general-purpose allocator.
//!
//! [`AllocationTracker`] is an explicit allocator object: code that wants
//! its allocations counted holds a tracker and calls it directly, rather
//! than having a process-wide hook intercept every allocation. Each
//! allocation is its own exactly-sized buffer. The tracker records what
//! is live, how it was declared ([`AllocKind`]) and when it was made.
//!
//! Slots are recycled through a free list. Every reuse bumps the slot's
//! generation, so a handle to a released allocation never resolves to
//! whatever later occupies the same slot.

use std::fmt;
use std::time::Instant;

use larder_core::{
    AllocKind, BlockHandle, Diagnostic, DiagnosticLog, Inspect, Leak, LeakReport, PoolError,
    PoolId,
};

/// Default number of diagnostics a tracker retains.
const DEFAULT_DIAGNOSTIC_HISTORY: usize = 256;

struct Entry {
    data: Vec<u8>,
    kind: AllocKind,
    allocated_at: Instant,
}

struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

fn lost_entry(index: usize) -> PoolError {
    PoolError::CorruptState {
        reason: format!("slot {index} resolved live but holds no allocation"),
    }
}

/// Outcome of a successful [`AllocationTracker::deallocate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackedRelease {
    /// The released handle.
    pub handle: BlockHandle,
    /// Bytes returned.
    pub size: usize,
    /// Kind declared at allocation.
    pub kind: AllocKind,
    /// Whether the release declared a different kind.
    pub kind_mismatch: bool,
}

/// Running counters of an [`AllocationTracker`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackerStats {
    /// Successful allocations.
    pub total_allocations: u64,
    /// Successful deallocations.
    pub total_deallocations: u64,
    /// Bytes currently allocated.
    pub current_bytes: usize,
    /// Highest `current_bytes` observed.
    pub peak_bytes: usize,
    /// Bytes ever allocated.
    pub total_bytes_allocated: u64,
    /// Allocations currently live.
    pub active_allocations: usize,
    /// Releases whose declared kind differed from the allocation.
    pub kind_mismatches: u64,
    /// Releases of handles the tracker does not know.
    pub untracked_frees: u64,
}

impl TrackerStats {
    /// Mean allocation size. Zero before the first allocation.
    pub fn average_allocation_size(&self) -> f64 {
        if self.total_allocations == 0 {
            return 0.0;
        }
        self.total_bytes_allocated as f64 / self.total_allocations as f64
    }
}

impl fmt::Display for TrackerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Memory Usage Statistics ===")?;
        writeln!(f, "Total allocations: {}", self.total_allocations)?;
        writeln!(f, "Total deallocations: {}", self.total_deallocations)?;
        writeln!(f, "Current allocated bytes: {}", self.current_bytes)?;
        writeln!(f, "Peak allocated bytes: {}", self.peak_bytes)?;
        writeln!(f, "Total bytes ever allocated: {}", self.total_bytes_allocated)?;
        writeln!(f, "Active allocations: {}", self.active_allocations)?;
        if self.total_allocations > 0 {
            writeln!(
                f,
                "Average allocation size: {:.2} bytes",
                self.average_allocation_size()
            )?;
        }
        Ok(())
    }
}

/// Allocator object that counts and audits every allocation made through it.
pub struct AllocationTracker {
    id: PoolId,
    name: String,
    slots: Vec<Slot>,
    /// Indices of empty slots available for reuse.
    free_list: Vec<usize>,
    stats: TrackerStats,
    diagnostics: DiagnosticLog,
    torn_down: bool,
}

impl AllocationTracker {
    /// Create a tracker. `name` labels its log events and errors.
    pub fn new(name: impl Into<String>) -> Self {
        let id = PoolId::next();
        let name = name.into();
        tracing::info!(pool = %id, %name, "allocation tracker started");
        Self {
            id,
            name,
            slots: Vec::new(),
            free_list: Vec::new(),
            stats: TrackerStats::default(),
            diagnostics: DiagnosticLog::new(DEFAULT_DIAGNOSTIC_HISTORY),
            torn_down: false,
        }
    }

    /// Allocate `size` zeroed bytes declared as `kind`.
    ///
    /// # Errors
    ///
    /// `InvalidSize` for zero bytes, `OutOfMemory` if the reservation fails.
    pub fn allocate(&mut self, size: usize, kind: AllocKind) -> Result<BlockHandle, PoolError> {
        if size == 0 {
            let error = PoolError::InvalidSize {
                requester: self.name.clone(),
            };
            self.note(&error);
            return Err(error);
        }
        let mut data = Vec::new();
        if data.try_reserve_exact(size).is_err() {
            return Err(self.out_of_memory(size));
        }
        data.resize(size, 0);

        let entry = Entry {
            data,
            kind,
            allocated_at: Instant::now(),
        };
        let index = match self.free_list.pop() {
            Some(index) => index,
            None => {
                // Handles address slots by u32 index.
                if self.slots.len() >= u32::MAX as usize {
                    return Err(self.out_of_memory(size));
                }
                self.slots.push(Slot {
                    generation: 0,
                    entry: None,
                });
                self.slots.len() - 1
            }
        };
        let slot = &mut self.slots[index];
        slot.generation = slot.generation.wrapping_add(1);
        slot.entry = Some(entry);
        let handle = BlockHandle::new(self.id, index as u32, slot.generation);

        self.stats.total_allocations += 1;
        self.stats.current_bytes += size;
        self.stats.total_bytes_allocated += size as u64;
        self.stats.active_allocations += 1;
        self.stats.peak_bytes = self.stats.peak_bytes.max(self.stats.current_bytes);
        tracing::debug!(pool = %self.id, block = %handle, size, %kind, "ALLOC");
        Ok(handle)
    }

    /// Allocate `size` bytes declared as an array.
    ///
    /// # Errors
    ///
    /// Same as [`allocate`](Self::allocate).
    pub fn allocate_array(&mut self, size: usize) -> Result<BlockHandle, PoolError> {
        self.allocate(size, AllocKind::Array)
    }

    /// Release an allocation, declaring it as `kind`.
    ///
    /// A kind that differs from the allocation is logged and flagged in
    /// the result; the memory is released regardless.
    ///
    /// # Errors
    ///
    /// `NullHandle` for `None`; `UntrackedMemory` for a handle this tracker
    /// did not issue or has already released. State is unchanged.
    pub fn deallocate(
        &mut self,
        handle: impl Into<Option<BlockHandle>>,
        kind: AllocKind,
    ) -> Result<TrackedRelease, PoolError> {
        let Some(handle) = handle.into() else {
            let error = PoolError::NullHandle {
                requester: self.name.clone(),
            };
            self.note(&error);
            return Err(error);
        };
        let Some(index) = self.live_index(handle) else {
            let error = PoolError::UntrackedMemory {
                handle,
                requester: self.name.clone(),
            };
            self.stats.untracked_frees += 1;
            self.note(&error);
            return Err(error);
        };

        let Some(entry) = self.slots[index].entry.take() else {
            return Err(lost_entry(index));
        };
        self.free_list.push(index);

        let kind_mismatch = entry.kind != kind;
        if kind_mismatch {
            self.stats.kind_mismatches += 1;
            self.diagnostics.record(
                self.id,
                Diagnostic::KindMismatch {
                    handle,
                    allocated: entry.kind,
                    released: kind,
                },
            );
        }

        let size = entry.data.len();
        self.stats.total_deallocations += 1;
        self.stats.current_bytes -= size;
        self.stats.active_allocations -= 1;
        tracing::debug!(pool = %self.id, block = %handle, size, %kind, "DEALLOC");
        Ok(TrackedRelease {
            handle,
            size,
            kind: entry.kind,
            kind_mismatch,
        })
    }

    /// Release an allocation declared as an array.
    ///
    /// # Errors
    ///
    /// Same as [`deallocate`](Self::deallocate).
    pub fn deallocate_array(
        &mut self,
        handle: impl Into<Option<BlockHandle>>,
    ) -> Result<TrackedRelease, PoolError> {
        self.deallocate(handle, AllocKind::Array)
    }

    fn out_of_memory(&mut self, requested: usize) -> PoolError {
        self.diagnostics.record(
            self.id,
            Diagnostic::OutOfMemory {
                requested,
                requester: self.name.clone(),
            },
        );
        PoolError::OutOfMemory { requested }
    }

    fn note(&mut self, error: &PoolError) {
        if let Some(diagnostic) = Diagnostic::from_error(error) {
            self.diagnostics.record(self.id, diagnostic);
        }
    }

    fn live_index(&self, handle: BlockHandle) -> Option<usize> {
        if handle.pool() != self.id {
            return None;
        }
        let index = handle.index() as usize;
        let slot = self.slots.get(index)?;
        (slot.entry.is_some() && slot.generation == handle.generation()).then_some(index)
    }

    fn access_error(&self, handle: BlockHandle) -> PoolError {
        match self.slots.get(handle.index() as usize) {
            Some(slot) if handle.pool() == self.id => PoolError::StaleHandle {
                handle,
                current_generation: slot.generation,
            },
            _ => PoolError::UntrackedMemory {
                handle,
                requester: self.name.clone(),
            },
        }
    }

    /// Read a live allocation.
    ///
    /// # Errors
    ///
    /// `StaleHandle` once released, `UntrackedMemory` for a foreign handle.
    pub fn get(&self, handle: BlockHandle) -> Result<&[u8], PoolError> {
        let Some(index) = self.live_index(handle) else {
            return Err(self.access_error(handle));
        };
        self.slots[index]
            .entry
            .as_ref()
            .map(|e| e.data.as_slice())
            .ok_or_else(|| lost_entry(index))
    }

    /// Write to a live allocation.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn get_mut(&mut self, handle: BlockHandle) -> Result<&mut [u8], PoolError> {
        let Some(index) = self.live_index(handle) else {
            return Err(self.access_error(handle));
        };
        self.slots[index]
            .entry
            .as_mut()
            .map(|e| e.data.as_mut_slice())
            .ok_or_else(|| lost_entry(index))
    }

    /// Every live allocation, ordered by slot index.
    pub fn report_leaks(&self) -> LeakReport {
        let leaks = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let entry = slot.entry.as_ref()?;
                Some(Leak {
                    handle: BlockHandle::new(self.id, index as u32, slot.generation),
                    address: entry.data.as_ptr() as usize,
                    size: entry.data.len(),
                    owner: None,
                    kind: Some(entry.kind),
                    age: entry.allocated_at.elapsed(),
                })
            })
            .collect();
        LeakReport::new(self.id, leaks)
    }

    /// Current counters.
    pub fn stats(&self) -> &TrackerStats {
        &self.stats
    }

    /// Recompute live bytes and counts from the slots and compare.
    ///
    /// # Errors
    ///
    /// `CorruptState` or `AccountingMismatch` on disagreement.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.stats.total_deallocations > self.stats.total_allocations {
            return Err(PoolError::CorruptState {
                reason: format!(
                    "{} deallocations exceed {} allocations",
                    self.stats.total_deallocations, self.stats.total_allocations
                ),
            });
        }
        let live = self.slots.iter().filter_map(|s| s.entry.as_ref());
        let (count, bytes) = live.fold((0usize, 0usize), |(c, b), e| (c + 1, b + e.data.len()));
        if count != self.stats.active_allocations {
            return Err(PoolError::CorruptState {
                reason: format!(
                    "{count} live slots but {} active allocations recorded",
                    self.stats.active_allocations
                ),
            });
        }
        if bytes != self.stats.current_bytes {
            return Err(PoolError::AccountingMismatch {
                recorded: self.stats.current_bytes,
                computed: bytes,
            });
        }
        Ok(())
    }

    /// Report leaks and statistics, then release everything.
    pub fn shutdown(mut self) -> LeakReport {
        self.teardown()
    }

    fn teardown(&mut self) -> LeakReport {
        tracing::info!(pool = %self.id, name = %self.name, "allocation tracker shutting down");
        let report = self.report_leaks();
        report.log();
        tracing::info!(
            pool = %self.id,
            allocations = self.stats.total_allocations,
            deallocations = self.stats.total_deallocations,
            peak_bytes = self.stats.peak_bytes,
            total_bytes = self.stats.total_bytes_allocated,
            "final memory report"
        );
        self.slots.clear();
        self.free_list.clear();
        self.torn_down = true;
        report
    }

    /// Identity of this tracker.
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// Label given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Misuse history.
    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }
}

impl Drop for AllocationTracker {
    fn drop(&mut self) {
        if !self.torn_down {
            self.teardown();
        }
    }
}

impl Inspect for AllocationTracker {
    fn id(&self) -> PoolId {
        self.id
    }

    fn report_leaks(&self) -> LeakReport {
        AllocationTracker::report_leaks(self)
    }

    fn validate(&self) -> Result<(), PoolError> {
        AllocationTracker::validate(self)
    }

    fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }
}
