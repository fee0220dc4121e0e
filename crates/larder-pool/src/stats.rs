//! Aggregate counters for the block pool.
//!
//! [`PoolStats`] is a plain snapshot of the pool's counters, taken by
//! [`MemoryPool::report_statistics`](crate::MemoryPool::report_statistics).

use std::fmt;

/// Counters describing a pool at one moment.
///
/// Byte counts are block capacities, not requested sizes: a 100-byte
/// request served by a 256-byte block charges 256 bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Sum of the sizes of all blocks ever added.
    pub total_bytes: usize,
    /// Sum of the sizes of blocks currently leased.
    pub used_bytes: usize,
    /// Highest `used_bytes` ever observed.
    pub peak_bytes: usize,
    /// Number of blocks currently leased.
    pub active_count: usize,
    /// Number of blocks owned by the pool.
    pub block_count: usize,
    /// Successful allocations.
    pub allocations: u64,
    /// Successful deallocations.
    pub deallocations: u64,
    /// Sum of the sizes of every block ever leased.
    pub bytes_leased: u64,
    /// Allocations that had to append a new block.
    pub growth_events: u64,
    /// Releases refused because the lease had already ended.
    pub double_frees: u64,
    /// Releases refused because the handle was not issued by this pool.
    pub untracked_frees: u64,
    /// Releases performed by someone other than the lessee.
    pub ownership_mismatches: u64,
}

impl PoolStats {
    /// Bytes owned by the pool but not currently leased.
    pub fn free_bytes(&self) -> usize {
        self.total_bytes - self.used_bytes
    }

    /// Leased share of the pool, in percent. Zero for an empty pool.
    pub fn utilization(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f64 / self.total_bytes as f64 * 100.0
    }

    /// Mean block size per successful allocation. Zero before the first.
    pub fn average_lease_size(&self) -> f64 {
        if self.allocations == 0 {
            return 0.0;
        }
        self.bytes_leased as f64 / self.allocations as f64
    }
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Memory Usage Statistics ===")?;
        writeln!(f, "Total pool size: {} bytes", self.total_bytes)?;
        writeln!(f, "Used memory: {} bytes", self.used_bytes)?;
        writeln!(f, "Peak used memory: {} bytes", self.peak_bytes)?;
        writeln!(f, "Free memory: {} bytes", self.free_bytes())?;
        writeln!(f, "Memory utilization: {:.1}%", self.utilization())?;
        writeln!(f, "Blocks: {} ({} active)", self.block_count, self.active_count)?;
        writeln!(f, "Total allocations: {}", self.allocations)?;
        writeln!(f, "Total deallocations: {}", self.deallocations)?;
        writeln!(f, "Pool growths: {}", self.growth_events)?;
        if self.allocations > 0 {
            writeln!(
                f,
                "Average allocation size: {:.2} bytes",
                self.average_lease_size()
            )?;
        }
        writeln!(
            f,
            "Misuse: {} double frees, {} untracked frees, {} ownership mismatches",
            self.double_frees, self.untracked_frees, self.ownership_mismatches
        )
    }
}
