//! Leak reports.
//!
//! A leak is a lease still outstanding when the report is taken. Reports
//! are plain values: allocators build them on demand and again at
//! teardown, where [`LeakReport::log`] sends them through `tracing`.

use std::fmt;
use std::time::Duration;

use crate::handle::{AllocKind, BlockHandle};
use crate::id::PoolId;

/// One outstanding lease.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Leak {
    /// Handle of the outstanding lease.
    pub handle: BlockHandle,
    /// Address of the block's first byte, for display only.
    pub address: usize,
    /// Capacity of the leaked block in bytes.
    pub size: usize,
    /// Lessee label, if the allocator records one.
    pub owner: Option<String>,
    /// Declared allocation kind, if the allocator records one.
    pub kind: Option<AllocKind>,
    /// Time elapsed since the lease started.
    pub age: Duration,
}

impl fmt::Display for Leak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LEAK: {} bytes", self.size)?;
        if let Some(owner) = &self.owner {
            write!(f, " owned by '{owner}'")?;
        }
        if let Some(kind) = self.kind {
            write!(f, " [{kind}]")?;
        }
        write!(
            f,
            " at {:#x} ({}), age {:.3}s",
            self.address,
            self.handle,
            self.age.as_secs_f64()
        )
    }
}

/// All leases outstanding in one allocator at one moment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeakReport {
    pool: PoolId,
    leaks: Vec<Leak>,
}

impl LeakReport {
    /// Create a report for `pool` from its outstanding leases.
    pub fn new(pool: PoolId, leaks: Vec<Leak>) -> Self {
        Self { pool, leaks }
    }

    /// The allocator this report describes.
    pub fn pool(&self) -> PoolId {
        self.pool
    }

    /// Whether no lease is outstanding.
    pub fn is_empty(&self) -> bool {
        self.leaks.is_empty()
    }

    /// Number of outstanding leases.
    pub fn len(&self) -> usize {
        self.leaks.len()
    }

    /// Sum of the sizes of all leaked blocks.
    pub fn total_bytes(&self) -> usize {
        self.leaks.iter().map(|l| l.size).sum()
    }

    /// Iterate over the leaks in allocator order.
    pub fn iter(&self) -> std::slice::Iter<'_, Leak> {
        self.leaks.iter()
    }

    /// The leaks as a slice.
    pub fn leaks(&self) -> &[Leak] {
        &self.leaks
    }

    /// Emit the report through `tracing`: one warning per leak, or a
    /// single info event when there are none.
    pub fn log(&self) {
        let pool = self.pool;
        if self.leaks.is_empty() {
            tracing::info!(%pool, "no memory leaks detected");
            return;
        }
        for leak in &self.leaks {
            tracing::warn!(
                %pool,
                block = %leak.handle,
                size = leak.size,
                owner = leak.owner.as_deref().unwrap_or(""),
                age_ms = leak.age.as_millis() as u64,
                "memory leak"
            );
        }
        tracing::warn!(
            %pool,
            count = self.leaks.len(),
            bytes = self.total_bytes(),
            "memory leaks detected"
        );
    }
}

impl<'a> IntoIterator for &'a LeakReport {
    type Item = &'a Leak;
    type IntoIter = std::slice::Iter<'a, Leak>;

    fn into_iter(self) -> Self::IntoIter {
        self.leaks.iter()
    }
}

impl IntoIterator for LeakReport {
    type Item = Leak;
    type IntoIter = std::vec::IntoIter<Leak>;

    fn into_iter(self) -> Self::IntoIter {
        self.leaks.into_iter()
    }
}

impl fmt::Display for LeakReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Memory Leak Detection ({}) ===", self.pool)?;
        if self.leaks.is_empty() {
            return writeln!(f, "No memory leaks detected");
        }
        for leak in &self.leaks {
            writeln!(f, "{leak}")?;
        }
        writeln!(
            f,
            "Total leaked: {} blocks, {} bytes",
            self.leaks.len(),
            self.total_bytes()
        )
    }
}
