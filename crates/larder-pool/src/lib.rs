//! Tracked allocators for Larder.
//!
//! Two allocators share the handle, error and diagnostic vocabulary of
//! `larder-core`:
//!
//! ```text
//! MemoryPool (first-fit, reusable blocks)
//! ├── PoolConfig → SizeClass[] pre-allocated at construction
//! ├── Block[] leased by handle, grown on demand, never shrunk
//! └── PoolStats / PoolStatus / LeakReport on request
//!
//! AllocationTracker (exact-size buffers, instrumented)
//! ├── slots + free list, generation bumped on every reuse
//! └── TrackerStats / LeakReport, kind mismatches diagnosed
//! ```
//!
//! Both report outstanding allocations when shut down or dropped.
//!
//! ```
//! use larder_pool::MemoryPool;
//!
//! let mut pool = MemoryPool::new();
//! let handle = pool.allocate(100, "parser").unwrap();
//! pool.block_mut(handle).unwrap()[0] = 7;
//! pool.deallocate(handle, "parser").unwrap();
//! assert!(pool.shutdown().is_empty());
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod block;
pub mod config;
pub mod pool;
pub mod stats;
pub mod status;
pub mod tracker;

pub use block::Block;
pub use config::{PoolConfig, SizeClass};
pub use pool::{MemoryPool, Release};
pub use stats::PoolStats;
pub use status::{BlockStatus, PoolStatus};
pub use tracker::{AllocationTracker, TrackedRelease, TrackerStats};

pub use larder_core::{
    AllocKind, BlockHandle, ConfigError, Diagnostic, DiagnosticLog, Inspect, Leak, LeakReport,
    PoolError, PoolId, Severity,
};
