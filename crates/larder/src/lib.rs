//! Larder: tracked memory pools with ownership checks and leak detection.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Larder sub-crates. For most users, adding `larder` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use larder::prelude::*;
//!
//! let mut pool = MemoryPool::new();
//! let sensor = pool.allocate(1024, "TemperatureProcessor").unwrap();
//! pool.block_mut(sensor).unwrap()[..4].copy_from_slice(&42u32.to_le_bytes());
//!
//! // Releasing as someone else is diagnosed but still releases.
//! let release = pool.deallocate(sensor, "WrongProcessor").unwrap();
//! assert!(release.ownership_mismatch);
//!
//! // A second release is refused and leaves the counters alone.
//! assert!(matches!(
//!     pool.deallocate(sensor, "TemperatureProcessor"),
//!     Err(PoolError::DoubleFree { .. })
//! ));
//! assert_eq!(pool.report_statistics().used_bytes, 0);
//!
//! let mut tracker = AllocationTracker::new("images");
//! let pixels = tracker.allocate_array(64 * 64 * 3).unwrap();
//! assert_eq!(tracker.report_leaks().len(), 1);
//! tracker.deallocate_array(pixels).unwrap();
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `larder-core` | Handles, IDs, errors, diagnostics, leak reports |
//! | [`pool`] | `larder-pool` | `MemoryPool`, `AllocationTracker`, config and statistics |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Shared vocabulary (`larder-core`).
///
/// Contains [`types::BlockHandle`], [`types::PoolError`], the diagnostic
/// records and the [`types::Inspect`] trait.
pub use larder_core as types;

/// Tracked allocators (`larder-pool`).
///
/// [`pool::MemoryPool`] for first-fit block leasing,
/// [`pool::AllocationTracker`] for instrumented exact-size allocation.
pub use larder_pool as pool;

/// Common imports for typical Larder usage.
///
/// ```rust
/// use larder::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use larder_core::{AllocKind, BlockHandle, Diagnostic, Inspect, LeakReport, PoolId};

    // Errors
    pub use larder_core::{ConfigError, PoolError};

    // Allocators
    pub use larder_pool::{
        AllocationTracker, MemoryPool, PoolConfig, PoolStats, PoolStatus, Release,
        TrackedRelease, TrackerStats,
    };
}
