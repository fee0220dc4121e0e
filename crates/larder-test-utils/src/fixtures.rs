//! Reusable pool fixtures and workloads.
//!
//! - [`lab_pool`]: the default five size classes, four blocks each.
//! - [`single_class_pool`]: one size class, handy for exhaustion tests.
//! - [`image_session`]: an RGB image buffer plus scratch channels on a tracker.
//! - [`churn_script`] / [`run_churn`]: deterministic random allocate/release.

use larder_core::{AllocKind, BlockHandle, PoolError};
use larder_pool::{AllocationTracker, MemoryPool, PoolConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A pool with the default configuration.
pub fn lab_pool() -> MemoryPool {
    MemoryPool::new()
}

/// A pool holding `count` blocks of `block_size` bytes and nothing else.
pub fn single_class_pool(block_size: usize, count: usize) -> MemoryPool {
    let config = PoolConfig::empty().with_size_class(block_size, count);
    MemoryPool::with_config(config).unwrap()
}

/// Allocate a `width` x `height` RGB buffer on `tracker`, fill it with a
/// gradient, then run two channel-extraction passes through scratch arrays
/// that are released before returning.
///
/// The image buffer stays live; the caller releases it.
pub fn image_session(
    tracker: &mut AllocationTracker,
    width: usize,
    height: usize,
) -> Result<BlockHandle, PoolError> {
    let pixels = width * height;
    let image = tracker.allocate_array(pixels * 3)?;
    for (i, byte) in tracker.get_mut(image)?.iter_mut().enumerate() {
        *byte = (i % 256) as u8;
    }

    let red = tracker.allocate_array(pixels)?;
    let green = tracker.allocate_array(pixels)?;
    let source = tracker.get(image)?.to_vec();
    for (i, byte) in tracker.get_mut(red)?.iter_mut().enumerate() {
        *byte = source[i * 3];
    }
    for (i, byte) in tracker.get_mut(green)?.iter_mut().enumerate() {
        *byte = source[i * 3 + 1];
    }
    tracker.deallocate_array(red)?;
    tracker.deallocate_array(green)?;

    // Exercise the single-object path alongside the arrays.
    let header = tracker.allocate(16, AllocKind::Single)?;
    tracker.deallocate(header, AllocKind::Single)?;
    Ok(image)
}

/// One step of a churn workload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChurnStep {
    /// Request `size` bytes as `requester`.
    Allocate { size: usize, requester: String },
    /// Release the live allocation at position `slot % live.len()`.
    Release { slot: usize },
}

/// Build a reproducible script of `steps` operations.
///
/// Sizes are drawn from `1..=max_size`; requesters from a small fixed set
/// so ownership is shared across steps.
pub fn churn_script(seed: u64, steps: usize, max_size: usize) -> Vec<ChurnStep> {
    const REQUESTERS: [&str; 4] = ["sensor", "parser", "encoder", "logger"];
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..steps)
        .map(|_| {
            if rng.random_bool(0.55) {
                ChurnStep::Allocate {
                    size: rng.random_range(1..=max_size.max(1)),
                    requester: REQUESTERS[rng.random_range(0..REQUESTERS.len())].to_string(),
                }
            } else {
                ChurnStep::Release {
                    slot: rng.random_range(0..usize::MAX),
                }
            }
        })
        .collect()
}

/// What a churn run left behind.
#[derive(Clone, Debug, Default)]
pub struct ChurnOutcome {
    /// Live leases with the requester that holds each.
    pub live: Vec<(BlockHandle, String)>,
    /// Successful allocations.
    pub allocated: usize,
    /// Successful releases.
    pub released: usize,
}

/// Replay `script` against `pool`, always releasing as the lessee.
///
/// Release steps with nothing live are skipped.
pub fn run_churn(pool: &mut MemoryPool, script: &[ChurnStep]) -> Result<ChurnOutcome, PoolError> {
    let mut outcome = ChurnOutcome::default();
    for step in script {
        match step {
            ChurnStep::Allocate { size, requester } => {
                let handle = pool.allocate(*size, requester)?;
                outcome.live.push((handle, requester.clone()));
                outcome.allocated += 1;
            }
            ChurnStep::Release { slot } => {
                if outcome.live.is_empty() {
                    continue;
                }
                let (handle, requester) = outcome.live.swap_remove(slot % outcome.live.len());
                pool.deallocate(handle, &requester)?;
                outcome.released += 1;
            }
        }
    }
    Ok(outcome)
}
