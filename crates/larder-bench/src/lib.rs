//! Benchmark profiles for the Larder tracked allocators.
//!
//! - [`reference_config`]: the default five size classes, four blocks each.
//! - [`stress_config`]: the same classes at 64 blocks each.
//! - [`lease_sizes`]: a deterministic spread of request sizes.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use larder_pool::PoolConfig;

/// The default pool layout.
pub fn reference_config() -> PoolConfig {
    PoolConfig::default()
}

/// Default size classes with 64 blocks each, so long churn runs rarely grow.
pub fn stress_config() -> PoolConfig {
    PoolConfig::DEFAULT_BLOCK_SIZES
        .iter()
        .fold(PoolConfig::empty(), |config, &size| {
            config.with_size_class(size, 64)
        })
}

/// `n` request sizes cycling across every size class, each one byte under
/// or exactly at the class size.
pub fn lease_sizes(n: usize) -> Vec<usize> {
    let classes = PoolConfig::DEFAULT_BLOCK_SIZES;
    (0..n)
        .map(|i| {
            let class = classes[i % classes.len()];
            if i % 2 == 0 {
                class
            } else {
                class - 1
            }
        })
        .collect()
}
