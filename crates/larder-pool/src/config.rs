//! Pool configuration parameters.

use larder_core::ConfigError;

/// A group of identical blocks created when the pool is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeClass {
    /// Capacity of each block in bytes.
    pub block_size: usize,
    /// Number of blocks of this size to pre-allocate.
    pub count: usize,
}

impl SizeClass {
    /// Create a size class.
    pub fn new(block_size: usize, count: usize) -> Self {
        Self { block_size, count }
    }
}

/// Configuration for a [`MemoryPool`](crate::MemoryPool).
///
/// Controls which blocks exist up front, how released memory is poisoned
/// and how much diagnostic history is retained. Validated at construction;
/// the pool keeps its own copy and never changes it afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Blocks to pre-allocate, in pool order.
    ///
    /// Default: 64, 256, 1024, 4096 and 16384 bytes, four blocks each.
    /// May be empty, in which case every allocation grows the pool.
    pub size_classes: Vec<SizeClass>,

    /// Byte written over a block when its lease ends.
    ///
    /// Default: `0xFF`. Must be non-zero so released memory is visibly
    /// different from freshly allocated (zero-filled) memory.
    pub release_fill: u8,

    /// Maximum number of diagnostics retained by the pool.
    ///
    /// Default: 256. Older entries are dropped first.
    pub diagnostic_history: usize,
}

impl PoolConfig {
    /// Default block sizes, smallest first.
    pub const DEFAULT_BLOCK_SIZES: [usize; 5] = [64, 256, 1024, 4096, 16384];

    /// Default number of blocks per size class.
    pub const DEFAULT_BLOCKS_PER_CLASS: usize = 4;

    /// Default release fill byte.
    pub const DEFAULT_RELEASE_FILL: u8 = 0xFF;

    /// Default diagnostic history capacity.
    pub const DEFAULT_DIAGNOSTIC_HISTORY: usize = 256;

    /// Create the default config.
    pub fn new() -> Self {
        Self {
            size_classes: Self::DEFAULT_BLOCK_SIZES
                .iter()
                .map(|&size| SizeClass::new(size, Self::DEFAULT_BLOCKS_PER_CLASS))
                .collect(),
            release_fill: Self::DEFAULT_RELEASE_FILL,
            diagnostic_history: Self::DEFAULT_DIAGNOSTIC_HISTORY,
        }
    }

    /// Create a config with no pre-allocated blocks.
    pub fn empty() -> Self {
        Self {
            size_classes: Vec::new(),
            ..Self::new()
        }
    }

    /// Append a size class.
    pub fn with_size_class(mut self, block_size: usize, count: usize) -> Self {
        self.size_classes.push(SizeClass::new(block_size, count));
        self
    }

    /// Set the release fill byte.
    pub fn with_release_fill(mut self, fill: u8) -> Self {
        self.release_fill = fill;
        self
    }

    /// Set the diagnostic history capacity.
    pub fn with_diagnostic_history(mut self, capacity: usize) -> Self {
        self.diagnostic_history = capacity;
        self
    }

    /// Check the config for values the pool cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (position, class) in self.size_classes.iter().enumerate() {
            if class.block_size == 0 {
                return Err(ConfigError::EmptySizeClass { position });
            }
            if class.count == 0 {
                return Err(ConfigError::ZeroCount {
                    block_size: class.block_size,
                });
            }
        }
        if self.release_fill == 0 {
            return Err(ConfigError::ReleaseFillIsZero);
        }
        if self.diagnostic_history == 0 {
            return Err(ConfigError::ZeroHistory);
        }
        Ok(())
    }

    /// Number of blocks the config pre-allocates.
    pub fn preallocated_blocks(&self) -> usize {
        self.size_classes
            .iter()
            .fold(0usize, |acc, c| acc.saturating_add(c.count))
    }

    /// Bytes the config pre-allocates, saturating at `usize::MAX`.
    pub fn preallocated_bytes(&self) -> usize {
        self.size_classes.iter().fold(0usize, |acc, c| {
            acc.saturating_add(c.block_size.saturating_mul(c.count))
        })
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_five_classes_of_four() {
        let config = PoolConfig::default();
        assert_eq!(config.size_classes.len(), 5);
        assert_eq!(config.preallocated_blocks(), 20);
        assert_eq!(config.preallocated_bytes(), 4 * (64 + 256 + 1024 + 4096 + 16384));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_config_is_valid() {
        let config = PoolConfig::empty();
        assert_eq!(config.preallocated_blocks(), 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_appends_classes_in_order() {
        let config = PoolConfig::empty()
            .with_size_class(128, 2)
            .with_size_class(32, 1);
        assert_eq!(
            config.size_classes,
            vec![SizeClass::new(128, 2), SizeClass::new(32, 1)]
        );
    }

    #[test]
    fn rejects_zero_byte_class() {
        let config = PoolConfig::empty().with_size_class(64, 1).with_size_class(0, 3);
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptySizeClass { position: 1 })
        );
    }

    #[test]
    fn rejects_zero_count() {
        let config = PoolConfig::empty().with_size_class(64, 0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroCount { block_size: 64 })
        );
    }

    #[test]
    fn rejects_zero_release_fill() {
        let config = PoolConfig::default().with_release_fill(0);
        assert_eq!(config.validate(), Err(ConfigError::ReleaseFillIsZero));
    }

    #[test]
    fn rejects_zero_history() {
        let config = PoolConfig::default().with_diagnostic_history(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroHistory));
    }

    #[test]
    fn preallocated_bytes_saturates() {
        let config = PoolConfig::empty().with_size_class(usize::MAX, 2);
        assert_eq!(config.preallocated_bytes(), usize::MAX);
    }
}
