//! Error types for the Larder allocators.
//!
//! Organized by subsystem: [`PoolError`] for allocation, release and
//! accounting failures, [`ConfigError`] for rejected pool configurations.

use std::error::Error;
use std::fmt;

use crate::handle::BlockHandle;

/// Errors from allocator operations.
///
/// Allocation failures (`InvalidSize`, `OutOfMemory`) are fatal to the
/// requesting call. Release misuse (`NullHandle`, `UntrackedMemory`,
/// `DoubleFree`) leaves the allocator untouched and is reported so the
/// caller can carry on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// A zero-byte allocation was requested.
    InvalidSize {
        /// Label of the caller that made the request.
        requester: String,
    },
    /// The system allocator could not provide memory for a new block.
    OutOfMemory {
        /// Number of bytes requested.
        requested: usize,
    },
    /// A release was attempted without a handle.
    NullHandle {
        /// Label of the caller that made the request.
        requester: String,
    },
    /// The handle was never issued by this allocator.
    UntrackedMemory {
        /// The unrecognised handle.
        handle: BlockHandle,
        /// Label of the caller that made the request.
        requester: String,
    },
    /// The lease named by the handle has already been released.
    DoubleFree {
        /// The handle whose lease already ended.
        handle: BlockHandle,
        /// Label of the caller that made the request.
        requester: String,
    },
    /// A block was accessed through a handle whose lease has ended.
    StaleHandle {
        /// The generation encoded in the handle.
        handle: BlockHandle,
        /// The block's current generation.
        current_generation: u32,
    },
    /// Aggregate byte counters disagree with the per-block state.
    AccountingMismatch {
        /// Value held by the running counter.
        recorded: usize,
        /// Value recomputed from the blocks.
        computed: usize,
    },
    /// Per-block state violates an invariant.
    CorruptState {
        /// Description of the violated invariant.
        reason: String,
    },
    /// The pool configuration was rejected.
    Config(ConfigError),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSize { requester } => {
                write!(f, "cannot allocate 0 bytes for '{requester}'")
            }
            Self::OutOfMemory { requested } => {
                write!(f, "out of memory: failed to reserve {requested} bytes")
            }
            Self::NullHandle { requester } => {
                write!(f, "'{requester}' attempted to release a null handle")
            }
            Self::UntrackedMemory { handle, requester } => {
                write!(f, "'{requester}' attempted to release untracked memory {handle}")
            }
            Self::DoubleFree { handle, requester } => {
                write!(f, "double free of {handle} by '{requester}'")
            }
            Self::StaleHandle {
                handle,
                current_generation,
            } => {
                write!(
                    f,
                    "stale handle {handle}: block is at generation {current_generation}"
                )
            }
            Self::AccountingMismatch { recorded, computed } => {
                write!(
                    f,
                    "byte count mismatch: counter says {recorded}, blocks say {computed}"
                )
            }
            Self::CorruptState { reason } => write!(f, "corrupt pool state: {reason}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl Error for PoolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for PoolError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Errors detected while validating a pool configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A size class declares zero-byte blocks.
    EmptySizeClass {
        /// Position of the offending class in the config.
        position: usize,
    },
    /// A size class declares zero blocks.
    ZeroCount {
        /// Block size of the offending class.
        block_size: usize,
    },
    /// The release fill byte equals the zero fill applied on allocation.
    ReleaseFillIsZero,
    /// The diagnostic history cannot hold any entry.
    ZeroHistory,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySizeClass { position } => {
                write!(f, "size class {position} has a block size of 0 bytes")
            }
            Self::ZeroCount { block_size } => {
                write!(f, "size class of {block_size} bytes has no blocks")
            }
            Self::ReleaseFillIsZero => {
                write!(f, "release fill byte must differ from the zero fill")
            }
            Self::ZeroHistory => write!(f, "diagnostic history capacity must be at least 1"),
        }
    }
}

impl Error for ConfigError {}
