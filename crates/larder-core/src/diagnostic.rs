//! Diagnostic records for allocator misuse.
//!
//! A [`Diagnostic`] is what an allocator produces when a caller does
//! something suspicious. Every diagnostic is logged through `tracing` the
//! moment it happens ([`Diagnostic::emit`]) and kept in a bounded
//! [`DiagnosticLog`] so tests and tooling can inspect it afterwards.

use std::collections::VecDeque;
use std::fmt;

use crate::error::PoolError;
use crate::handle::{AllocKind, BlockHandle};
use crate::id::PoolId;

/// How bad a diagnostic is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// The operation went ahead (or was harmless), but looks wrong.
    Warning,
    /// The operation was refused.
    Error,
}

/// One recorded misuse or failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// Zero-byte allocation request.
    InvalidSize {
        /// Label of the requesting caller.
        requester: String,
    },
    /// Growth failed because the system allocator refused.
    OutOfMemory {
        /// Bytes requested.
        requested: usize,
        /// Label of the requesting caller.
        requester: String,
    },
    /// Release without a handle.
    NullHandle {
        /// Label of the requesting caller.
        requester: String,
    },
    /// Release of a handle this allocator never issued.
    UntrackedMemory {
        /// The foreign handle.
        handle: BlockHandle,
        /// Label of the requesting caller.
        requester: String,
    },
    /// Release of a lease that already ended.
    DoubleFree {
        /// The handle released twice.
        handle: BlockHandle,
        /// Label of the requesting caller.
        requester: String,
    },
    /// Release by someone other than the lessee. The release still happens.
    OwnershipMismatch {
        /// The released handle.
        handle: BlockHandle,
        /// Label recorded at allocation.
        owner: String,
        /// Label of the caller releasing it.
        requester: String,
    },
    /// Release with a different [`AllocKind`] than the allocation.
    KindMismatch {
        /// The released handle.
        handle: BlockHandle,
        /// Kind declared at allocation.
        allocated: AllocKind,
        /// Kind declared at release.
        released: AllocKind,
    },
}

impl Diagnostic {
    /// Severity of this diagnostic.
    pub fn severity(&self) -> Severity {
        match self {
            Self::InvalidSize { .. }
            | Self::NullHandle { .. }
            | Self::OwnershipMismatch { .. }
            | Self::KindMismatch { .. } => Severity::Warning,
            Self::OutOfMemory { .. } | Self::UntrackedMemory { .. } | Self::DoubleFree { .. } => {
                Severity::Error
            }
        }
    }

    /// Short stable name of the diagnostic kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::InvalidSize { .. } => "invalid_size",
            Self::OutOfMemory { .. } => "out_of_memory",
            Self::NullHandle { .. } => "null_handle",
            Self::UntrackedMemory { .. } => "untracked_memory",
            Self::DoubleFree { .. } => "double_free",
            Self::OwnershipMismatch { .. } => "ownership_mismatch",
            Self::KindMismatch { .. } => "kind_mismatch",
        }
    }

    /// Build the diagnostic that corresponds to a refused operation.
    ///
    /// Returns `None` for errors that are not caller misuse
    /// (stale access, accounting and config failures).
    pub fn from_error(error: &PoolError) -> Option<Self> {
        match error {
            PoolError::InvalidSize { requester } => Some(Self::InvalidSize {
                requester: requester.clone(),
            }),
            PoolError::NullHandle { requester } => Some(Self::NullHandle {
                requester: requester.clone(),
            }),
            PoolError::UntrackedMemory { handle, requester } => Some(Self::UntrackedMemory {
                handle: *handle,
                requester: requester.clone(),
            }),
            PoolError::DoubleFree { handle, requester } => Some(Self::DoubleFree {
                handle: *handle,
                requester: requester.clone(),
            }),
            _ => None,
        }
    }

    /// Log this diagnostic through `tracing` at a level matching its severity.
    pub fn emit(&self, pool: PoolId) {
        match self {
            Self::InvalidSize { requester } => {
                tracing::warn!(%pool, %requester, "cannot allocate 0 bytes");
            }
            Self::OutOfMemory {
                requested,
                requester,
            } => {
                tracing::error!(%pool, %requester, size = requested, "failed to grow pool");
            }
            Self::NullHandle { requester } => {
                tracing::warn!(%pool, %requester, "attempted to deallocate a null handle");
            }
            Self::UntrackedMemory { handle, requester } => {
                tracing::error!(
                    %pool,
                    block = %handle,
                    %requester,
                    "attempted to deallocate untracked memory"
                );
            }
            Self::DoubleFree { handle, requester } => {
                tracing::error!(%pool, block = %handle, %requester, "double deallocation");
            }
            Self::OwnershipMismatch {
                handle,
                owner,
                requester,
            } => {
                tracing::warn!(
                    %pool,
                    block = %handle,
                    %owner,
                    %requester,
                    "deallocating memory owned by another requester"
                );
            }
            Self::KindMismatch {
                handle,
                allocated,
                released,
            } => {
                tracing::warn!(
                    %pool,
                    block = %handle,
                    %allocated,
                    %released,
                    "allocation kind mismatch"
                );
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSize { requester } => {
                write!(f, "cannot allocate 0 bytes for '{requester}'")
            }
            Self::OutOfMemory {
                requested,
                requester,
            } => write!(f, "failed to allocate {requested} bytes for '{requester}'"),
            Self::NullHandle { requester } => {
                write!(f, "'{requester}' attempted to deallocate a null handle")
            }
            Self::UntrackedMemory { handle, requester } => {
                write!(f, "'{requester}' attempted to deallocate untracked memory {handle}")
            }
            Self::DoubleFree { handle, requester } => {
                write!(f, "double deallocation of {handle} by '{requester}'")
            }
            Self::OwnershipMismatch {
                handle,
                owner,
                requester,
            } => write!(
                f,
                "'{requester}' is deallocating {handle} owned by '{owner}'"
            ),
            Self::KindMismatch {
                handle,
                allocated,
                released,
            } => write!(
                f,
                "{handle} allocated as {allocated} but released as {released}"
            ),
        }
    }
}

/// Bounded history of diagnostics, oldest first.
///
/// Once `capacity` entries are held, recording a new one evicts the
/// oldest. The total number ever recorded keeps counting.
#[derive(Clone, Debug)]
pub struct DiagnosticLog {
    entries: VecDeque<Diagnostic>,
    capacity: usize,
    recorded: u64,
}

impl DiagnosticLog {
    /// Create an empty log holding at most `capacity` entries.
    ///
    /// A capacity of 0 is bumped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity,
            recorded: 0,
        }
    }

    /// Emit `diagnostic` for `pool` and keep it.
    pub fn record(&mut self, pool: PoolId, diagnostic: Diagnostic) {
        diagnostic.emit(pool);
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(diagnostic);
        self.recorded += 1;
    }

    /// Iterate over retained diagnostics, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Most recently recorded diagnostic.
    pub fn last(&self) -> Option<&Diagnostic> {
        self.entries.back()
    }

    /// Number of retained diagnostics.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no diagnostic is retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of retained diagnostics.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of diagnostics ever recorded, including evicted ones.
    pub fn total_recorded(&self) -> u64 {
        self.recorded
    }

    /// Number of retained diagnostics with the given kind name.
    pub fn count_kind(&self, kind_name: &str) -> usize {
        self.entries
            .iter()
            .filter(|d| d.kind_name() == kind_name)
            .count()
    }
}
