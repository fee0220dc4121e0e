//! Traits shared by every tracked allocator.

use crate::diagnostic::DiagnosticLog;
use crate::error::PoolError;
use crate::id::PoolId;
use crate::leak::LeakReport;

/// Read-only diagnostic access to a tracked allocator.
///
/// Implemented by both the block pool and the allocation tracker, so
/// reporting code (shutdown hooks, test assertions) can be written once.
pub trait Inspect {
    /// Identity of the allocator.
    fn id(&self) -> PoolId;

    /// Every lease currently outstanding.
    fn report_leaks(&self) -> LeakReport;

    /// Recompute derived counters from primary state and compare.
    fn validate(&self) -> Result<(), PoolError>;

    /// Misuse recorded so far.
    fn diagnostics(&self) -> &DiagnosticLog;
}
