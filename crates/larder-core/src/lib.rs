//! Core types and traits for the Larder tracked allocators.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by every allocator in the workspace: pool
//! identifiers, generation-checked block handles, the error taxonomy,
//! diagnostic records, leak reports and the [`Inspect`] trait.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod diagnostic;
pub mod error;
pub mod handle;
pub mod id;
pub mod leak;
pub mod traits;

pub use diagnostic::{Diagnostic, DiagnosticLog, Severity};
pub use error::{ConfigError, PoolError};
pub use handle::{AllocKind, BlockHandle};
pub use id::PoolId;
pub use leak::{Leak, LeakReport};
pub use traits::Inspect;
