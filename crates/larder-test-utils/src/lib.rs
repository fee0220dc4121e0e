//! Test utilities for Larder development.
//!
//! Pool builders for the common layouts, an image-processing workload for
//! the tracker, and seeded churn scripts that replay the same
//! allocate/release sequence for a given seed.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{
    churn_script, image_session, lab_pool, run_churn, single_class_pool, ChurnOutcome, ChurnStep,
};
