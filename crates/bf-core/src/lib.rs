//! # bf-core
//!
//! Shared data model and error handling for baseflow recession analysis.
//!
//! The analysis crates borrow a [`TimeSeries`] owned by the caller and produce
//! value records from it; nothing here holds mutable state.

#![warn(missing_docs)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{BasinGeometry, TimeSeries};

/// Crate version, reported by `baseflow version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
