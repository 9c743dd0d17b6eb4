//! File system writes with transaction support.
//!
//! Provides staged file updates that can be committed or rolled back as a unit.

pub mod transaction;

pub use transaction::{Operation, Transaction};
