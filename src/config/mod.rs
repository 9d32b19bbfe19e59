//! # Row Format Configuration
//!
//! Layout constants live in one place so that interdependent values (header
//! sizes, alignment, varlena limits) cannot drift apart. Invariants between
//! them are checked at compile time.
//!
//! Per-schema runtime knobs (identity field, composite type identity, offset
//! cache toggle) live on [`crate::records::Schema`].
//!
//! ## Module Organization
//!
//! - [`constants`]: All numeric layout values with dependency documentation

pub mod constants;
pub use constants::*;
