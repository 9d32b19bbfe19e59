//! # rowform - Binary Row Codec
//!
//! rowform packs a row of typed column values into a compact, self-describing
//! binary image and reads columns back out of it. This Rust implementation
//! prioritizes:
//!
//! - **Zero-copy reads**: decoded values borrow from the row buffer
//! - **Memoized offsets**: column offsets proven row-independent are cached in
//!   the schema and shared lock-free by every reader
//! - **Exact sizing**: the encoder allocates once, from an estimate it is
//!   guaranteed to meet
//!
//! ## Quick Start
//!
//! ```ignore
//! use rowform::records::{form_tuple, getattr, Schema};
//! use rowform::types::{ColumnDef, DataType, Datum};
//!
//! let schema = Schema::new(vec![
//!     ColumnDef::new("id", DataType::Int4),
//!     ColumnDef::new("name", DataType::Text),
//! ]);
//!
//! let row = form_tuple(&schema, &[Some(Datum::int4(1)), Some(Datum::text("alice"))])?;
//! assert_eq!(getattr(&row, &schema, 2)?, Some(Datum::text("alice")));
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Sources: values, wire records, old rows     │
//! ├──────────────────────────────────────────────┤
//! │  Encoder │ Expander │ Converters │ Slot      │
//! ├──────────────────────────────────────────────┤
//! │  Packing plan │ Random-access / incremental  │
//! │               │ decoder + offset cache       │
//! ├──────────────────────────────────────────────┤
//! │  Headers (zerocopy) │ Varlena │ Out-of-line  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`]: Layout constants and their compile-time invariants
//! - [`error`]: Error taxonomy carried inside `eyre` reports
//! - [`types`]: Data types, column descriptors, values, varlena headers
//! - [`storage`]: Out-of-line value references and a reference store
//! - [`records`]: Row encoding, decoding, evolution and conversion

#[macro_use]
mod macros;

pub mod config;
pub mod error;
pub mod records;
pub mod storage;
pub mod types;

pub use error::{ErrorKind, RowError};
pub use records::{DecodableRow, HeapTuple, MinimalTuple, Schema, TupleSlot};
pub use types::{ColumnDef, DataType, Datum};
