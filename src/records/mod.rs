//! # Row Encoding and Decoding
//!
//! This module turns a values/nulls pair into a compact binary row and reads
//! columns back out of it, either one at a time or incrementally.
//!
//! ## Row Binary Layout
//!
//! ```text
//! +----------------+-------------+---------+-----------+------------------+
//! | Fixed Header   | Null Bitmap | Padding | Oid (opt) | Data Region      |
//! | 23 or 15 bytes | (N+7)/8     | to 8    | u32       | packed columns   |
//! +----------------+-------------+---------+-----------+------------------+
//!                                                      ^ hoff
//! ```
//!
//! | Component | Description |
//! |-----------|-------------|
//! | **Fixed Header** | Full or minimal shape, see [`header`] |
//! | **Null Bitmap** | Present only if some column is null. `1` = has data, `0` = null |
//! | **Oid** | Optional identity field, stored just before the data region |
//! | **Data Region** | Non-null values in column order, each at its alignment |
//!
//! ## Column Storage
//!
//! | Class | Examples | Storage |
//! |-------|----------|---------|
//! | **By value** | int4, float8, bool | 1/2/4/8 little-endian bytes, aligned |
//! | **Fixed by reference** | uuid, name | Verbatim bytes, aligned |
//! | **Variable length** | text, bytea, record | Short (1-byte) or long (4-byte) header, or out-of-line reference |
//! | **C string** | cstring | Bytes plus terminating NUL, unaligned |
//!
//! Nulls occupy no bytes and cause no padding. There is no offset table: the
//! decoder recomputes offsets by walking the columns, and memoizes every
//! offset that is provably row-independent in the schema (see [`deform`]).
//!
//! ## Module Structure
//!
//! - `header`: Zerocopy header views and flag bits
//! - `tuple`: Owned full and minimal rows
//! - `schema`: Column descriptor table with offset cache
//! - `packing`: Shared size/placement plan for every value
//! - `builder`: Encoder, row modification, typed builder
//! - `deform`: Random-access and incremental decoding, system attributes
//! - `expand`: Schema evolution
//! - `convert`: Full/minimal/composite conversions
//! - `input`: Type-specific text parsers
//! - `datarow`: Wire record decoding and writing
//! - `slot`: Result-row slot

pub mod builder;
pub mod convert;
pub mod datarow;
pub mod deform;
pub mod expand;
pub mod header;
pub mod input;
mod packing;
pub mod schema;
pub mod slot;
pub mod tuple;


pub use builder::{
    compute_data_size, fill_tuple, form_minimal_tuple, form_tuple, modify_tuple,
    modify_tuple_by_cols, TupleBuilder,
};
pub use convert::copy_tuple_as_datum;
pub use datarow::{decode_data_row, DataRowBuilder, MAX_NESTING_DEPTH};
pub use deform::{
    attisnull, deform_incremental, deform_tuple, getattr, getsysattr, DecodeCursor,
    SystemAttribute,
};
pub use expand::{expand_tuple, minimal_expand_tuple};
pub use header::{flags, HeapTupleHeader, ItemPointer, MinimalTupleHeader};
pub use input::{TextInput, TypeInput};
pub use schema::{Schema, RECORD_TYPE_OID};
pub use slot::TupleSlot;
pub use tuple::{DecodableRow, HeapTuple, MinimalTuple};
