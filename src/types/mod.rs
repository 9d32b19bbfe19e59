//! # Value and Column Types
//!
//! The building blocks shared by every row operation.
//!
//! ## Module Structure
//!
//! - `data_type`: Built-in `DataType` catalog and its physical properties
//! - `column`: `ColumnDef` descriptor with alignment, storage and offset cache
//! - `datum`: Runtime `Datum<'a>` value, borrowed from rows where possible
//! - `varlena`: Header encodings of variable-length values
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | `DataType` | Built-in type with oid, length, alignment, storage |
//! | `ColumnDef` | One column of a schema |
//! | `Datum<'a>` | One non-null column value |
//! | `ExpandedObject` | In-memory value flattened on store |

mod column;
mod data_type;
mod datum;
pub mod varlena;

pub use column::{Align, ColumnDef, Storage, StorageLength};
pub use data_type::{DataType, NAMEDATALEN};
pub use datum::{flatten_expanded, Datum, ExpandedBytes, ExpandedObject};
