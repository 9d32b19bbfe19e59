//! # Column Descriptors
//!
//! A `ColumnDef` carries everything the codec needs to place one column in a
//! row: its length class, whether it is passed by value, its alignment, its
//! storage strategy, an optional missing value for rows written before the
//! column existed, and the per-column offset cache.
//!
//! ## Offset Cache
//!
//! The cache holds the byte offset of the column inside the data region under
//! the assumption that no earlier column is null and no earlier column is
//! variable-length. That offset is a property of the schema, not of a row, so
//! any decoder that proves it for one row may publish it for all. Concurrent
//! publishers always compute the same number, which is why a relaxed atomic
//! store suffices.
//!
//! ```ignore
//! use rowform::types::{ColumnDef, DataType, Datum};
//!
//! let id = ColumnDef::new("id", DataType::Int4);
//! let note = ColumnDef::new("note", DataType::Text).with_missing(Datum::text("n/a"));
//! ```

use std::sync::atomic::{AtomicI32, Ordering};

use eyre::{ensure, Result};

use super::{DataType, Datum};
use crate::error::RowError;

const OFFSET_UNKNOWN: i32 = -1;

/// Alignment class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Align {
    Char,
    Short,
    Int,
    Double,
}

impl Align {
    #[inline]
    pub fn bytes(self) -> usize {
        match self {
            Align::Char => 1,
            Align::Short => 2,
            Align::Int => 4,
            Align::Double => 8,
        }
    }

    /// Rounds `off` up to this alignment.
    #[inline]
    pub fn align_offset(self, off: usize) -> usize {
        let a = self.bytes();
        (off + a - 1) & !(a - 1)
    }
}

/// Storage-length class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageLength {
    Fixed(u16),
    Varlena,
    CString,
}

/// Storage strategy. Everything but `Plain` allows short-header packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Storage {
    Plain,
    External,
    Extended,
    Main,
}

impl Storage {
    #[inline]
    pub fn is_packable(self) -> bool {
        !matches!(self, Storage::Plain)
    }
}

#[derive(Debug)]
pub struct ColumnDef {
    name: String,
    data_type: Option<DataType>,
    type_oid: u32,
    type_mod: i32,
    len: StorageLength,
    by_val: bool,
    align: Align,
    storage: Storage,
    dropped: bool,
    missing: Option<Datum<'static>>,
    cache_off: AtomicI32,
}

impl Clone for ColumnDef {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            data_type: self.data_type,
            type_oid: self.type_oid,
            type_mod: self.type_mod,
            len: self.len,
            by_val: self.by_val,
            align: self.align,
            storage: self.storage,
            dropped: self.dropped,
            missing: self.missing.clone(),
            cache_off: AtomicI32::new(OFFSET_UNKNOWN),
        }
    }
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type),
            type_oid: data_type.type_oid(),
            type_mod: -1,
            len: data_type.storage_length(),
            by_val: data_type.by_val(),
            align: data_type.align(),
            storage: data_type.default_storage(),
            dropped: false,
            missing: None,
            cache_off: AtomicI32::new(OFFSET_UNKNOWN),
        }
    }

    /// Creates a VARCHAR(n) column. Pass None for unlimited length.
    pub fn varchar(name: impl Into<String>, length: Option<u32>) -> Self {
        let mut col = Self::new(name, DataType::Varchar);
        if let Some(n) = length {
            col.type_mod = n as i32 + 4;
        }
        col
    }

    /// Describes a column of a type outside the built-in catalog.
    pub fn custom(
        name: impl Into<String>,
        type_oid: u32,
        len: StorageLength,
        by_val: bool,
        align: Align,
        storage: Storage,
    ) -> Result<Self> {
        if by_val {
            ensure!(
                matches!(len, StorageLength::Fixed(1 | 2 | 4 | 8)),
                RowError::invalid(format!(
                    "pass-by-value column must be 1, 2, 4 or 8 bytes wide, got {:?}",
                    len
                ))
            );
        }
        if let StorageLength::Fixed(n) = len {
            ensure!(n > 0, RowError::invalid("fixed-length column of zero bytes"));
        }
        // cstrings are never aligned on write.
        ensure!(
            len != StorageLength::CString || align == Align::Char,
            RowError::invalid(format!("cstring column must be byte aligned, got {:?}", align))
        );
        Ok(Self {
            name: name.into(),
            data_type: None,
            type_oid,
            type_mod: -1,
            len,
            by_val,
            align,
            storage,
            dropped: false,
            missing: None,
            cache_off: AtomicI32::new(OFFSET_UNKNOWN),
        })
    }

    pub fn with_storage(mut self, storage: Storage) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_type_mod(mut self, type_mod: i32) -> Self {
        self.type_mod = type_mod;
        self
    }

    /// Value substituted when reading rows written before this column existed.
    pub fn with_missing(mut self, value: Datum<'_>) -> Self {
        self.missing = Some(value.into_owned());
        self
    }

    pub fn dropped(mut self) -> Self {
        self.dropped = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> Option<DataType> {
        self.data_type
    }

    pub fn type_oid(&self) -> u32 {
        self.type_oid
    }

    pub fn type_mod(&self) -> i32 {
        self.type_mod
    }

    pub fn storage_length(&self) -> StorageLength {
        self.len
    }

    pub fn by_val(&self) -> bool {
        self.by_val
    }

    pub fn align(&self) -> Align {
        self.align
    }

    pub fn storage(&self) -> Storage {
        self.storage
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped
    }

    pub fn missing(&self) -> Option<&Datum<'static>> {
        self.missing.as_ref()
    }

    #[inline]
    pub fn is_varlena(&self) -> bool {
        matches!(self.len, StorageLength::Varlena)
    }

    #[inline]
    pub fn is_fixed(&self) -> bool {
        matches!(self.len, StorageLength::Fixed(_))
    }

    #[inline]
    pub fn cached_offset(&self) -> Option<usize> {
        let off = self.cache_off.load(Ordering::Relaxed);
        (off >= 0).then_some(off as usize)
    }

    #[inline]
    pub fn set_cached_offset(&self, off: usize) {
        self.cache_off.store(off as i32, Ordering::Relaxed);
    }

    pub fn reset_cached_offset(&self) {
        self.cache_off.store(OFFSET_UNKNOWN, Ordering::Relaxed);
    }
}
