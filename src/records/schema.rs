//! # Schema Definition
//!
//! `Schema` is the column descriptor table shared by every row of one table or
//! composite type. It is long-lived and shared by reference; the only state
//! that changes over its lifetime is the per-column offset cache.
//!
//! ## Schema Internals
//!
//! - `columns`: Column descriptors in logical order
//! - `has_oid`: Rows carry a 4-byte identity field before the data region
//! - `type_id` / `type_mod`: Composite identity stamped on rows converted to values
//! - `offset_cache`: When false, every decode walks the row from the start
//!
//! Column numbers on public APIs are 1-based; internal helpers take 0-based
//! indexes.

use crate::types::{ColumnDef, Datum};

/// Type id of an anonymous composite.
pub const RECORD_TYPE_OID: u32 = 2249;

#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<ColumnDef>,
    has_oid: bool,
    type_id: u32,
    type_mod: i32,
    offset_cache: bool,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self {
            columns,
            has_oid: false,
            type_id: RECORD_TYPE_OID,
            type_mod: -1,
            offset_cache: true,
        }
    }

    pub fn with_oid(mut self) -> Self {
        self.has_oid = true;
        self
    }

    pub fn with_type(mut self, type_id: u32, type_mod: i32) -> Self {
        self.type_id = type_id;
        self.type_mod = type_mod;
        self
    }

    /// Forces every decode down the slow path.
    pub fn without_offset_cache(mut self) -> Self {
        self.offset_cache = false;
        self
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, idx: usize) -> Option<&ColumnDef> {
        self.columns.get(idx)
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn has_oid(&self) -> bool {
        self.has_oid
    }

    pub fn type_id(&self) -> u32 {
        self.type_id
    }

    pub fn type_mod(&self) -> i32 {
        self.type_mod
    }

    pub fn uses_offset_cache(&self) -> bool {
        self.offset_cache
    }

    #[inline]
    pub(crate) fn cached_offset(&self, idx: usize) -> Option<usize> {
        if !self.offset_cache {
            return None;
        }
        self.columns[idx].cached_offset()
    }

    #[inline]
    pub(crate) fn set_cached_offset(&self, idx: usize, off: usize) {
        if self.offset_cache {
            self.columns[idx].set_cached_offset(off);
        }
    }

    pub fn reset_offset_cache(&self) {
        for col in &self.columns {
            col.reset_cached_offset();
        }
    }

    /// Value read for column `idx` when a row predates it. Dropped columns
    /// never have one.
    pub fn default_for(&self, idx: usize) -> Option<&Datum<'static>> {
        self.columns
            .get(idx)
            .filter(|col| !col.is_dropped())
            .and_then(ColumnDef::missing)
    }

    /// True when any column carries a missing value.
    pub fn has_missing(&self) -> bool {
        self.columns.iter().any(|col| col.missing().is_some())
    }

    pub fn null_bitmap_size(column_count: usize) -> usize {
        column_count.div_ceil(8)
    }
}
