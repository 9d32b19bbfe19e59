//! # Row Decoding
//!
//! Random access to single columns and full or incremental decoding of rows,
//! all driven by the schema's per-column offset cache.
//!
//! ## Offset Cache
//!
//! A column's offset is the same in every row of a schema as long as no earlier
//! column is null and every earlier column is fixed-length. Once a decode
//! proves that for one row, the offset is published to the column descriptor
//! and reused by every later decode that meets the same precondition.
//!
//! ```text
//! target column T, row R
//!
//! any null before T in R? ──no──> cached offset for T? ──yes──> fetch
//!        │                              │no
//!        │                              v
//!        │                 all columns <= T fixed? ──yes──> prime leading
//!        │                              │no                 fixed offsets,
//!        v                              v                   fetch
//!   walk 0..T: nulls take no space, fixed columns align nominally,
//!   variable-length columns after an unaligned offset are located by
//!   scanning the zero padding for the first non-zero byte
//! ```
//!
//! The cache is written with relaxed atomic stores. Two decoders racing on the
//! same column always write the same number.
//!
//! ## Pad-Byte Scan
//!
//! A variable-length value that follows an unaligned offset may either be a
//! short-header value starting right there, or a long-header value starting at
//! the next aligned boundary with zero padding in between. Short headers are
//! never zero and padding always is, so the first non-zero byte in
//! `data[off..aligned]` marks the start. If there is none, the value starts at
//! `aligned`.

use std::borrow::Cow;

use eyre::{ensure, Result};
use tracing::trace;

use super::schema::Schema;
use super::tuple::{DecodableRow, HeapTuple};
use crate::error::RowError;
use crate::types::{varlena, Align, ColumnDef, Datum, StorageLength};

/// Columns computed by the row itself rather than stored in its data region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemAttribute {
    SelfItemPointer,
    ObjectId,
    MinTransactionId,
    MinCommandId,
    MaxTransactionId,
    MaxCommandId,
    TableOid,
}

impl SystemAttribute {
    pub fn attnum(self) -> i32 {
        match self {
            SystemAttribute::SelfItemPointer => -1,
            SystemAttribute::ObjectId => -2,
            SystemAttribute::MinTransactionId => -3,
            SystemAttribute::MinCommandId => -4,
            SystemAttribute::MaxTransactionId => -5,
            SystemAttribute::MaxCommandId => -6,
            SystemAttribute::TableOid => -7,
        }
    }

    pub fn from_attnum(attnum: i32) -> Result<Self> {
        let attr = match attnum {
            -1 => SystemAttribute::SelfItemPointer,
            -2 => SystemAttribute::ObjectId,
            -3 => SystemAttribute::MinTransactionId,
            -4 => SystemAttribute::MinCommandId,
            -5 => SystemAttribute::MaxTransactionId,
            -6 => SystemAttribute::MaxCommandId,
            -7 => SystemAttribute::TableOid,
            _ => {
                return Err(
                    RowError::invalid(format!("invalid system attribute number {}", attnum)).into(),
                )
            }
        };
        Ok(attr)
    }
}

/// Fetches a system attribute of a full row. None of them is ever null.
pub fn getsysattr(tuple: &HeapTuple, attr: SystemAttribute) -> Datum<'static> {
    let header = tuple.header();
    match attr {
        SystemAttribute::SelfItemPointer => {
            Datum::Ref(Cow::Owned(tuple.self_ptr().to_bytes().to_vec()))
        }
        SystemAttribute::ObjectId => Datum::oid(tuple.oid()),
        SystemAttribute::MinTransactionId => Datum::ByVal(header.xmin() as u64),
        SystemAttribute::MaxTransactionId => Datum::ByVal(header.xmax() as u64),
        SystemAttribute::MinCommandId | SystemAttribute::MaxCommandId => {
            Datum::ByVal(header.cid() as u64)
        }
        SystemAttribute::TableOid => Datum::oid(tuple.table_oid()),
    }
}

/// Converts a 1-based column number into a 0-based index.
pub(crate) fn column_index(attnum: usize, natts: usize) -> Result<usize> {
    ensure!(
        attnum >= 1 && attnum <= natts,
        RowError::InvalidColumn { attnum, natts }
    );
    Ok(attnum - 1)
}

pub(crate) fn check_row_natts<R: DecodableRow + ?Sized>(row: &R, schema: &Schema) -> Result<()> {
    ensure!(
        row.natts() <= schema.column_count(),
        RowError::corrupted(format!(
            "row stores {} columns but schema defines {}",
            row.natts(),
            schema.column_count()
        ))
    );
    Ok(())
}

/// Reads the value of `col` starting at `off`. Returns the value and the number
/// of bytes it occupies.
pub(crate) fn fetch<'a>(col: &ColumnDef, data: &'a [u8], off: usize) -> Result<(Datum<'a>, usize)> {
    let rest = data.get(off..).ok_or_else(|| {
        RowError::corrupted(format!(
            "column \"{}\" starts at {} past data region of {} bytes",
            col.name(),
            off,
            data.len()
        ))
    })?;

    match col.storage_length() {
        StorageLength::Fixed(len) => {
            let len = len as usize;
            let bytes = rest.get(..len).ok_or_else(|| {
                RowError::corrupted(format!(
                    "column \"{}\" truncated: needs {} bytes at {}",
                    col.name(),
                    len,
                    off
                ))
            })?;
            if col.by_val() {
                let mut raw = [0u8; 8];
                raw[..len].copy_from_slice(bytes);
                Ok((Datum::ByVal(u64::from_le_bytes(raw)), len))
            } else {
                Ok((Datum::Ref(Cow::Borrowed(bytes)), len))
            }
        }
        StorageLength::Varlena => {
            let size = varlena::size_any(rest)?;
            let image = rest.get(..size).ok_or_else(|| {
                RowError::corrupted(format!(
                    "variable-length column \"{}\" claims {} bytes, {} remain",
                    col.name(),
                    size,
                    rest.len()
                ))
            })?;
            Ok((Datum::Varlena(Cow::Borrowed(image)), size))
        }
        StorageLength::CString => {
            let end = rest.iter().position(|&b| b == 0).ok_or_else(|| {
                RowError::corrupted(format!("cstring column \"{}\" is unterminated", col.name()))
            })?;
            Ok((Datum::CString(Cow::Borrowed(&rest[..end])), end + 1))
        }
    }
}

/// Bytes occupied by the value of `col` at `off`.
fn att_size(col: &ColumnDef, data: &[u8], off: usize) -> Result<usize> {
    match col.storage_length() {
        StorageLength::Fixed(len) => Ok(len as usize),
        _ => fetch(col, data, off).map(|(_, size)| size),
    }
}

/// Start of a variable-length value that may follow alignment padding.
pub(crate) fn align_pointer(align: Align, data: &[u8], off: usize) -> usize {
    let aligned = align.align_offset(off);
    if aligned == off {
        return off;
    }
    let end = aligned.min(data.len());
    match data
        .get(off..end)
        .and_then(|pad| pad.iter().position(|&b| b != 0))
    {
        Some(p) => off + p,
        None => aligned,
    }
}

fn prime_fixed_offsets(schema: &Schema) {
    let mut off = 0;
    let mut primed = 0;
    for (j, col) in schema.columns().iter().enumerate() {
        let StorageLength::Fixed(len) = col.storage_length() else {
            break;
        };
        off = col.align().align_offset(off);
        schema.set_cached_offset(j, off);
        off += len as usize;
        primed += 1;
    }
    trace!(columns = primed, "primed fixed-width offset cache");
}

/// Fetches column `idx`, which is stored in `row` and not null, without
/// assuming its offset is cached.
fn nocachegetattr<'a, R: DecodableRow + ?Sized>(
    row: &'a R,
    schema: &Schema,
    idx: usize,
) -> Result<Datum<'a>> {
    let data = row.data();
    let cols = schema.columns();
    let has_nulls = row.has_nulls();

    let mut slow = !schema.uses_offset_cache() || (has_nulls && (0..idx).any(|i| row.att_isnull(i)));

    if !slow {
        if let Some(off) = schema.cached_offset(idx) {
            return fetch(&cols[idx], data, off).map(|(d, _)| d);
        }
        if cols[..=idx].iter().any(|c| !c.is_fixed()) {
            slow = true;
        }
    }

    if !slow {
        prime_fixed_offsets(schema);
        if let Some(off) = schema.cached_offset(idx) {
            return fetch(&cols[idx], data, off).map(|(d, _)| d);
        }
    }

    let mut off = 0usize;
    let mut usecache = schema.uses_offset_cache();
    for (i, col) in cols.iter().enumerate().take(idx + 1) {
        if has_nulls && row.att_isnull(i) {
            usecache = false;
            continue;
        }

        match (usecache, schema.cached_offset(i)) {
            (true, Some(cached)) => off = cached,
            _ if col.is_varlena() => {
                if usecache && off == col.align().align_offset(off) {
                    schema.set_cached_offset(i, off);
                } else {
                    off = align_pointer(col.align(), data, off);
                    usecache = false;
                    trace!(column = i, offset = off, "located value by pad-byte scan");
                }
            }
            _ => {
                off = col.align().align_offset(off);
                if usecache {
                    schema.set_cached_offset(i, off);
                }
            }
        }

        if i == idx {
            break;
        }

        off += att_size(col, data, off)?;

        if usecache && !col.is_fixed() {
            usecache = false;
        }
    }

    fetch(&cols[idx], data, off).map(|(d, _)| d)
}

/// Fetches column `attnum` (1-based) of a row.
///
/// Columns the row predates read as the schema's missing value, or null.
pub fn getattr<'a, R: DecodableRow + ?Sized>(
    row: &'a R,
    schema: &Schema,
    attnum: usize,
) -> Result<Option<Datum<'a>>> {
    let idx = column_index(attnum, schema.column_count())?;
    check_row_natts(row, schema)?;

    if idx >= row.natts() {
        return Ok(schema.default_for(idx).cloned());
    }

    if !row.has_nulls() {
        if let Some(off) = schema.cached_offset(idx) {
            return fetch(&schema.columns()[idx], row.data(), off).map(|(d, _)| Some(d));
        }
    } else if row.att_isnull(idx) {
        return Ok(None);
    }

    nocachegetattr(row, schema, idx).map(Some)
}

/// Null test for column `attnum` (1-based) without fetching it.
pub fn attisnull<R: DecodableRow + ?Sized>(row: &R, schema: &Schema, attnum: usize) -> Result<bool> {
    let idx = column_index(attnum, schema.column_count())?;
    check_row_natts(row, schema)?;

    if idx >= row.natts() {
        return Ok(schema.default_for(idx).is_none());
    }
    Ok(row.att_isnull(idx))
}

/// Resumable decode state for one row-reading session.
///
/// `nvalid` only grows. The offset and slow flag describe where the walk stood
/// after column `nvalid`, so the next request continues from there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeCursor {
    nvalid: usize,
    off: usize,
    slow: bool,
}

impl DecodeCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nvalid(&self) -> usize {
        self.nvalid
    }

    pub fn offset(&self) -> usize {
        self.off
    }

    pub fn is_slow(&self) -> bool {
        self.slow
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Decodes stored columns `cursor.nvalid..natts`, handing each to `emit`
/// together with its 0-based index.
pub(crate) fn deform_walk<'a, R, F>(
    row: &'a R,
    schema: &Schema,
    cursor: &mut DecodeCursor,
    natts: usize,
    mut emit: F,
) -> Result<()>
where
    R: DecodableRow + ?Sized,
    F: FnMut(usize, Option<Datum<'a>>),
{
    if natts <= cursor.nvalid {
        return Ok(());
    }
    ensure!(
        natts <= row.natts() && natts <= schema.column_count(),
        RowError::invalid(format!(
            "cannot decode {} columns from row storing {}",
            natts,
            row.natts()
        ))
    );

    let data = row.data();
    let cols = schema.columns();
    let has_nulls = row.has_nulls();

    let (mut off, mut slow) = if cursor.nvalid == 0 {
        (0, false)
    } else {
        (cursor.off, cursor.slow)
    };

    for (i, col) in cols.iter().enumerate().take(natts).skip(cursor.nvalid) {
        if has_nulls && row.att_isnull(i) {
            emit(i, None);
            slow = true;
            continue;
        }

        match (slow, schema.cached_offset(i)) {
            (false, Some(cached)) => off = cached,
            _ if col.is_varlena() => {
                if !slow && off == col.align().align_offset(off) {
                    schema.set_cached_offset(i, off);
                } else {
                    off = align_pointer(col.align(), data, off);
                    slow = true;
                    trace!(column = i, offset = off, "located value by pad-byte scan");
                }
            }
            _ => {
                off = col.align().align_offset(off);
                if !slow {
                    schema.set_cached_offset(i, off);
                }
            }
        }

        let (datum, size) = fetch(col, data, off)?;
        emit(i, Some(datum));
        off += size;

        if !col.is_fixed() {
            slow = true;
        }
    }

    cursor.nvalid = natts;
    cursor.off = off;
    cursor.slow = slow;
    Ok(())
}

/// Decodes every column of the schema in one pass. Columns the row predates
/// read as missing values or null.
pub fn deform_tuple<'a, R: DecodableRow + ?Sized>(
    row: &'a R,
    schema: &Schema,
) -> Result<Vec<Option<Datum<'a>>>> {
    check_row_natts(row, schema)?;

    let natts = schema.column_count();
    let mut values = Vec::with_capacity(natts);
    let mut cursor = DecodeCursor::new();
    deform_walk(row, schema, &mut cursor, row.natts(), |_, v| values.push(v))?;

    for idx in row.natts()..natts {
        values.push(schema.default_for(idx).cloned());
    }
    Ok(values)
}

/// Decodes columns incrementally, resuming from `cursor`.
///
/// `values` must hold exactly the `cursor.nvalid()` values produced by earlier
/// calls with the same cursor. Requests at or below the watermark are no-ops.
pub fn deform_incremental<'a, R: DecodableRow + ?Sized>(
    row: &'a R,
    schema: &Schema,
    cursor: &mut DecodeCursor,
    values: &mut Vec<Option<Datum<'a>>>,
    natts: usize,
) -> Result<()> {
    ensure!(
        values.len() == cursor.nvalid,
        RowError::invalid(format!(
            "cursor covers {} columns but {} values were supplied",
            cursor.nvalid,
            values.len()
        ))
    );
    check_row_natts(row, schema)?;
    deform_walk(row, schema, cursor, natts, |_, v| values.push(v))
}
