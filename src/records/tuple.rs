//! # Encoded Rows
//!
//! Two owned row shapes share one body layout:
//!
//! - [`HeapTuple`]: full header with location, table identity and transaction
//!   fields. This is what storage keeps.
//! - [`MinimalTuple`]: only column count, flags and data offset. Used for
//!   transient rows (sorting, hashing, grouping) where provenance is irrelevant.
//!
//! Both implement [`DecodableRow`], the capability the decoders are written
//! against. Converting between the shapes is an explicit copy, never an in-place
//! reinterpretation.
//!
//! ## Body Contract
//!
//! All padding bytes in a body are zero. The decoder relies on this to find the
//! start of variable-length values that follow an unaligned offset, so any code
//! that builds a body must start from a zeroed buffer.

use eyre::{ensure, Result};
use zerocopy::{FromBytes, IntoBytes};

use super::header::{flags, HeapTupleHeader, ItemPointer, MinimalTupleHeader};
use super::schema::Schema;
use crate::config::{
    HEAP_TUPLE_HEADER_SIZE, MAXIMUM_ALIGNOF, MAX_TUPLE_ATTRIBUTE_NUMBER, MINIMAL_TUPLE_HEADER_SIZE,
    OID_SIZE,
};
use crate::error::RowError;

/// Read access shared by both row shapes.
pub trait DecodableRow {
    /// Stored column count.
    fn natts(&self) -> usize;

    fn infomask(&self) -> u16;

    /// Data-start offset, measured from the start of a full header.
    fn hoff(&self) -> usize;

    /// Bytes following the fixed header: bitmap, padding, oid and data.
    fn body(&self) -> &[u8];

    fn has_nulls(&self) -> bool {
        self.infomask() & flags::HAS_NULLS != 0
    }

    fn has_varwidth(&self) -> bool {
        self.infomask() & flags::HAS_VARWIDTH != 0
    }

    fn has_external(&self) -> bool {
        self.infomask() & flags::HAS_EXTERNAL != 0
    }

    fn has_oid(&self) -> bool {
        self.infomask() & flags::HAS_OID != 0
    }

    fn null_bitmap(&self) -> Option<&[u8]> {
        if !self.has_nulls() {
            return None;
        }
        self.body().get(..Schema::null_bitmap_size(self.natts()))
    }

    fn data(&self) -> &[u8] {
        self.body()
            .get(self.hoff().saturating_sub(HEAP_TUPLE_HEADER_SIZE)..)
            .unwrap_or(&[])
    }

    /// Null test for a 0-based stored column.
    fn att_isnull(&self, idx: usize) -> bool {
        match self.null_bitmap() {
            Some(bp) => bp.get(idx >> 3).map_or(true, |b| b & (1 << (idx & 0x07)) == 0),
            None => false,
        }
    }

    /// Identity field, or 0 when the row has none.
    fn oid(&self) -> u32 {
        if !self.has_oid() {
            return 0;
        }
        let end = self.hoff().saturating_sub(HEAP_TUPLE_HEADER_SIZE);
        let start = end.saturating_sub(OID_SIZE);
        match self.body().get(start..end) {
            Some(bytes) => {
                let mut raw = [0u8; OID_SIZE];
                raw.copy_from_slice(bytes);
                u32::from_le_bytes(raw)
            }
            None => 0,
        }
    }
}

/// Minimum data-start offset for a row with the given layout.
pub(crate) fn compute_hoff(natts: usize, has_nulls: bool, has_oid: bool) -> usize {
    let mut len = HEAP_TUPLE_HEADER_SIZE;
    if has_nulls {
        len += Schema::null_bitmap_size(natts);
    }
    if has_oid {
        len += OID_SIZE;
    }
    len.next_multiple_of(MAXIMUM_ALIGNOF)
}

/// Rejects column counts above the row limit.
pub(crate) fn check_column_limit(count: usize) -> Result<()> {
    ensure!(
        count <= MAX_TUPLE_ATTRIBUTE_NUMBER,
        RowError::TooManyColumns {
            count,
            limit: MAX_TUPLE_ATTRIBUTE_NUMBER,
        }
    );
    Ok(())
}

/// Narrows a data-start offset to the header's one-byte field.
pub(crate) fn hoff_byte(hoff: usize) -> Result<u8> {
    u8::try_from(hoff).map_err(|_| {
        RowError::invalid(format!("data offset {} does not fit the row header", hoff)).into()
    })
}

fn validate_body(natts: usize, infomask: u16, hoff: usize, body_len: usize) -> Result<()> {
    let minimum = compute_hoff(
        natts,
        infomask & flags::HAS_NULLS != 0,
        infomask & flags::HAS_OID != 0,
    );
    ensure!(
        hoff >= minimum && hoff % MAXIMUM_ALIGNOF == 0,
        RowError::corrupted(format!(
            "data offset {} invalid for {} columns (minimum {})",
            hoff, natts, minimum
        ))
    );
    ensure!(
        hoff <= HEAP_TUPLE_HEADER_SIZE + body_len,
        RowError::corrupted(format!(
            "data offset {} beyond row of {} bytes",
            hoff,
            HEAP_TUPLE_HEADER_SIZE + body_len
        ))
    );
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapTuple {
    self_ptr: ItemPointer,
    table_oid: u32,
    header: HeapTupleHeader,
    body: Vec<u8>,
}

impl HeapTuple {
    pub(crate) fn from_parts(header: HeapTupleHeader, body: Vec<u8>) -> Self {
        Self {
            self_ptr: ItemPointer::INVALID,
            table_oid: 0,
            header,
            body,
        }
    }

    /// Parses a complete full-row image.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (header, body) = HeapTupleHeader::read_from_prefix(bytes).map_err(|_| {
            RowError::corrupted(format!(
                "row of {} bytes is shorter than its {}-byte header",
                bytes.len(),
                HEAP_TUPLE_HEADER_SIZE
            ))
        })?;
        validate_body(header.natts(), header.infomask(), header.hoff() as usize, body.len())?;
        Ok(Self::from_parts(header, body.to_vec()))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(self.header.as_bytes());
        out.extend_from_slice(&self.body);
        out
    }

    /// Total encoded length, header included.
    pub fn len(&self) -> usize {
        HEAP_TUPLE_HEADER_SIZE + self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn header(&self) -> &HeapTupleHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut HeapTupleHeader {
        &mut self.header
    }

    pub fn self_ptr(&self) -> ItemPointer {
        self.self_ptr
    }

    pub fn set_self_ptr(&mut self, ptr: ItemPointer) {
        self.self_ptr = ptr;
    }

    pub fn table_oid(&self) -> u32 {
        self.table_oid
    }

    pub fn set_table_oid(&mut self, oid: u32) {
        self.table_oid = oid;
    }

    pub fn set_oid(&mut self, oid: u32) -> Result<()> {
        ensure!(
            self.has_oid(),
            RowError::invalid("row was built without an identity field")
        );
        let end = self.header.hoff() as usize - HEAP_TUPLE_HEADER_SIZE;
        self.body[end - OID_SIZE..end].copy_from_slice(&oid.to_le_bytes());
        Ok(())
    }

}

impl DecodableRow for HeapTuple {
    fn natts(&self) -> usize {
        self.header.natts()
    }

    fn infomask(&self) -> u16 {
        self.header.infomask()
    }

    fn hoff(&self) -> usize {
        self.header.hoff() as usize
    }

    fn body(&self) -> &[u8] {
        &self.body
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinimalTuple {
    header: MinimalTupleHeader,
    body: Vec<u8>,
}

impl MinimalTuple {
    pub(crate) fn from_parts(header: MinimalTupleHeader, body: Vec<u8>) -> Self {
        Self { header, body }
    }

    /// Parses a complete minimal-row image.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (header, body) = MinimalTupleHeader::read_from_prefix(bytes).map_err(|_| {
            RowError::corrupted(format!(
                "minimal row of {} bytes is shorter than its {}-byte header",
                bytes.len(),
                MINIMAL_TUPLE_HEADER_SIZE
            ))
        })?;
        ensure!(
            header.t_len() as usize == bytes.len(),
            RowError::corrupted(format!(
                "minimal row length field {} disagrees with {} bytes",
                header.t_len(),
                bytes.len()
            ))
        );
        validate_body(header.natts(), header.infomask(), header.hoff() as usize, body.len())?;
        Ok(Self::from_parts(header, body.to_vec()))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(self.header.as_bytes());
        out.extend_from_slice(&self.body);
        out
    }

    pub fn len(&self) -> usize {
        MINIMAL_TUPLE_HEADER_SIZE + self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn header(&self) -> &MinimalTupleHeader {
        &self.header
    }
}

impl DecodableRow for MinimalTuple {
    fn natts(&self) -> usize {
        self.header.natts()
    }

    fn infomask(&self) -> u16 {
        self.header.infomask()
    }

    fn hoff(&self) -> usize {
        self.header.hoff() as usize
    }

    fn body(&self) -> &[u8] {
        &self.body
    }
}
