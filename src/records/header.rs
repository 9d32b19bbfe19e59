//! # Row Headers
//!
//! Zerocopy views of the two fixed header shapes. Both are `Unaligned` so they
//! can be read from any byte offset, and both are followed by the same body:
//!
//! ```text
//! Full row (23 bytes)
//! +-------+-------+-------+-------------+-----------+----------+------+
//! | xmin  | xmax  | cid   | ctid        | infomask2 | infomask | hoff |
//! | u32   | u32   | u32   | u16 u16 u16 | u16       | u16      | u8   |
//! +-------+-------+-------+-------------+-----------+----------+------+
//!
//! Minimal row (15 bytes)
//! +-------+------------+-----------+----------+------+
//! | t_len | padding    | infomask2 | infomask | hoff |
//! | u32   | 6 bytes    | u16       | u16      | u8   |
//! +-------+------------+-----------+----------+------+
//!
//! Shared body
//! +-------------+---------+-----------+--------------+
//! | null bitmap | padding | oid (opt) | data region  |
//! +-------------+---------+-----------+--------------+
//!               ^ hoff - OID_SIZE     ^ hoff
//! ```
//!
//! `hoff` is always measured from the start of a full header, so the same value
//! is stored in both shapes. A minimal row's data therefore begins at
//! `hoff - MINIMAL_TUPLE_OFFSET` inside the minimal image.
//!
//! When a full row is reinterpreted as a composite value, its first three
//! fields hold the value's length header, type modifier, and type id instead
//! of transaction information.

use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{HEAP_NATTS_MASK, HEAP_TUPLE_HEADER_SIZE, MINIMAL_TUPLE_HEADER_SIZE};
use crate::types::varlena;

/// Bits of `infomask` maintained by the codec.
pub mod flags {
    pub const HAS_NULLS: u16 = 0x0001;
    pub const HAS_VARWIDTH: u16 = 0x0002;
    pub const HAS_EXTERNAL: u16 = 0x0004;
    pub const HAS_OID: u16 = 0x0008;

    pub const LAYOUT_MASK: u16 = HAS_NULLS | HAS_VARWIDTH | HAS_EXTERNAL | HAS_OID;
}

/// Physical location of a row: block number and line pointer offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemPointer {
    pub block: u32,
    pub offset: u16,
}

impl ItemPointer {
    pub const INVALID: ItemPointer = ItemPointer {
        block: u32::MAX,
        offset: 0,
    };

    pub fn new(block: u32, offset: u16) -> Self {
        Self { block, offset }
    }

    pub fn is_valid(&self) -> bool {
        self.offset != 0
    }

    /// Six-byte image: block high half, block low half, offset.
    pub fn to_bytes(&self) -> [u8; 6] {
        let mut out = [0u8; 6];
        out[0..2].copy_from_slice(&((self.block >> 16) as u16).to_le_bytes());
        out[2..4].copy_from_slice(&((self.block & 0xFFFF) as u16).to_le_bytes());
        out[4..6].copy_from_slice(&self.offset.to_le_bytes());
        out
    }
}

impl Default for ItemPointer {
    fn default() -> Self {
        Self::INVALID
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct HeapTupleHeader {
    xmin: U32,
    xmax: U32,
    cid: U32,
    ctid_block_hi: U16,
    ctid_block_lo: U16,
    ctid_offset: U16,
    infomask2: U16,
    infomask: U16,
    hoff: u8,
}

const _: () = assert!(std::mem::size_of::<HeapTupleHeader>() == HEAP_TUPLE_HEADER_SIZE);

impl HeapTupleHeader {
    zerocopy_accessors! {
        xmin: u32,
        xmax: u32,
        cid: u32,
        infomask2: u16,
        infomask: u16,
    }

    pub fn new(natts: usize, infomask: u16, hoff: u8) -> Self {
        let mut header = Self::new_zeroed();
        header.set_natts(natts);
        header.set_infomask(infomask);
        header.hoff = hoff;
        header.set_ctid(ItemPointer::INVALID);
        header
    }

    pub fn natts(&self) -> usize {
        (self.infomask2() & HEAP_NATTS_MASK) as usize
    }

    pub fn set_natts(&mut self, natts: usize) {
        let rest = self.infomask2() & !HEAP_NATTS_MASK;
        self.set_infomask2(rest | (natts as u16 & HEAP_NATTS_MASK));
    }

    pub fn hoff(&self) -> u8 {
        self.hoff
    }

    pub fn ctid(&self) -> ItemPointer {
        let block = ((self.ctid_block_hi.get() as u32) << 16) | self.ctid_block_lo.get() as u32;
        ItemPointer::new(block, self.ctid_offset.get())
    }

    pub fn set_ctid(&mut self, ptr: ItemPointer) {
        self.ctid_block_hi = U16::new((ptr.block >> 16) as u16);
        self.ctid_block_lo = U16::new((ptr.block & 0xFFFF) as u16);
        self.ctid_offset = U16::new(ptr.offset);
    }

    /// Composite-value length, stored as a long varlena header over `xmin`.
    pub fn datum_len(&self) -> usize {
        (self.xmin() >> 2) as usize
    }

    pub fn set_datum_len(&mut self, len: usize) {
        varlena::write_long_header(self.xmin.as_mut_bytes(), len);
    }

    pub fn datum_typmod(&self) -> i32 {
        self.xmax() as i32
    }

    pub fn set_datum_typmod(&mut self, typmod: i32) {
        self.set_xmax(typmod as u32);
    }

    pub fn datum_typeid(&self) -> u32 {
        self.cid()
    }

    pub fn set_datum_typeid(&mut self, type_id: u32) {
        self.set_cid(type_id);
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct MinimalTupleHeader {
    t_len: U32,
    padding: [u8; 6],
    infomask2: U16,
    infomask: U16,
    hoff: u8,
}

const _: () = assert!(std::mem::size_of::<MinimalTupleHeader>() == MINIMAL_TUPLE_HEADER_SIZE);

impl MinimalTupleHeader {
    zerocopy_accessors! {
        t_len: u32,
        infomask2: u16,
        infomask: u16,
    }

    pub fn new(t_len: usize, natts: usize, infomask: u16, hoff: u8) -> Self {
        let mut header = Self::new_zeroed();
        header.set_t_len(t_len as u32);
        header.set_infomask2(natts as u16 & HEAP_NATTS_MASK);
        header.set_infomask(infomask);
        header.hoff = hoff;
        header
    }

    pub fn natts(&self) -> usize {
        (self.infomask2() & HEAP_NATTS_MASK) as usize
    }

    pub fn hoff(&self) -> u8 {
        self.hoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natts_preserves_upper_infomask2_bits() {
        let mut header = HeapTupleHeader::new(3, 0, 24);
        header.set_infomask2(0x4000 | header.infomask2());
        header.set_natts(1600);
        assert_eq!(header.natts(), 1600);
        assert_eq!(header.infomask2() & 0x4000, 0x4000);
    }

    #[test]
    fn ctid_roundtrip() {
        let mut header = HeapTupleHeader::new(1, 0, 24);
        assert_eq!(header.ctid(), ItemPointer::INVALID);
        header.set_ctid(ItemPointer::new(0x0001_0002, 7));
        assert_eq!(header.ctid(), ItemPointer::new(0x0001_0002, 7));
    }

    #[test]
    fn datum_fields_overlay_transaction_fields() {
        let mut header = HeapTupleHeader::new(2, 0, 24);
        header.set_datum_len(40);
        header.set_datum_typeid(2249);
        header.set_datum_typmod(-1);
        assert_eq!(header.datum_len(), 40);
        assert_eq!(header.xmin(), 40 << 2);
        assert_eq!(header.cid(), 2249);
        assert_eq!(header.xmax(), u32::MAX);

        let bytes = header.as_bytes();
        assert_eq!(varlena::size_any(bytes).unwrap(), 40);
    }

    #[test]
    fn headers_parse_from_unaligned_bytes() {
        let header = MinimalTupleHeader::new(40, 5, flags::HAS_NULLS, 32);
        let mut buf = vec![0xAAu8];
        buf.extend_from_slice(header.as_bytes());
        let (parsed, rest) = MinimalTupleHeader::read_from_prefix(&buf[1..]).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.natts(), 5);
        assert_eq!(parsed.t_len(), 40);
        assert_eq!(parsed.hoff(), 32);
    }

    #[test]
    fn item_pointer_bytes() {
        let ptr = ItemPointer::new(0x0003_0004, 9);
        assert_eq!(ptr.to_bytes(), [3, 0, 4, 0, 9, 0]);
        assert!(ptr.is_valid());
        assert!(!ItemPointer::INVALID.is_valid());
    }
}
