//! # Row Format Configuration Constants
//!
//! This module centralizes every numeric constant that shapes the binary row
//! layout. Values that depend on each other are co-located and their
//! relationships are enforced with compile-time assertions.
//!
//! ## Dependency Graph
//!
//! ```text
//! MAXIMUM_ALIGNOF (8)
//!       │
//!       ├─> HEAP_TUPLE_HEADER_SIZE (23, padded up to 24 before data)
//!       │
//!       └─> MINIMAL_TUPLE_HEADER_SIZE (15, padded up to 16 before data)
//!             MINIMAL_TUPLE_OFFSET = HEAP - MINIMAL (8)
//!             Both header shapes share the same body, so a data-start offset
//!             recorded in one shape is valid in the other.
//!
//! VARATT_SHORT_MAX (127)
//!       │
//!       └─> VARATT_SHORT_PAYLOAD_MAX (126)
//!             A long-header value whose payload fits is rewritten with a
//!             1-byte header when its column allows packing.
//!
//! MAX_TUPLE_ATTRIBUTE_NUMBER (1664)
//!       │
//!       └─> HEAP_NATTS_MASK (0x07FF) must be able to hold it
//! ```
//!
//! ## Critical Invariants
//!
//! 1. `MINIMAL_TUPLE_OFFSET` is a multiple of `MAXIMUM_ALIGNOF`
//! 2. `MAX_TUPLE_ATTRIBUTE_NUMBER <= HEAP_NATTS_MASK`
//! 3. `VARATT_SHORT_PAYLOAD_MAX + VARHDRSZ_SHORT == VARATT_SHORT_MAX`

// ============================================================================
// ALIGNMENT
// ============================================================================

/// Strictest alignment any column may request (the `double` class).
/// Row data regions always begin on a multiple of this value.
pub const MAXIMUM_ALIGNOF: usize = 8;

// ============================================================================
// ROW HEADERS
// ============================================================================

/// Fixed portion of a full row header, up to where the null bitmap begins.
pub const HEAP_TUPLE_HEADER_SIZE: usize = 23;

/// Fixed portion of a minimal row header, up to where the null bitmap begins.
pub const MINIMAL_TUPLE_HEADER_SIZE: usize = 15;

/// Byte distance between the two header shapes.
pub const MINIMAL_TUPLE_OFFSET: usize = HEAP_TUPLE_HEADER_SIZE - MINIMAL_TUPLE_HEADER_SIZE;

/// Size of the identity field stored just before the data region.
pub const OID_SIZE: usize = 4;

/// Low bits of `infomask2` that carry the stored column count.
pub const HEAP_NATTS_MASK: u16 = 0x07FF;

const _: () = assert!(
    MINIMAL_TUPLE_OFFSET % MAXIMUM_ALIGNOF == 0,
    "header shapes must differ by a whole alignment unit"
);

// ============================================================================
// SCHEMA LIMITS
// ============================================================================

/// Maximum number of columns a single row may carry.
pub const MAX_TUPLE_ATTRIBUTE_NUMBER: usize = 1664;

const _: () = assert!(
    MAX_TUPLE_ATTRIBUTE_NUMBER <= HEAP_NATTS_MASK as usize,
    "column limit does not fit in the natts field"
);

// ============================================================================
// VARIABLE-LENGTH VALUES
// ============================================================================

/// Long header size.
pub const VARHDRSZ: usize = 4;

/// Short header size.
pub const VARHDRSZ_SHORT: usize = 1;

/// Header of an out-of-line reference: marker byte plus tag byte.
pub const VARHDRSZ_EXTERNAL: usize = 2;

/// Largest total size (header included) a short-header value can describe.
pub const VARATT_SHORT_MAX: usize = 0x7F;

/// Largest payload that can be rewritten into short-header form.
pub const VARATT_SHORT_PAYLOAD_MAX: usize = VARATT_SHORT_MAX - VARHDRSZ_SHORT;

/// Largest total size a long header can describe (30 length bits).
pub const VARLENA_MAX_SIZE: usize = 0x3FFF_FFFF;

const _: () = assert!(VARATT_SHORT_PAYLOAD_MAX == 126);

// ============================================================================
// WIRE RECORDS
// ============================================================================

/// Column length sentinel marking a null column in a wire record.
pub const DATA_ROW_NULL: i32 = -1;

/// Column length sentinel marking a nested composite column in a wire record.
pub const DATA_ROW_COMPOSITE: i32 = -2;
