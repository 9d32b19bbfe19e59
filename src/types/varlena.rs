//! # Variable-Length Value Headers
//!
//! Every variable-length value carries its own length in one of three header
//! forms. All multi-byte headers are little-endian.
//!
//! ```text
//! long (aligned)      short (unaligned)     out-of-line (unaligned)
//! +--------------+    +--------+            +------+-----+-----------+
//! | len<<2 (u32) |    | len<<1 |            | 0x01 | tag | payload.. |
//! | low bits 00  |    |   | 1  |            +------+-----+-----------+
//! +--------------+    +--------+
//! ```
//!
//! A short header byte is never zero, and neither is the out-of-line marker.
//! Row decoding depends on this: alignment padding is always zero, so the first
//! non-zero byte at or after an unaligned offset is the start of a value.
//!
//! The length stored in a header is the total length including the header.

use eyre::{ensure, Result};

use crate::config::{VARATT_SHORT_MAX, VARATT_SHORT_PAYLOAD_MAX, VARHDRSZ, VARHDRSZ_EXTERNAL,
    VARHDRSZ_SHORT, VARLENA_MAX_SIZE};
use crate::error::RowError;

/// Tag of an on-disk out-of-line pointer.
pub const VARTAG_ONDISK: u8 = 18;

/// Payload size of an on-disk out-of-line pointer.
pub const VARTAG_ONDISK_SIZE: usize = 16;

/// Marker byte that introduces an out-of-line reference.
pub const VARATT_EXTERNAL_MARKER: u8 = 0x01;

#[inline]
pub fn is_external(first: u8) -> bool {
    first == VARATT_EXTERNAL_MARKER
}

#[inline]
pub fn is_short(first: u8) -> bool {
    first & 0x01 == 0x01 && !is_external(first)
}

#[inline]
pub fn is_long(first: u8) -> bool {
    first & 0x01 == 0x00
}

/// Long header whose low bits mark the value as uncompressed.
#[inline]
pub fn is_long_uncompressed(first: u8) -> bool {
    first & 0x03 == 0x00
}

/// Payload size for a given out-of-line tag.
pub fn external_payload_size(tag: u8) -> Result<usize> {
    match tag {
        VARTAG_ONDISK => Ok(VARTAG_ONDISK_SIZE),
        _ => Err(RowError::corrupted(format!("unrecognized out-of-line tag {}", tag)).into()),
    }
}

/// Total size of the value starting at `bytes[0]`, header included.
///
/// Only the header is inspected; callers check the result against the
/// available bytes.
pub fn size_any(bytes: &[u8]) -> Result<usize> {
    let first = *bytes
        .first()
        .ok_or_else(|| RowError::corrupted("variable-length value starts past end of row"))?;

    if is_external(first) {
        let tag = *bytes
            .get(1)
            .ok_or_else(|| RowError::corrupted("truncated out-of-line reference"))?;
        return Ok(VARHDRSZ_EXTERNAL + external_payload_size(tag)?);
    }

    if is_short(first) {
        return Ok((first >> 1) as usize);
    }

    let header: [u8; VARHDRSZ] = bytes
        .get(..VARHDRSZ)
        .and_then(|h| h.try_into().ok())
        .ok_or_else(|| RowError::corrupted("truncated long varlena header"))?;
    let total = ((u32::from_le_bytes(header) >> 2) as usize) & VARLENA_MAX_SIZE;
    ensure!(
        total >= VARHDRSZ,
        RowError::corrupted(format!("long varlena header claims {} bytes", total))
    );
    Ok(total)
}

/// Size of the header preceding the payload.
pub fn header_size(first: u8) -> usize {
    if is_external(first) {
        VARHDRSZ_EXTERNAL
    } else if is_short(first) {
        VARHDRSZ_SHORT
    } else {
        VARHDRSZ
    }
}

/// Payload of a complete value image (short, long, or out-of-line).
pub fn payload(image: &[u8]) -> &[u8] {
    match image.first() {
        Some(&first) => image.get(header_size(first)..).unwrap_or(&[]),
        None => &[],
    }
}

/// Writes a long header for a value of `total` bytes.
#[inline]
pub fn write_long_header(dest: &mut [u8], total: usize) {
    let header = ((total as u32) << 2).to_le_bytes();
    dest[..VARHDRSZ].copy_from_slice(&header);
}

/// Short header byte for a value of `total` bytes.
#[inline]
pub fn short_header(total: usize) -> u8 {
    debug_assert!(total <= VARATT_SHORT_MAX);
    ((total as u8) << 1) | 0x01
}

/// Builds a long-header image around `payload`.
pub fn long_from_payload(payload: &[u8]) -> Vec<u8> {
    let total = payload.len() + VARHDRSZ;
    let mut out = vec![0u8; total];
    write_long_header(&mut out, total);
    out[VARHDRSZ..].copy_from_slice(payload);
    out
}

/// Builds a short-header image around `payload` (at most 126 bytes).
pub fn short_from_payload(payload: &[u8]) -> Result<Vec<u8>> {
    ensure!(
        payload.len() <= VARATT_SHORT_PAYLOAD_MAX,
        RowError::invalid(format!(
            "payload of {} bytes does not fit a short header",
            payload.len()
        ))
    );
    let mut out = Vec::with_capacity(payload.len() + VARHDRSZ_SHORT);
    out.push(short_header(payload.len() + VARHDRSZ_SHORT));
    out.extend_from_slice(payload);
    Ok(out)
}

/// True when a long-header image can be rewritten with a short header.
pub fn can_make_short(image: &[u8]) -> bool {
    match image.first() {
        Some(&first) if is_long_uncompressed(first) => {
            image.len() >= VARHDRSZ && image.len() - VARHDRSZ <= VARATT_SHORT_PAYLOAD_MAX
        }
        _ => false,
    }
}

/// Encoded size after the short-header rewrite.
#[inline]
pub fn converted_short_size(image: &[u8]) -> usize {
    image.len() - VARHDRSZ + VARHDRSZ_SHORT
}
