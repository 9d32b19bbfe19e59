//! # Column Packing Plan
//!
//! The size estimator and the encoder must agree byte for byte. Both therefore
//! go through one decision function, [`plan`], which classifies a value into a
//! [`Packing`] that knows its alignment, its encoded size, and how to write
//! itself. The estimator only sums; the encoder sums and writes.
//!
//! ## Variable-Length Cases
//!
//! Checked in this order; the first match wins.
//!
//! | # | Value | Alignment | Written bytes |
//! |---|-------|-----------|---------------|
//! | 1 | expanded object | column | flattened long image |
//! | 2 | out-of-line reference | none | reference verbatim, sets `HAS_EXTERNAL` |
//! | 3 | short header | none | verbatim |
//! | 4 | long header, packable column, payload <= 126 | none | 1-byte header + payload |
//! | 5 | long header otherwise | column | verbatim |
//!
//! Every variable-length and cstring value sets `HAS_VARWIDTH`.

use eyre::{ensure, Result};

use super::header::flags;
use crate::error::RowError;
use crate::types::{varlena, Align, ColumnDef, Datum, ExpandedObject, StorageLength};

pub(crate) enum Packing<'v> {
    ByVal { value: u64, len: usize, align: Align },
    Fixed { bytes: &'v [u8], align: Align },
    CString { bytes: &'v [u8] },
    Expanded { obj: &'v dyn ExpandedObject, size: usize, align: Align },
    External { image: &'v [u8] },
    Short { image: &'v [u8] },
    MakeShort { payload: &'v [u8] },
    Long { image: &'v [u8], align: Align },
}

impl Packing<'_> {
    #[inline]
    pub(crate) fn align(&self) -> Option<Align> {
        match self {
            Packing::ByVal { align, .. }
            | Packing::Fixed { align, .. }
            | Packing::Expanded { align, .. }
            | Packing::Long { align, .. } => Some(*align),
            Packing::CString { .. }
            | Packing::External { .. }
            | Packing::Short { .. }
            | Packing::MakeShort { .. } => None,
        }
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        match self {
            Packing::ByVal { len, .. } => *len,
            Packing::Fixed { bytes, .. } => bytes.len(),
            Packing::CString { bytes } => bytes.len() + 1,
            Packing::Expanded { size, .. } => *size,
            Packing::External { image } | Packing::Short { image } | Packing::Long { image, .. } => {
                image.len()
            }
            Packing::MakeShort { payload } => payload.len() + 1,
        }
    }

    /// Infomask bits this value contributes.
    pub(crate) fn infomask(&self) -> u16 {
        match self {
            Packing::ByVal { .. } | Packing::Fixed { .. } => 0,
            Packing::External { .. } => flags::HAS_VARWIDTH | flags::HAS_EXTERNAL,
            _ => flags::HAS_VARWIDTH,
        }
    }

    /// Offset after placing this value at `off`.
    #[inline]
    pub(crate) fn advance(&self, off: usize) -> usize {
        let start = match self.align() {
            Some(align) => align.align_offset(off),
            None => off,
        };
        start + self.size()
    }

    /// Writes the value into `dest`, which is exactly `size()` bytes.
    fn write(&self, dest: &mut [u8]) {
        match self {
            Packing::ByVal { value, len, .. } => {
                dest.copy_from_slice(&value.to_le_bytes()[..*len]);
            }
            Packing::Fixed { bytes, .. } => dest.copy_from_slice(bytes),
            Packing::CString { bytes } => {
                dest[..bytes.len()].copy_from_slice(bytes);
                dest[bytes.len()] = 0;
            }
            Packing::Expanded { obj, .. } => obj.flatten_into(dest),
            Packing::External { image } | Packing::Short { image } | Packing::Long { image, .. } => {
                dest.copy_from_slice(image)
            }
            Packing::MakeShort { payload } => {
                dest[0] = varlena::short_header(payload.len() + 1);
                dest[1..].copy_from_slice(payload);
            }
        }
    }
}

/// Classifies `value` for storage in `col`.
pub(crate) fn plan<'v>(col: &ColumnDef, value: &'v Datum<'_>) -> Result<Packing<'v>> {
    match (col.storage_length(), value) {
        (StorageLength::Fixed(len), Datum::ByVal(v)) if col.by_val() => {
            let len = len as usize;
            ensure!(
                len == 8 || *v >> (len * 8) == 0,
                RowError::invalid(format!(
                    "value {:#x} does not fit {}-byte column \"{}\"",
                    v,
                    len,
                    col.name()
                ))
            );
            Ok(Packing::ByVal {
                value: *v,
                len,
                align: col.align(),
            })
        }
        (StorageLength::Fixed(len), Datum::Ref(bytes)) if !col.by_val() => {
            ensure!(
                bytes.len() == len as usize,
                RowError::invalid(format!(
                    "column \"{}\" holds {} bytes, value has {}",
                    col.name(),
                    len,
                    bytes.len()
                ))
            );
            Ok(Packing::Fixed {
                bytes,
                align: col.align(),
            })
        }
        (StorageLength::CString, Datum::CString(bytes)) => {
            ensure!(
                !bytes.contains(&0),
                RowError::invalid(format!("cstring for column \"{}\" contains NUL", col.name()))
            );
            Ok(Packing::CString { bytes })
        }
        (StorageLength::Varlena, Datum::Expanded(obj)) => {
            let size = obj.flat_size();
            ensure!(
                size >= crate::config::VARHDRSZ,
                RowError::invalid(format!("expanded value of {} bytes", size))
            );
            Ok(Packing::Expanded {
                obj: obj.as_ref(),
                size,
                align: col.align(),
            })
        }
        (StorageLength::Varlena, Datum::Varlena(image)) => plan_varlena(col, image),
        _ => Err(RowError::invalid(format!(
            "{:?} value cannot be stored in {:?} column \"{}\"",
            value,
            col.storage_length(),
            col.name()
        ))
        .into()),
    }
}

fn plan_varlena<'v>(col: &ColumnDef, image: &'v [u8]) -> Result<Packing<'v>> {
    let size = varlena::size_any(image)?;
    ensure!(
        size == image.len(),
        RowError::invalid(format!(
            "variable-length value for column \"{}\" declares {} bytes, has {}",
            col.name(),
            size,
            image.len()
        ))
    );

    let first = image[0];
    if varlena::is_external(first) {
        return Ok(Packing::External { image });
    }
    if varlena::is_short(first) {
        return Ok(Packing::Short { image });
    }
    if col.storage().is_packable() && varlena::can_make_short(image) {
        return Ok(Packing::MakeShort {
            payload: varlena::payload(image),
        });
    }
    Ok(Packing::Long {
        image,
        align: col.align(),
    })
}

/// Writes packed values into a zeroed data region.
pub(crate) struct DataWriter<'d> {
    data: &'d mut [u8],
    off: usize,
    infomask: u16,
}

impl<'d> DataWriter<'d> {
    pub(crate) fn new(data: &'d mut [u8], start: usize) -> Self {
        Self {
            data,
            off: start,
            infomask: 0,
        }
    }

    pub(crate) fn put(&mut self, packing: &Packing<'_>) -> Result<()> {
        let start = match packing.align() {
            Some(align) => align.align_offset(self.off),
            None => self.off,
        };
        let end = start + packing.size();
        let len = self.data.len();
        let dest = self.data.get_mut(start..end).ok_or_else(|| {
            RowError::corrupted(format!(
                "encoded data overruns estimate: needs {} bytes, buffer holds {}",
                end, len
            ))
        })?;
        packing.write(dest);
        self.infomask |= packing.infomask();
        self.off = end;
        Ok(())
    }

    /// Checks the estimate was met exactly and returns the accumulated flags.
    pub(crate) fn finish(self) -> Result<u16> {
        ensure!(
            self.off == self.data.len(),
            RowError::corrupted(format!(
                "encoded data length {} diverges from estimate {}",
                self.off,
                self.data.len()
            ))
        );
        Ok(self.infomask)
    }
}

/// Sets or clears bit `idx` of a null bitmap (1 = not null).
#[inline]
pub(crate) fn set_bitmap_bit(bitmap: &mut [u8], idx: usize, not_null: bool) {
    let mask = 1u8 << (idx & 0x07);
    if not_null {
        bitmap[idx >> 3] |= mask;
    } else {
        bitmap[idx >> 3] &= !mask;
    }
}
