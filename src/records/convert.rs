//! # Row Shape Conversions
//!
//! Full and minimal rows share their body, so converting between them copies
//! the body and rebuilds only the fixed header. Identity fields are dropped
//! going to the minimal shape and zeroed coming back.
//!
//! A full row doubles as a composite value: its first header field becomes a
//! long varlena length, followed by the declared type modifier and type id.
//! Composite values never carry out-of-line references, so rows with
//! `HAS_EXTERNAL` are re-formed with every reference flattened first.

use std::borrow::Cow;

use eyre::{ensure, Result};
use tracing::debug;

use super::builder::form_tuple;
use super::deform::deform_tuple;
use super::header::{HeapTupleHeader, ItemPointer, MinimalTupleHeader};
use super::schema::Schema;
use super::tuple::{DecodableRow, HeapTuple, MinimalTuple};
use crate::config::{HEAP_TUPLE_HEADER_SIZE, MINIMAL_TUPLE_HEADER_SIZE};
use crate::error::RowError;
use crate::storage::Detoaster;
use crate::types::{flatten_expanded, varlena, Datum};

impl HeapTuple {
    /// Copies the body into a minimal row.
    pub fn to_minimal(&self) -> MinimalTuple {
        let src = self.header();
        let mut header = MinimalTupleHeader::new(
            MINIMAL_TUPLE_HEADER_SIZE + self.body().len(),
            src.natts(),
            src.infomask(),
            src.hoff(),
        );
        header.set_infomask2(src.infomask2());
        MinimalTuple::from_parts(header, self.body().to_vec())
    }

    /// Rebuilds a full row from a composite value.
    ///
    /// Short-header images are widened back to a long header; expanded objects
    /// are flattened. Out-of-line references are refused since a composite
    /// value is always stored inline.
    pub fn from_composite(value: &Datum<'_>) -> Result<HeapTuple> {
        let image: Cow<'_, [u8]> = match value {
            Datum::Varlena(image) => {
                let first = *image
                    .first()
                    .ok_or_else(|| RowError::corrupted("empty composite value"))?;
                ensure!(
                    !varlena::is_external(first),
                    RowError::invalid("composite value is an out-of-line reference")
                );
                if varlena::is_short(first) {
                    Cow::Owned(varlena::long_from_payload(varlena::payload(image)))
                } else {
                    Cow::Borrowed(&image[..])
                }
            }
            Datum::Expanded(obj) => Cow::Owned(flatten_expanded(obj.as_ref())),
            other => {
                return Err(RowError::invalid(format!("{:?} is not a composite value", other)).into())
            }
        };

        let declared = varlena::size_any(&image)?;
        ensure!(
            declared == image.len(),
            RowError::corrupted(format!(
                "composite value declares {} bytes, has {}",
                declared,
                image.len()
            ))
        );
        HeapTuple::from_bytes(&image)
    }
}

impl MinimalTuple {
    /// Copies the body into a full row with zeroed identity fields.
    pub fn to_heap(&self) -> HeapTuple {
        let src = self.header();
        let mut header = HeapTupleHeader::new(src.natts(), src.infomask(), src.hoff());
        header.set_infomask2(src.infomask2());
        header.set_ctid(ItemPointer::new(0, 0));
        HeapTuple::from_parts(header, self.body().to_vec())
    }
}

/// Copies a full row into a self-contained composite value.
///
/// A row holding out-of-line references needs `detoaster` to inline them;
/// without one the call fails with an invalid-argument error.
pub fn copy_tuple_as_datum(
    tuple: &HeapTuple,
    schema: &Schema,
    detoaster: Option<&dyn Detoaster>,
) -> Result<Datum<'static>> {
    let flattened;
    let source = if tuple.has_external() {
        let detoaster = detoaster.ok_or_else(|| {
            RowError::invalid("row holds out-of-line values but no detoaster was given")
        })?;

        let mut values = deform_tuple(tuple, schema)?;
        let mut inlined = 0usize;
        for value in values.iter_mut() {
            if let Some(datum) = value {
                if datum.is_external() {
                    let image = datum
                        .varlena_image()
                        .ok_or_else(|| RowError::corrupted("external value without image"))?;
                    *datum = Datum::Varlena(Cow::Owned(detoaster.detoast(image)?));
                    inlined += 1;
                }
            }
        }

        let mut formed = form_tuple(schema, &values)?;
        if schema.has_oid() && tuple.has_oid() {
            formed.set_oid(tuple.oid())?;
        }
        debug!(inlined, "flattened out-of-line values into composite");
        flattened = formed;
        &flattened
    } else {
        tuple
    };

    let mut header = *source.header();
    header.set_datum_len(HEAP_TUPLE_HEADER_SIZE + source.body().len());
    header.set_datum_typeid(schema.type_id());
    header.set_datum_typmod(schema.type_mod());

    let mut bytes = Vec::with_capacity(source.len());
    bytes.extend_from_slice(zerocopy::IntoBytes::as_bytes(&header));
    bytes.extend_from_slice(source.body());
    Ok(Datum::Varlena(Cow::Owned(bytes)))
}
