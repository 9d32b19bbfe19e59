//! # Schema Evolution
//!
//! A row written before columns were added stores fewer columns than the
//! current schema. Expanding it produces a row that stores every column:
//!
//! ```text
//! source (K columns)            target (N columns)
//! +--------+--------+           +----------+--------+----------------+
//! | bitmap | data   |    ==>    | bitmap'  | data   | packed missing |
//! | K bits | ...    |           | N bits   | copied | values K..N    |
//! +--------+--------+           +----------+--------+----------------+
//! ```
//!
//! The source data region is copied verbatim. Missing values are packed after
//! it with the regular packing plan; offsets stay relative to the start of the
//! data region, which is always maximally aligned, so their alignment does not
//! depend on where the source row lived. Columns without a missing value become
//! null, and a bitmap is allocated whenever any column ends up null.

use eyre::{ensure, Result};
use tracing::debug;

use super::deform::check_row_natts;
use super::header::{flags, HeapTupleHeader, MinimalTupleHeader};
use super::packing::{plan, set_bitmap_bit, DataWriter, Packing};
use super::schema::Schema;
use super::tuple::{
    check_column_limit, compute_hoff, hoff_byte, DecodableRow, HeapTuple, MinimalTuple,
};
use crate::config::{HEAP_TUPLE_HEADER_SIZE, MINIMAL_TUPLE_HEADER_SIZE, OID_SIZE};
use crate::error::RowError;

struct ExpandedBody {
    body: Vec<u8>,
    infomask: u16,
    hoff: usize,
}

fn expand_body<R: DecodableRow + ?Sized>(source: &R, schema: &Schema) -> Result<ExpandedBody> {
    check_column_limit(schema.column_count())?;
    check_row_natts(source, schema)?;
    let source_natts = source.natts();
    let natts = schema.column_count();
    ensure!(
        source_natts < natts,
        RowError::invalid(format!(
            "row already stores {} of {} columns",
            source_natts, natts
        ))
    );

    let source_data = source.data();
    let mut has_nulls = source.has_nulls();
    let mut data_len = source_data.len();
    let mut appended: Vec<Option<Packing<'_>>> = Vec::with_capacity(natts - source_natts);
    for idx in source_natts..natts {
        match schema.default_for(idx) {
            Some(value) => {
                let packing = plan(&schema.columns()[idx], value)?;
                data_len = packing.advance(data_len);
                appended.push(Some(packing));
            }
            None => {
                has_nulls = true;
                appended.push(None);
            }
        }
    }

    let hoff = compute_hoff(natts, has_nulls, schema.has_oid());
    let prefix_len = hoff - HEAP_TUPLE_HEADER_SIZE;
    let mut body = vec![0u8; prefix_len + data_len];
    let (prefix, data) = body.split_at_mut(prefix_len);

    if has_nulls {
        let bitmap = &mut prefix[..Schema::null_bitmap_size(natts)];
        match source.null_bitmap() {
            Some(source_bits) => bitmap[..source_bits.len()].copy_from_slice(source_bits),
            None => {
                for idx in 0..source_natts {
                    set_bitmap_bit(bitmap, idx, true);
                }
            }
        }
        for (i, packing) in appended.iter().enumerate() {
            set_bitmap_bit(bitmap, source_natts + i, packing.is_some());
        }
    }

    if schema.has_oid() && source.has_oid() {
        prefix[prefix_len - OID_SIZE..].copy_from_slice(&source.oid().to_le_bytes());
    }

    data[..source_data.len()].copy_from_slice(source_data);
    let mut writer = DataWriter::new(data, source_data.len());
    for packing in appended.iter().flatten() {
        writer.put(packing)?;
    }

    let mut infomask = (source.infomask() & !(flags::HAS_NULLS | flags::HAS_OID)) | writer.finish()?;
    if has_nulls {
        infomask |= flags::HAS_NULLS;
    }
    if schema.has_oid() {
        infomask |= flags::HAS_OID;
    }

    debug!(
        source_natts,
        natts,
        defaults = appended.iter().flatten().count(),
        "expanded row to current schema"
    );

    Ok(ExpandedBody {
        body,
        infomask,
        hoff,
    })
}

/// Expands a full row to the schema's column count, keeping its location and
/// table identity.
pub fn expand_tuple(source: &HeapTuple, schema: &Schema) -> Result<HeapTuple> {
    let ExpandedBody {
        body,
        infomask,
        hoff,
    } = expand_body(source, schema)?;

    let mut header = HeapTupleHeader::new(schema.column_count(), infomask, hoff_byte(hoff)?);
    header.set_datum_len(HEAP_TUPLE_HEADER_SIZE + body.len());
    header.set_datum_typeid(schema.type_id());
    header.set_datum_typmod(schema.type_mod());

    let mut tuple = HeapTuple::from_parts(header, body);
    tuple.set_self_ptr(source.self_ptr());
    tuple.set_table_oid(source.table_oid());
    Ok(tuple)
}

/// Expands a full row into a minimal row of the schema's column count.
pub fn minimal_expand_tuple(source: &HeapTuple, schema: &Schema) -> Result<MinimalTuple> {
    let ExpandedBody {
        body,
        infomask,
        hoff,
    } = expand_body(source, schema)?;

    let header = MinimalTupleHeader::new(
        MINIMAL_TUPLE_HEADER_SIZE + body.len(),
        schema.column_count(),
        infomask,
        hoff_byte(hoff)?,
    );
    Ok(MinimalTuple::from_parts(header, body))
}
