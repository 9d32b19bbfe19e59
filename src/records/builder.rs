//! # Row Encoding
//!
//! Turns a values/nulls pair into an encoded row. Callers supply values as
//! `&[Option<Datum>]`, one entry per schema column, `None` meaning null.
//!
//! ## Encoding Steps
//!
//! 1. [`compute_data_size`] sums the packed size of every non-null value
//! 2. A zeroed body is allocated: bitmap, padding, optional oid, data region
//! 3. [`fill_tuple`] writes the bitmap bits and packed values
//! 4. The writer checks that it consumed exactly the estimated size
//!
//! Both passes classify values with the same packing plan, so the estimate and
//! the bytes written cannot disagree unless memory is corrupted; a mismatch is
//! reported as `DataCorrupted`.
//!
//! ## Usage
//!
//! ```ignore
//! let mut builder = TupleBuilder::new(&schema);
//! builder.set_int4(1, 42)?;
//! builder.set_text(2, "hello")?;
//! let row = builder.build()?;
//!
//! // Reuse builder for next row
//! builder.reset();
//! builder.set_int4(1, 100)?;
//! ```

use std::borrow::Cow;

use eyre::{ensure, Result};

use super::deform::{column_index, deform_tuple};
use super::header::{flags, HeapTupleHeader, MinimalTupleHeader};
use super::packing::{plan, set_bitmap_bit, DataWriter};
use super::schema::Schema;
use super::tuple::{
    check_column_limit, compute_hoff, hoff_byte, DecodableRow, HeapTuple, MinimalTuple,
};
use crate::config::{HEAP_TUPLE_HEADER_SIZE, MINIMAL_TUPLE_HEADER_SIZE};
use crate::error::RowError;
use crate::types::{varlena, Datum};

fn check_values(schema: &Schema, values: &[Option<Datum<'_>>]) -> Result<()> {
    ensure!(
        values.len() == schema.column_count(),
        RowError::invalid(format!(
            "{} values supplied for {} columns",
            values.len(),
            schema.column_count()
        ))
    );
    Ok(())
}

/// Exact size of the data region for `values`. Nulls take no space and
/// cause no padding.
pub fn compute_data_size(schema: &Schema, values: &[Option<Datum<'_>>]) -> Result<usize> {
    check_values(schema, values)?;
    let mut off = 0;
    for (col, value) in schema.columns().iter().zip(values) {
        if let Some(value) = value {
            off = plan(col, value)?.advance(off);
        }
    }
    Ok(off)
}

/// Writes `values` into `data`, which must be zeroed and exactly
/// [`compute_data_size`] bytes long. When `bitmap` is given every column gets
/// its bit. Returns the infomask bits implied by the values.
pub fn fill_tuple(
    schema: &Schema,
    values: &[Option<Datum<'_>>],
    data: &mut [u8],
    mut bitmap: Option<&mut [u8]>,
) -> Result<u16> {
    check_values(schema, values)?;
    if let Some(bp) = bitmap.as_deref() {
        ensure!(
            bp.len() >= Schema::null_bitmap_size(values.len()),
            RowError::invalid("null bitmap too small for column count")
        );
    }

    let mut writer = DataWriter::new(data, 0);
    let mut infomask = 0;
    for (idx, (col, value)) in schema.columns().iter().zip(values).enumerate() {
        if let Some(bp) = bitmap.as_deref_mut() {
            set_bitmap_bit(bp, idx, value.is_some());
        }
        match value {
            Some(value) => writer.put(&plan(col, value)?)?,
            None => {
                ensure!(
                    bitmap.is_some(),
                    RowError::invalid(format!("column {} is null but no null bitmap given", idx + 1))
                );
                infomask |= flags::HAS_NULLS;
            }
        }
    }
    Ok(writer.finish()? | infomask)
}

/// Encoded body shared by both row shapes.
struct EncodedBody {
    body: Vec<u8>,
    infomask: u16,
    hoff: usize,
}

fn encode_body(schema: &Schema, values: &[Option<Datum<'_>>]) -> Result<EncodedBody> {
    check_column_limit(values.len())?;
    check_values(schema, values)?;

    let natts = values.len();
    let has_nulls = values.iter().any(Option::is_none);
    let hoff = compute_hoff(natts, has_nulls, schema.has_oid());
    let data_len = compute_data_size(schema, values)?;

    let mut body = vec![0u8; hoff - HEAP_TUPLE_HEADER_SIZE + data_len];
    let (prefix, data) = body.split_at_mut(hoff - HEAP_TUPLE_HEADER_SIZE);
    let bitmap = if has_nulls {
        Some(&mut prefix[..Schema::null_bitmap_size(natts)])
    } else {
        None
    };

    let mut infomask = fill_tuple(schema, values, data, bitmap)?;
    if schema.has_oid() {
        infomask |= flags::HAS_OID;
    }

    Ok(EncodedBody {
        body,
        infomask,
        hoff,
    })
}

/// Encodes a full row. The result carries the schema's composite identity in
/// its datum fields and an invalid location.
pub fn form_tuple(schema: &Schema, values: &[Option<Datum<'_>>]) -> Result<HeapTuple> {
    let EncodedBody {
        body,
        infomask,
        hoff,
    } = encode_body(schema, values)?;

    let mut header = HeapTupleHeader::new(values.len(), infomask, hoff_byte(hoff)?);
    header.set_datum_len(HEAP_TUPLE_HEADER_SIZE + body.len());
    header.set_datum_typmod(schema.type_mod());
    header.set_datum_typeid(schema.type_id());

    Ok(HeapTuple::from_parts(header, body))
}

/// Encodes a minimal row.
pub fn form_minimal_tuple(schema: &Schema, values: &[Option<Datum<'_>>]) -> Result<MinimalTuple> {
    let EncodedBody {
        body,
        infomask,
        hoff,
    } = encode_body(schema, values)?;

    let header = MinimalTupleHeader::new(
        MINIMAL_TUPLE_HEADER_SIZE + body.len(),
        values.len(),
        infomask,
        hoff_byte(hoff)?,
    );
    Ok(MinimalTuple::from_parts(header, body))
}

/// Carries location, table identity, continuation pointer and oid over to a
/// re-formed row.
fn copy_identity(old: &HeapTuple, new: &mut HeapTuple, schema: &Schema) -> Result<()> {
    let ctid = old.header().ctid();
    new.header_mut().set_ctid(ctid);
    new.set_self_ptr(old.self_ptr());
    new.set_table_oid(old.table_oid());
    if schema.has_oid() && old.has_oid() {
        new.set_oid(old.oid())?;
    }
    Ok(())
}

/// Replaces the columns whose `do_replace` flag is set and re-forms the row.
pub fn modify_tuple(
    tuple: &HeapTuple,
    schema: &Schema,
    repl_values: &[Option<Datum<'_>>],
    do_replace: &[bool],
) -> Result<HeapTuple> {
    let natts = schema.column_count();
    ensure!(
        repl_values.len() == natts && do_replace.len() == natts,
        RowError::invalid(format!(
            "replacement arrays of {} and {} entries for {} columns",
            repl_values.len(),
            do_replace.len(),
            natts
        ))
    );

    let values: Vec<Option<Datum<'_>>> = deform_tuple(tuple, schema)?
        .into_iter()
        .zip(repl_values.iter().zip(do_replace))
        .map(|(old, (repl, &replace))| {
            if replace {
                repl.as_ref().map(Datum::reborrow)
            } else {
                old
            }
        })
        .collect();

    let mut new = form_tuple(schema, &values)?;
    copy_identity(tuple, &mut new, schema)?;
    Ok(new)
}

/// Replaces the listed columns (1-based) and re-forms the row.
pub fn modify_tuple_by_cols(
    tuple: &HeapTuple,
    schema: &Schema,
    repl_cols: &[usize],
    repl_values: &[Option<Datum<'_>>],
) -> Result<HeapTuple> {
    ensure!(
        repl_cols.len() == repl_values.len(),
        RowError::invalid(format!(
            "{} replacement columns but {} values",
            repl_cols.len(),
            repl_values.len()
        ))
    );

    let mut values = deform_tuple(tuple, schema)?;
    for (&attnum, repl) in repl_cols.iter().zip(repl_values) {
        let idx = column_index(attnum, values.len())?;
        values[idx] = repl.as_ref().map(Datum::reborrow);
    }

    let mut new = form_tuple(schema, &values)?;
    copy_identity(tuple, &mut new, schema)?;
    Ok(new)
}

/// Typed row construction with reuse.
pub struct TupleBuilder<'a> {
    schema: &'a Schema,
    values: Vec<Option<Datum<'static>>>,
}

impl<'a> TupleBuilder<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            values: vec![None; schema.column_count()],
        }
    }

    pub fn reset(&mut self) {
        for value in &mut self.values {
            *value = None;
        }
    }

    pub fn values(&self) -> &[Option<Datum<'static>>] {
        &self.values
    }

    pub fn set_null(&mut self, attnum: usize) -> Result<()> {
        let idx = column_index(attnum, self.values.len())?;
        self.values[idx] = None;
        Ok(())
    }

    /// Stores any value after checking it fits the column.
    pub fn set_datum(&mut self, attnum: usize, value: Datum<'_>) -> Result<()> {
        let idx = column_index(attnum, self.values.len())?;
        plan(&self.schema.columns()[idx], &value)?;
        self.values[idx] = Some(value.into_owned());
        Ok(())
    }

    pub fn set_bool(&mut self, attnum: usize, value: bool) -> Result<()> {
        self.set_datum(attnum, Datum::bool(value))
    }

    pub fn set_int2(&mut self, attnum: usize, value: i16) -> Result<()> {
        self.set_datum(attnum, Datum::int2(value))
    }

    pub fn set_int4(&mut self, attnum: usize, value: i32) -> Result<()> {
        self.set_datum(attnum, Datum::int4(value))
    }

    pub fn set_int8(&mut self, attnum: usize, value: i64) -> Result<()> {
        self.set_datum(attnum, Datum::int8(value))
    }

    pub fn set_float4(&mut self, attnum: usize, value: f32) -> Result<()> {
        self.set_datum(attnum, Datum::float4(value))
    }

    pub fn set_float8(&mut self, attnum: usize, value: f64) -> Result<()> {
        self.set_datum(attnum, Datum::float8(value))
    }

    pub fn set_oid(&mut self, attnum: usize, value: u32) -> Result<()> {
        self.set_datum(attnum, Datum::oid(value))
    }

    pub fn set_uuid(&mut self, attnum: usize, uuid: &[u8; 16]) -> Result<()> {
        self.set_datum(attnum, Datum::Ref(Cow::Owned(uuid.to_vec())))
    }

    pub fn set_text(&mut self, attnum: usize, text: &str) -> Result<()> {
        self.set_datum(attnum, Datum::text(text))
    }

    pub fn set_bytea(&mut self, attnum: usize, data: &[u8]) -> Result<()> {
        self.set_datum(attnum, Datum::bytea(data))
    }

    pub fn set_cstring(&mut self, attnum: usize, text: &str) -> Result<()> {
        self.set_datum(attnum, Datum::cstring(text))
    }

    /// Stores a pre-built variable-length image (short, long or out-of-line).
    pub fn set_varlena(&mut self, attnum: usize, image: &[u8]) -> Result<()> {
        varlena::size_any(image)?;
        self.set_datum(attnum, Datum::varlena(image))
    }

    pub fn build(&self) -> Result<HeapTuple> {
        form_tuple(self.schema, &self.values)
    }

    pub fn build_minimal(&self) -> Result<MinimalTuple> {
        form_minimal_tuple(self.schema, &self.values)
    }
}
