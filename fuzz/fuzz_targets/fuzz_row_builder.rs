//! Fuzz testing for the row encoder.
//!
//! Builds rows from arbitrary typed values and checks that every column reads
//! back as written, through both the cached and the uncached decode paths.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use rowform::records::{compute_data_size, deform_tuple, form_tuple, getattr, Schema};
use rowform::types::{ColumnDef, DataType, Datum};
use rowform::DecodableRow;

#[derive(Debug, Arbitrary)]
enum FuzzValue {
    Null(FuzzType),
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float8(f64),
    Uuid([u8; 16]),
    Text(String),
    Bytea(Vec<u8>),
}

#[derive(Debug, Arbitrary, Clone, Copy)]
enum FuzzType {
    Int4,
    Text,
}

impl FuzzValue {
    fn column(&self, idx: usize) -> ColumnDef {
        let data_type = match self {
            FuzzValue::Null(FuzzType::Int4) => DataType::Int4,
            FuzzValue::Null(FuzzType::Text) => DataType::Text,
            FuzzValue::Bool(_) => DataType::Bool,
            FuzzValue::Int2(_) => DataType::Int2,
            FuzzValue::Int4(_) => DataType::Int4,
            FuzzValue::Int8(_) => DataType::Int8,
            FuzzValue::Float8(_) => DataType::Float8,
            FuzzValue::Uuid(_) => DataType::Uuid,
            FuzzValue::Text(_) => DataType::Text,
            FuzzValue::Bytea(_) => DataType::Bytea,
        };
        ColumnDef::new(format!("c{}", idx), data_type)
    }

    fn datum(&self) -> Option<Datum<'_>> {
        match self {
            FuzzValue::Null(_) => None,
            FuzzValue::Bool(v) => Some(Datum::bool(*v)),
            FuzzValue::Int2(v) => Some(Datum::int2(*v)),
            FuzzValue::Int4(v) => Some(Datum::int4(*v)),
            FuzzValue::Int8(v) => Some(Datum::int8(*v)),
            FuzzValue::Float8(v) => Some(Datum::float8(*v)),
            FuzzValue::Uuid(b) => Some(Datum::fixed(b)),
            FuzzValue::Text(s) => Some(Datum::text(s)),
            FuzzValue::Bytea(b) => Some(Datum::bytea(b)),
        }
    }
}

fuzz_target!(|row_values: Vec<FuzzValue>| {
    if row_values.is_empty() || row_values.len() > 128 {
        return;
    }

    let columns: Vec<ColumnDef> = row_values.iter().enumerate().map(|(i, v)| v.column(i)).collect();
    let cached = Schema::new(columns.clone());
    let uncached = Schema::new(columns).without_offset_cache();
    let values: Vec<Option<Datum<'_>>> = row_values.iter().map(FuzzValue::datum).collect();

    let Ok(row) = form_tuple(&cached, &values) else {
        return;
    };
    assert_eq!(compute_data_size(&cached, &values).unwrap(), row.data().len());
    assert_eq!(deform_tuple(&row, &cached).unwrap(), values);

    for attnum in (1..=values.len()).rev() {
        let fast = getattr(&row, &cached, attnum).unwrap();
        let slow = getattr(&row, &uncached, attnum).unwrap();
        assert_eq!(fast, slow);
        assert_eq!(fast, values[attnum - 1]);
    }
});
