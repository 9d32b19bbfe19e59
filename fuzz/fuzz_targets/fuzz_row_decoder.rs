//! Fuzz testing for the row decoders.
//!
//! Arbitrary bytes are parsed as a full or minimal row and decoded against an
//! arbitrary schema. Malformed rows must be rejected with an error, never a
//! panic or an out-of-bounds read.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use rowform::records::{
    deform_incremental, deform_tuple, getattr, DecodeCursor, HeapTuple, MinimalTuple, Schema,
};
use rowform::types::{ColumnDef, DataType};

#[derive(Debug, Arbitrary)]
struct DecoderInput {
    column_types: Vec<FuzzDataType>,
    minimal: bool,
    column: u8,
    data: Vec<u8>,
}

#[derive(Debug, Arbitrary, Clone, Copy)]
enum FuzzDataType {
    Bool,
    Char,
    Int2,
    Int4,
    Int8,
    Float8,
    Name,
    Uuid,
    Text,
    Bytea,
    Record,
    Cstring,
}

impl From<FuzzDataType> for DataType {
    fn from(fdt: FuzzDataType) -> Self {
        match fdt {
            FuzzDataType::Bool => DataType::Bool,
            FuzzDataType::Char => DataType::Char,
            FuzzDataType::Int2 => DataType::Int2,
            FuzzDataType::Int4 => DataType::Int4,
            FuzzDataType::Int8 => DataType::Int8,
            FuzzDataType::Float8 => DataType::Float8,
            FuzzDataType::Name => DataType::Name,
            FuzzDataType::Uuid => DataType::Uuid,
            FuzzDataType::Text => DataType::Text,
            FuzzDataType::Bytea => DataType::Bytea,
            FuzzDataType::Record => DataType::Record,
            FuzzDataType::Cstring => DataType::Cstring,
        }
    }
}

fuzz_target!(|input: DecoderInput| {
    if input.column_types.is_empty() || input.column_types.len() > 64 {
        return;
    }

    let schema = Schema::new(
        input
            .column_types
            .iter()
            .enumerate()
            .map(|(i, t)| ColumnDef::new(format!("c{}", i), DataType::from(*t)))
            .collect(),
    );
    let attnum = 1 + input.column as usize % schema.column_count();

    if input.minimal {
        if let Ok(row) = MinimalTuple::from_bytes(&input.data) {
            let _ = getattr(&row, &schema, attnum);
            let _ = deform_tuple(&row, &schema);
        }
    } else if let Ok(row) = HeapTuple::from_bytes(&input.data) {
        let _ = getattr(&row, &schema, attnum);
        let _ = deform_tuple(&row, &schema);

        let mut cursor = DecodeCursor::new();
        let mut values = Vec::new();
        if deform_incremental(&row, &schema, &mut cursor, &mut values, attnum).is_ok() {
            let _ = deform_incremental(&row, &schema, &mut cursor, &mut values, schema.column_count());
        }
    }
});
