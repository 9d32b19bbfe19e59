//! Fuzz testing for wire record ingestion.
//!
//! Arbitrary bytes are decoded as a wire record against a fixed schema that
//! includes a composite column. Anything that decodes must also encode.

#![no_main]

use libfuzzer_sys::fuzz_target;

use rowform::records::{decode_data_row, form_tuple, Schema, TextInput};
use rowform::types::{ColumnDef, DataType};

fuzz_target!(|data: &[u8]| {
    let schema = Schema::new(vec![
        ColumnDef::new("id", DataType::Int4),
        ColumnDef::new("label", DataType::Text),
        ColumnDef::new("nested", DataType::Record),
        ColumnDef::new("day", DataType::Date),
    ]);

    if let Ok(values) = decode_data_row(data, &schema, &TextInput) {
        form_tuple(&schema, &values).unwrap();
    }
});
