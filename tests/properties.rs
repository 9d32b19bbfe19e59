//! Property tests for the row codec.
//!
//! Every case draws a random column list and a random row for it, then checks
//! that the encoder, both decoders and the offset cache agree with each other.
//! Columns mix catalog types with custom layouts, and variable-length values
//! arrive as long or short images, out-of-line references or expanded objects.

use std::borrow::Cow;
use std::sync::Arc;

use proptest::prelude::*;
use rowform::records::{
    compute_data_size, deform_incremental, deform_tuple, form_minimal_tuple, form_tuple, getattr,
    DecodeCursor, Schema,
};
use rowform::storage::ToastPointer;
use rowform::types::{varlena, Align, ColumnDef, DataType, Datum, ExpandedBytes, Storage, StorageLength};
use rowform::DecodableRow;

const PALETTE: &[DataType] = &[
    DataType::Bool,
    DataType::Char,
    DataType::Int2,
    DataType::Int4,
    DataType::Int8,
    DataType::Float8,
    DataType::Uuid,
    DataType::Text,
    DataType::Bytea,
    DataType::Cstring,
];

const BY_VAL_WIDTHS: &[u16] = &[1, 2, 4, 8];

const CUSTOM_TYPE_OID: u32 = 90_000;

/// How a generated column is declared and which values it receives.
#[derive(Debug, Clone, Copy)]
enum ColumnSpec {
    Builtin(DataType),
    /// Text column fed short-header images.
    ShortText,
    /// Text column fed out-of-line references.
    ExternalText,
    /// Text column fed expanded objects.
    ExpandedText,
    CustomByVal { width: u16, align: Align },
    CustomFixed { width: u16, align: Align },
    CustomVarlena { align: Align, storage: Storage },
    CustomCString,
}

impl ColumnSpec {
    fn column(&self, idx: usize) -> ColumnDef {
        let name = format!("c{}", idx + 1);
        let custom = |len, by_val, align, storage| {
            ColumnDef::custom(name.clone(), CUSTOM_TYPE_OID + idx as u32, len, by_val, align, storage)
                .unwrap()
        };
        match *self {
            ColumnSpec::Builtin(data_type) => ColumnDef::new(name, data_type),
            ColumnSpec::ShortText | ColumnSpec::ExternalText | ColumnSpec::ExpandedText => {
                ColumnDef::new(name, DataType::Text)
            }
            ColumnSpec::CustomByVal { width, align } => {
                custom(StorageLength::Fixed(width), true, align, Storage::Plain)
            }
            ColumnSpec::CustomFixed { width, align } => {
                custom(StorageLength::Fixed(width), false, align, Storage::Plain)
            }
            ColumnSpec::CustomVarlena { align, storage } => {
                custom(StorageLength::Varlena, false, align, storage)
            }
            ColumnSpec::CustomCString => {
                custom(StorageLength::CString, false, Align::Char, Storage::Plain)
            }
        }
    }

    fn value(&self) -> BoxedStrategy<Datum<'static>> {
        match *self {
            ColumnSpec::Builtin(data_type) => builtin_value(data_type),
            ColumnSpec::ShortText => short_image().boxed(),
            ColumnSpec::ExternalText => external_image().boxed(),
            ColumnSpec::ExpandedText => expanded_object().boxed(),
            ColumnSpec::CustomByVal { width, .. } => any::<u64>()
                .prop_map(move |v| {
                    let bits = u32::from(width) * 8;
                    Datum::ByVal(if bits == 64 { v } else { v & ((1u64 << bits) - 1) })
                })
                .boxed(),
            ColumnSpec::CustomFixed { width, .. } => {
                proptest::collection::vec(any::<u8>(), usize::from(width))
                    .prop_map(|b| Datum::Ref(Cow::Owned(b)))
                    .boxed()
            }
            ColumnSpec::CustomVarlena { .. } => prop_oneof![
                3 => proptest::collection::vec(any::<u8>(), 0..300).prop_map(|b| Datum::bytea(&b)),
                1 => short_image(),
                1 => external_image(),
                1 => expanded_object(),
            ]
            .boxed(),
            ColumnSpec::CustomCString => builtin_value(DataType::Cstring),
        }
    }
}

fn builtin_value(data_type: DataType) -> BoxedStrategy<Datum<'static>> {
    match data_type {
        DataType::Bool => any::<bool>().prop_map(Datum::bool).boxed(),
        DataType::Char => any::<u8>().prop_map(|b| Datum::ByVal(b as u64)).boxed(),
        DataType::Int2 => any::<i16>().prop_map(Datum::int2).boxed(),
        DataType::Int4 => any::<i32>().prop_map(Datum::int4).boxed(),
        DataType::Int8 => any::<i64>().prop_map(Datum::int8).boxed(),
        DataType::Float8 => any::<f64>().prop_map(Datum::float8).boxed(),
        DataType::Uuid => any::<[u8; 16]>()
            .prop_map(|b| Datum::Ref(Cow::Owned(b.to_vec())))
            .boxed(),
        DataType::Text => "[a-zA-Z0-9 ]{0,300}".prop_map(|s| Datum::text(&s)).boxed(),
        DataType::Bytea => proptest::collection::vec(any::<u8>(), 0..300)
            .prop_map(|b| Datum::bytea(&b))
            .boxed(),
        _ => "[a-z]{0,24}".prop_map(|s| Datum::cstring(&s)).boxed(),
    }
}

fn short_image() -> impl Strategy<Value = Datum<'static>> {
    proptest::collection::vec(any::<u8>(), 0..=126)
        .prop_map(|p| Datum::Varlena(Cow::Owned(varlena::short_from_payload(&p).unwrap())))
}

fn external_image() -> impl Strategy<Value = Datum<'static>> {
    (any::<u64>(), any::<u16>(), any::<u64>()).prop_map(|(row_id, column, size)| {
        Datum::Varlena(Cow::Owned(ToastPointer::new(row_id, column, size).encode().to_vec()))
    })
}

fn expanded_object() -> impl Strategy<Value = Datum<'static>> {
    proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..60), 0..5)
        .prop_map(|parts| Datum::expanded(Arc::new(ExpandedBytes::from_parts(parts))))
}

fn align() -> impl Strategy<Value = Align> {
    prop_oneof![
        Just(Align::Char),
        Just(Align::Short),
        Just(Align::Int),
        Just(Align::Double),
    ]
}

fn column_spec() -> impl Strategy<Value = ColumnSpec> {
    prop_oneof![
        8 => proptest::sample::select(PALETTE).prop_map(ColumnSpec::Builtin),
        1 => Just(ColumnSpec::ShortText),
        1 => Just(ColumnSpec::ExternalText),
        1 => Just(ColumnSpec::ExpandedText),
        1 => (proptest::sample::select(BY_VAL_WIDTHS), align())
            .prop_map(|(width, align)| ColumnSpec::CustomByVal { width, align }),
        1 => (1u16..=20, align())
            .prop_map(|(width, align)| ColumnSpec::CustomFixed { width, align }),
        1 => (align(), prop_oneof![Just(Storage::Plain), Just(Storage::Extended)])
            .prop_map(|(align, storage)| ColumnSpec::CustomVarlena { align, storage }),
        1 => Just(ColumnSpec::CustomCString),
    ]
}

fn row_case() -> impl Strategy<Value = (Vec<ColumnSpec>, Vec<Option<Datum<'static>>>)> {
    proptest::collection::vec(column_spec(), 1..14).prop_flat_map(|specs| {
        let values: Vec<_> = specs
            .iter()
            .map(|spec| proptest::option::weighted(0.75, spec.value()))
            .collect();
        (Just(specs), values)
    })
}

fn schema_for(specs: &[ColumnSpec]) -> Schema {
    Schema::new(specs.iter().enumerate().map(|(i, spec)| spec.column(i)).collect())
}

proptest! {
    #[test]
    fn encoded_rows_decode_to_their_values((specs, values) in row_case()) {
        let schema = schema_for(&specs);
        let row = form_tuple(&schema, &values).unwrap();
        prop_assert_eq!(deform_tuple(&row, &schema).unwrap(), values.clone());

        let minimal = form_minimal_tuple(&schema, &values).unwrap();
        prop_assert_eq!(minimal.data(), row.data());
        prop_assert_eq!(deform_tuple(&minimal, &schema).unwrap(), values);
    }

    #[test]
    fn estimate_matches_written_size((specs, values) in row_case()) {
        let schema = schema_for(&specs);
        let estimate = compute_data_size(&schema, &values).unwrap();
        let row = form_tuple(&schema, &values).unwrap();
        prop_assert_eq!(estimate, row.data().len());
    }

    #[test]
    fn offset_cache_is_invisible((specs, values) in row_case()) {
        let cached = schema_for(&specs);
        let uncached = schema_for(&specs).without_offset_cache();
        let row = form_tuple(&cached, &values).unwrap();

        // Read twice so the second pass runs against a primed cache.
        for _ in 0..2 {
            for attnum in (1..=specs.len()).rev() {
                prop_assert_eq!(
                    getattr(&row, &cached, attnum).unwrap(),
                    getattr(&row, &uncached, attnum).unwrap()
                );
            }
        }
    }

    #[test]
    fn incremental_decoding_matches_full(
        (specs, values) in row_case(),
        split in any::<proptest::sample::Index>(),
    ) {
        let schema = schema_for(&specs);
        let row = form_tuple(&schema, &values).unwrap();
        let first = split.index(specs.len() + 1);

        let mut cursor = DecodeCursor::new();
        let mut decoded = Vec::new();
        deform_incremental(&row, &schema, &mut cursor, &mut decoded, first).unwrap();
        prop_assert_eq!(cursor.nvalid(), first);
        deform_incremental(&row, &schema, &mut cursor, &mut decoded, specs.len()).unwrap();
        prop_assert_eq!(decoded, values);
    }
}
