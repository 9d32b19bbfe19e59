//! End-to-end row lifecycles: wire input, slots, schema evolution, out-of-line
//! values and composites.

use rowform::error::{error_kind, ErrorKind};
use rowform::records::{
    attisnull, copy_tuple_as_datum, decode_data_row, deform_tuple, expand_tuple, form_tuple,
    getattr, getsysattr, modify_tuple_by_cols, DataRowBuilder, ItemPointer, SystemAttribute,
    TextInput, TypeInput,
};
use rowform::storage::MemoryToastStore;
use rowform::{ColumnDef, DataType, Datum, DecodableRow, HeapTuple, Schema, TupleSlot};

fn accounts() -> Schema {
    Schema::new(vec![
        ColumnDef::new("id", DataType::Int8),
        ColumnDef::new("active", DataType::Bool),
        ColumnDef::new("owner", DataType::Text),
        ColumnDef::new("balance", DataType::Float8),
        ColumnDef::new("opened", DataType::Date),
    ])
}

#[test]
fn wire_record_through_slot() {
    let schema = accounts();
    let bytes = DataRowBuilder::new()
        .push_text("9001")
        .push_text("t")
        .push_text("ada")
        .push_null()
        .push_text("2024-02-29")
        .finish()
        .unwrap();

    let input = TextInput::new();
    let mut slot = TupleSlot::new(&schema);
    slot.store_data_row(&bytes, &input);

    assert!(slot.attisnull(4).unwrap());
    assert_eq!(slot.getattr(1).unwrap(), Some(&Datum::int8(9001)));
    assert_eq!(slot.getattr(3).unwrap().and_then(|d| d.as_str()), Some("ada"));

    let row = slot.materialize().unwrap();
    assert!(row.has_nulls());
    assert_eq!(getattr(&row, &schema, 2).unwrap(), Some(Datum::bool(true)));
    assert_eq!(getattr(&row, &schema, 5).unwrap(), Some(Datum::int4(19782)));

    let direct = form_tuple(&schema, &decode_data_row(&bytes, &schema, &input).unwrap()).unwrap();
    assert_eq!(direct.body(), row.body());
}

#[test]
fn old_rows_read_under_a_widened_schema() {
    let old = Schema::new(vec![
        ColumnDef::new("id", DataType::Int4),
        ColumnDef::new("name", DataType::Text),
    ]);
    let row = form_tuple(&old, &[Some(Datum::int4(7)), Some(Datum::text("seven"))]).unwrap();

    let widened = Schema::new(vec![
        ColumnDef::new("id", DataType::Int4),
        ColumnDef::new("name", DataType::Text),
        ColumnDef::new("score", DataType::Int8).with_missing(Datum::int8(100)),
        ColumnDef::new("note", DataType::Text),
    ]);

    let lazily = deform_tuple(&row, &widened).unwrap();
    assert_eq!(
        lazily,
        vec![
            Some(Datum::int4(7)),
            Some(Datum::text("seven")),
            Some(Datum::int8(100)),
            None,
        ]
    );
    assert!(!attisnull(&row, &widened, 3).unwrap());
    assert!(attisnull(&row, &widened, 4).unwrap());

    let expanded = expand_tuple(&row, &widened).unwrap();
    assert_eq!(expanded.natts(), 4);
    assert_eq!(deform_tuple(&expanded, &widened).unwrap(), lazily);

    // Already as wide as the schema.
    assert_eq!(
        error_kind(&expand_tuple(&expanded, &widened).unwrap_err()),
        Some(ErrorKind::InvalidArgument)
    );
}

#[test]
fn external_values_flatten_into_composites() {
    let inner = Schema::new(vec![
        ColumnDef::new("id", DataType::Int4),
        ColumnDef::new("doc", DataType::Text),
    ]);
    let store = MemoryToastStore::new();
    let doc = "lorem ipsum ".repeat(1000);
    let pointer = store.store(42, 2, doc.as_bytes());
    assert!(store.chunk_total() > 1);

    let row = form_tuple(&inner, &[Some(Datum::int4(42)), Some(Datum::varlena(&pointer))]).unwrap();
    assert!(row.has_external());
    assert!(getattr(&row, &inner, 2).unwrap().unwrap().is_external());

    let composite = copy_tuple_as_datum(&row, &inner, Some(&store)).unwrap();

    let outer = Schema::new(vec![
        ColumnDef::new("seq", DataType::Int2),
        ColumnDef::new("payload", DataType::Record),
    ]);
    let wrapper = form_tuple(&outer, &[Some(Datum::int2(1)), Some(composite)]).unwrap();
    assert!(!wrapper.has_external());

    let nested = getattr(&wrapper, &outer, 2).unwrap().unwrap();
    let unpacked = HeapTuple::from_composite(&nested).unwrap();
    assert_eq!(getattr(&unpacked, &inner, 1).unwrap(), Some(Datum::int4(42)));
    assert_eq!(getattr(&unpacked, &inner, 2).unwrap().and_then(|d| d.as_str().map(str::len)), Some(doc.len()));
}

#[test]
fn wire_composites_land_as_row_values() {
    let schema = Schema::new(vec![
        ColumnDef::new("id", DataType::Int4),
        ColumnDef::new("point", DataType::Record),
    ]);
    let point = DataRowBuilder::new().push_text("1.5").push_text("-2").finish().unwrap();
    let bytes = DataRowBuilder::new()
        .push_text("3")
        .push_composite("float8,float8", &point)
        .finish()
        .unwrap();

    let values = decode_data_row(&bytes, &schema, &TextInput).unwrap();
    let row = form_tuple(&schema, &values).unwrap();

    let inner = TextInput.describe(b"float8,float8").unwrap();
    let nested = getattr(&row, &schema, 2).unwrap().unwrap();
    let point = HeapTuple::from_composite(&nested).unwrap();
    assert_eq!(
        deform_tuple(&point, &inner).unwrap(),
        vec![Some(Datum::float8(1.5)), Some(Datum::float8(-2.0))]
    );
}

#[test]
fn updates_keep_row_identity() {
    let schema = accounts().with_oid();
    let mut row = form_tuple(
        &schema,
        &[
            Some(Datum::int8(1)),
            Some(Datum::bool(false)),
            Some(Datum::text("grace")),
            Some(Datum::float8(10.0)),
            None,
        ],
    )
    .unwrap();
    row.set_oid(77).unwrap();
    row.set_self_ptr(ItemPointer::new(12, 3));
    row.set_table_oid(16384);

    let updated =
        modify_tuple_by_cols(&row, &schema, &[2, 4], &[Some(Datum::bool(true)), None]).unwrap();

    assert_eq!(getattr(&updated, &schema, 2).unwrap(), Some(Datum::bool(true)));
    assert!(attisnull(&updated, &schema, 4).unwrap());
    assert_eq!(getattr(&updated, &schema, 3).unwrap().as_ref().and_then(|d| d.as_str()), Some("grace"));
    assert_eq!(getsysattr(&updated, SystemAttribute::ObjectId), Datum::oid(77));
    assert_eq!(getsysattr(&updated, SystemAttribute::TableOid), Datum::oid(16384));
    assert_eq!(updated.self_ptr(), ItemPointer::new(12, 3));

    let mut slot = TupleSlot::new(&schema);
    slot.store_heap(&updated).unwrap();
    assert_eq!(
        slot.getsysattr(SystemAttribute::ObjectId).unwrap(),
        Datum::oid(77)
    );
}

#[test]
fn corrupt_input_is_reported_not_trusted() {
    let schema = accounts();
    let row = form_tuple(
        &schema,
        &[Some(Datum::int8(5)), None, Some(Datum::text("x")), None, None],
    )
    .unwrap();
    let bytes = row.to_bytes();

    for cut in [1, 10, bytes.len() - 1] {
        let truncated = &bytes[..cut];
        if let Ok(parsed) = HeapTuple::from_bytes(truncated) {
            assert!(deform_tuple(&parsed, &schema).is_err());
        }
    }

    let empty = TupleSlot::new(&schema).materialize().unwrap_err();
    assert_eq!(error_kind(&empty), Some(ErrorKind::MissingRow));
}
