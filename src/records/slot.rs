//! # Result-Row Slot
//!
//! A [`TupleSlot`] presents one row of a schema to its consumer regardless of
//! where the row came from:
//!
//! | Contents | Decoding |
//! |----------|----------|
//! | full row | incremental, on demand |
//! | minimal row | incremental, on demand |
//! | wire record | whole record on first access |
//! | virtual values | none, values are stored directly |
//!
//! Decoded values are cached in the slot, so asking for column 3 after column
//! 5 costs nothing, and asking for column 7 resumes the walk where column 5
//! left it. Requests beyond the schema read as null; dropped columns always
//! read as null.

use smallvec::SmallVec;

use eyre::{ensure, Result};

use super::builder::{form_minimal_tuple, form_tuple};
use super::datarow::decode_data_row;
use super::deform::{self, check_row_natts, deform_walk, DecodeCursor, SystemAttribute};
use super::input::TypeInput;
use super::schema::Schema;
use super::tuple::{DecodableRow, HeapTuple, MinimalTuple};
use crate::error::RowError;
use crate::types::Datum;

enum SlotContents<'a> {
    Empty,
    Heap(&'a HeapTuple),
    Minimal(&'a MinimalTuple),
    DataRow {
        bytes: &'a [u8],
        input: &'a dyn TypeInput,
    },
    Virtual,
}

pub struct TupleSlot<'a> {
    schema: &'a Schema,
    contents: SlotContents<'a>,
    values: SmallVec<[Option<Datum<'a>>; 16]>,
    cursor: DecodeCursor,
}

impl<'a> TupleSlot<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            contents: SlotContents::Empty,
            values: SmallVec::new(),
            cursor: DecodeCursor::new(),
        }
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn clear(&mut self) {
        self.contents = SlotContents::Empty;
        self.values.clear();
        self.cursor.reset();
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.contents, SlotContents::Empty)
    }

    /// Number of leading columns already decoded.
    pub fn nvalid(&self) -> usize {
        self.values.len()
    }

    pub fn store_heap(&mut self, row: &'a HeapTuple) -> Result<()> {
        check_row_natts(row, self.schema)?;
        self.clear();
        self.contents = SlotContents::Heap(row);
        Ok(())
    }

    pub fn store_minimal(&mut self, row: &'a MinimalTuple) -> Result<()> {
        check_row_natts(row, self.schema)?;
        self.clear();
        self.contents = SlotContents::Minimal(row);
        Ok(())
    }

    pub fn store_data_row(&mut self, bytes: &'a [u8], input: &'a dyn TypeInput) {
        self.clear();
        self.contents = SlotContents::DataRow { bytes, input };
    }

    /// Stores already-decoded values, one per schema column.
    pub fn store_virtual(&mut self, values: Vec<Option<Datum<'a>>>) -> Result<()> {
        ensure!(
            values.len() == self.schema.column_count(),
            RowError::invalid(format!(
                "{} values supplied for {} columns",
                values.len(),
                self.schema.column_count()
            ))
        );
        self.clear();
        let cols = self.schema.columns();
        self.values = values
            .into_iter()
            .zip(cols)
            .map(|(v, col)| if col.is_dropped() { None } else { v })
            .collect();
        self.contents = SlotContents::Virtual;
        Ok(())
    }

    /// Decodes at least the first `attnum` columns (clamped to the schema).
    pub fn getsomeattrs(&mut self, attnum: usize) -> Result<()> {
        let attnum = attnum.min(self.schema.column_count());
        if attnum <= self.values.len() {
            return Ok(());
        }

        match self.contents {
            SlotContents::Empty => {
                return Err(RowError::MissingRow("column values").into())
            }
            SlotContents::Heap(row) => self.walk(row, attnum)?,
            SlotContents::Minimal(row) => self.walk(row, attnum)?,
            SlotContents::DataRow { bytes, input } => {
                let cols = self.schema.columns();
                self.values = decode_data_row(bytes, self.schema, input)?
                    .into_iter()
                    .zip(cols)
                    .map(|(v, col)| -> Option<Datum<'a>> {
                        if col.is_dropped() {
                            None
                        } else {
                            v
                        }
                    })
                    .collect();
                return Ok(());
            }
            SlotContents::Virtual => {}
        }

        for idx in self.values.len()..attnum {
            self.values.push(self.schema.default_for(idx).cloned());
        }
        Ok(())
    }

    fn walk<R: DecodableRow + ?Sized>(&mut self, row: &'a R, attnum: usize) -> Result<()> {
        let schema = self.schema;
        let upto = attnum.min(row.natts());
        let values = &mut self.values;
        deform_walk(row, schema, &mut self.cursor, upto, |i, v| {
            values.push(if schema.columns()[i].is_dropped() { None } else { v });
        })
    }

    /// Decodes every column and returns them.
    pub fn getallattrs(&mut self) -> Result<&[Option<Datum<'a>>]> {
        self.getsomeattrs(self.schema.column_count())?;
        Ok(&self.values)
    }

    /// Fetches column `attnum` (1-based). Columns beyond the schema are null.
    pub fn getattr(&mut self, attnum: usize) -> Result<Option<&Datum<'a>>> {
        let natts = self.schema.column_count();
        ensure!(attnum >= 1, RowError::InvalidColumn { attnum, natts });
        if attnum > natts {
            return Ok(None);
        }
        self.getsomeattrs(attnum)?;
        Ok(self.values[attnum - 1].as_ref())
    }

    /// Null test for column `attnum` (1-based), decoding nothing when the
    /// row's null bitmap can answer.
    pub fn attisnull(&mut self, attnum: usize) -> Result<bool> {
        let natts = self.schema.column_count();
        ensure!(attnum >= 1, RowError::InvalidColumn { attnum, natts });
        if attnum > natts || self.schema.columns()[attnum - 1].is_dropped() {
            return Ok(true);
        }
        if let Some(value) = self.values.get(attnum - 1) {
            return Ok(value.is_none());
        }

        match self.contents {
            SlotContents::Heap(row) => deform::attisnull(row, self.schema, attnum),
            SlotContents::Minimal(row) => deform::attisnull(row, self.schema, attnum),
            _ => Ok(self.getattr(attnum)?.is_none()),
        }
    }

    /// Fetches a system attribute. Only slots holding a full row have them.
    pub fn getsysattr(&self, attr: SystemAttribute) -> Result<Datum<'static>> {
        match self.contents {
            SlotContents::Heap(row) => Ok(deform::getsysattr(row, attr)),
            SlotContents::Empty => {
                Err(RowError::MissingRow("system attribute").into())
            }
            _ => Err(RowError::invalid(format!(
                "slot contents carry no system attribute {:?}",
                attr
            ))
            .into()),
        }
    }

    /// Copies the slot's row into an owned full row.
    pub fn materialize(&mut self) -> Result<HeapTuple> {
        match self.contents {
            SlotContents::Empty => Err(RowError::MissingRow("materialized row").into()),
            SlotContents::Heap(row) => Ok(row.clone()),
            SlotContents::Minimal(row) => Ok(row.to_heap()),
            _ => {
                let schema = self.schema;
                form_tuple(schema, self.getallattrs()?)
            }
        }
    }

    /// Copies the slot's row into an owned minimal row.
    pub fn materialize_minimal(&mut self) -> Result<MinimalTuple> {
        match self.contents {
            SlotContents::Empty => Err(RowError::MissingRow("materialized row").into()),
            SlotContents::Heap(row) => Ok(row.to_minimal()),
            SlotContents::Minimal(row) => Ok(row.clone()),
            _ => {
                let schema = self.schema;
                form_minimal_tuple(schema, self.getallattrs()?)
            }
        }
    }
}
