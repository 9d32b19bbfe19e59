//! # Wire Records
//!
//! A wire record ("data row") is the network form of one row. All integers are
//! big-endian:
//!
//! ```text
//! +-------+----------------------------------------------+
//! | count | column 0 | column 1 | ...                     |
//! | u16   |                                              |
//! +-------+----------------------------------------------+
//!
//! column:  len: i32, then len raw bytes      (len >= 0)
//!          len = -1                          null, no bytes follow
//!          len = -2                          nested composite:
//!              desc_len: i32, desc bytes     column description
//!              data_len: i32, data bytes     a complete wire record
//! ```
//!
//! Raw bytes are handed to a [`TypeInput`] parser. A nested composite is
//! decoded recursively against the schema its description yields, encoded as
//! a row, and stored as a composite value. Nesting is limited to
//! [`MAX_NESTING_DEPTH`] levels.
//!
//! The record must match the schema exactly: a count mismatch, truncation, or
//! trailing bytes are all reported as data corruption.

use eyre::{ensure, Result};
use tracing::warn;
use zerocopy::big_endian::{I32, U16};
use zerocopy::FromBytes;

use super::builder::form_tuple;
use super::convert::copy_tuple_as_datum;
use super::input::TypeInput;
use super::schema::Schema;
use crate::config::{DATA_ROW_COMPOSITE, DATA_ROW_NULL};
use crate::error::{ErrorKind, RowError};
use crate::types::Datum;

/// Maximum depth of nested composites in one wire record.
pub const MAX_NESTING_DEPTH: usize = 16;

struct WireReader<'b> {
    bytes: &'b [u8],
    pos: usize,
}

impl<'b> WireReader<'b> {
    fn new(bytes: &'b [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn rest(&self) -> &'b [u8] {
        &self.bytes[self.pos..]
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'b [u8]> {
        let rest = self.rest();
        ensure!(
            len <= rest.len(),
            RowError::corrupted(format!(
                "wire record truncated reading {}: need {} bytes at {}, {} remain",
                what,
                len,
                self.pos,
                rest.len()
            ))
        );
        self.pos += len;
        Ok(&rest[..len])
    }

    fn read_u16(&mut self, what: &str) -> Result<u16> {
        let (value, _) = U16::read_from_prefix(self.take(2, what)?)
            .map_err(|_| RowError::corrupted(format!("unreadable {}", what)))?;
        Ok(value.get())
    }

    fn read_i32(&mut self, what: &str) -> Result<i32> {
        let (value, _) = I32::read_from_prefix(self.take(4, what)?)
            .map_err(|_| RowError::corrupted(format!("unreadable {}", what)))?;
        Ok(value.get())
    }

    /// Reads an i32 length followed by that many bytes.
    fn segment(&mut self, what: &str) -> Result<&'b [u8]> {
        let len = self.read_i32(what)?;
        ensure!(
            len >= 0,
            RowError::corrupted(format!("negative {} length {}", what, len))
        );
        self.take(len as usize, what)
    }

    fn finish(&self) -> Result<()> {
        ensure!(
            self.pos == self.bytes.len(),
            RowError::corrupted(format!(
                "{} trailing bytes after wire record",
                self.bytes.len() - self.pos
            ))
        );
        Ok(())
    }
}

fn decode_record(
    bytes: &[u8],
    schema: &Schema,
    input: &dyn TypeInput,
    depth: usize,
) -> Result<Vec<Option<Datum<'static>>>> {
    ensure!(
        depth <= MAX_NESTING_DEPTH,
        RowError::corrupted(format!(
            "composite nesting exceeds maximum depth of {}",
            MAX_NESTING_DEPTH
        ))
    );

    let mut reader = WireReader::new(bytes);
    let count = reader.read_u16("column count")? as usize;
    ensure!(
        count == schema.column_count(),
        RowError::corrupted(format!(
            "wire record has {} columns but schema expects {}",
            count,
            schema.column_count()
        ))
    );

    let mut values = Vec::with_capacity(count);
    for col in schema.columns() {
        let len = reader.read_i32("column length")?;
        let value = match len {
            DATA_ROW_NULL => None,
            DATA_ROW_COMPOSITE => {
                ensure!(
                    col.is_varlena(),
                    RowError::corrupted(format!(
                        "nested composite sent for non-composite column \"{}\"",
                        col.name()
                    ))
                );
                let desc = reader.segment("composite description")?;
                let data = reader.segment("composite data")?;
                let inner = input.describe(desc)?;
                let inner_values = decode_record(data, &inner, input, depth + 1)?;
                let row = form_tuple(&inner, &inner_values)?;
                Some(copy_tuple_as_datum(&row, &inner, None)?)
            }
            len if len >= 0 => Some(input.parse(reader.take(len as usize, "column value")?, col)?),
            len => {
                return Err(RowError::corrupted(format!(
                    "invalid length {} for column \"{}\"",
                    len,
                    col.name()
                ))
                .into())
            }
        };
        values.push(value);
    }

    reader.finish()?;
    Ok(values)
}

/// Decodes a wire record into the values accepted by the row encoder.
pub fn decode_data_row(
    bytes: &[u8],
    schema: &Schema,
    input: &dyn TypeInput,
) -> Result<Vec<Option<Datum<'static>>>> {
    decode_record(bytes, schema, input, 0).inspect_err(|err| {
        if crate::error::error_kind(err) == Some(ErrorKind::DataCorrupted) {
            warn!(
                len = bytes.len(),
                columns = schema.column_count(),
                error = %err,
                "rejected corrupt wire record"
            );
        }
    })
}

/// Writes wire records column by column.
///
/// ```ignore
/// let mut builder = DataRowBuilder::new();
/// builder.push_text("42").push_null().push_composite("int4,text", &inner);
/// let bytes = builder.finish()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct DataRowBuilder {
    count: usize,
    buf: Vec<u8>,
}

impl DataRowBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_null(&mut self) -> &mut Self {
        self.count += 1;
        self.buf.extend_from_slice(&DATA_ROW_NULL.to_be_bytes());
        self
    }

    pub fn push_raw(&mut self, raw: &[u8]) -> &mut Self {
        self.count += 1;
        self.push_segment(raw);
        self
    }

    pub fn push_text(&mut self, text: &str) -> &mut Self {
        self.push_raw(text.as_bytes())
    }

    /// Appends a nested composite: its column description and its own
    /// complete wire record.
    pub fn push_composite(&mut self, desc: &str, inner: &[u8]) -> &mut Self {
        self.count += 1;
        self.buf.extend_from_slice(&DATA_ROW_COMPOSITE.to_be_bytes());
        self.push_segment(desc.as_bytes());
        self.push_segment(inner);
        self
    }

    fn push_segment(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(&(bytes.len() as i32).to_be_bytes());
        self.buf.extend_from_slice(bytes);
    }

    pub fn column_count(&self) -> usize {
        self.count
    }

    /// Emits the record. The column count field is 16 bits wide.
    pub fn finish(&self) -> Result<Vec<u8>> {
        let count = u16::try_from(self.count).map_err(|_| RowError::TooManyColumns {
            count: self.count,
            limit: u16::MAX as usize,
        })?;
        let mut out = Vec::with_capacity(2 + self.buf.len());
        out.extend_from_slice(&count.to_be_bytes());
        out.extend_from_slice(&self.buf);
        Ok(out)
    }
}
