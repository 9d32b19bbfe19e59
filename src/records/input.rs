//! # Text Value Input
//!
//! Wire records carry each column as raw bytes that a type-specific parser
//! turns into a [`Datum`]. The parser is a collaborator behind [`TypeInput`] so
//! hosts can plug in their own type system; [`TextInput`] handles the built-in
//! catalog from the textual forms below.
//!
//! | Type | Format | Example |
//! |------|--------|---------|
//! | bool | `t`/`true`/`yes`/`on`/`1` and negations | `true` |
//! | int2/int4/int8/oid | decimal | `-42` |
//! | float4/float8 | decimal or `NaN`/`inf` | `3.5` |
//! | date | ISO 8601 | `2024-01-15` |
//! | timestamp | ISO 8601, `T` or space separated | `2024-01-15 13:45:30.25` |
//! | "char" | first byte | `x` |
//! | name | up to 63 bytes | `relname` |
//! | uuid | standard or compact hex | `550e8400-e29b-41d4-a716-446655440000` |
//! | bytea | `\x` hex, otherwise raw bytes | `\x48454c4c4f` |
//! | text, varchar, numeric, jsonb | raw bytes | `hello` |
//! | cstring | raw bytes without NUL | `hello` |
//!
//! Dates are days since 1970-01-01 and timestamps microseconds since
//! 1970-01-01 00:00:00. Every parse failure is an invalid-argument error.
//!
//! [`TypeInput::describe`] parses a nested composite's column description: a
//! comma-separated list of type names. Columns are named `f1`, `f2`, ...

use std::borrow::Cow;

use eyre::{ensure, Result};

use super::schema::Schema;
use crate::error::RowError;
use crate::types::{varlena, ColumnDef, DataType, Datum, StorageLength, NAMEDATALEN};

/// Type-specific parser for raw column bytes.
pub trait TypeInput {
    /// Parses the raw bytes of one non-null column.
    fn parse(&self, raw: &[u8], column: &ColumnDef) -> Result<Datum<'static>>;

    /// Builds the schema of a nested composite from its description segment.
    fn describe(&self, desc: &[u8]) -> Result<Schema>;
}

/// Text-format parser for the built-in type catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextInput;

impl TextInput {
    pub fn new() -> Self {
        Self
    }
}

fn utf8<'a>(raw: &'a [u8], column: &ColumnDef) -> Result<&'a str> {
    std::str::from_utf8(raw).map_err(|_| {
        RowError::invalid(format!("column \"{}\": input is not valid UTF-8", column.name())).into()
    })
}

fn parse_number<T: std::str::FromStr>(s: &str, column: &ColumnDef) -> Result<T> {
    s.trim().parse::<T>().map_err(|_| {
        RowError::invalid(format!(
            "column \"{}\": invalid {} input '{}'",
            column.name(),
            column.data_type().map_or("numeric", |dt| dt.name()),
            s
        ))
        .into()
    })
}

fn parse_bool(s: &str) -> Result<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Ok(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Ok(false),
        _ => Err(RowError::invalid(format!("invalid bool input '{}'", s)).into()),
    }
}

fn parse_hex(s: &str) -> Result<Vec<u8>> {
    ensure!(
        s.len() % 2 == 0 && s.is_ascii(),
        RowError::invalid(format!("hex string must have even length, got {}", s.len()))
    );
    (0..s.len())
        .step_by(2)
        .map(|i| -> Result<u8> {
            u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| {
                RowError::invalid(format!("invalid hex byte: '{}'", &s[i..i + 2])).into()
            })
        })
        .collect()
}

fn parse_uuid(s: &str) -> Result<[u8; 16]> {
    let hex_only: String = s.trim().chars().filter(|c| *c != '-').collect();
    ensure!(
        hex_only.len() == 32,
        RowError::invalid(format!(
            "invalid UUID format '{}': expected 32 hex chars, got {}",
            s,
            hex_only.len()
        ))
    );
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&parse_hex(&hex_only)?);
    Ok(bytes)
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Accepted year range for dates. Timestamps near the upper end overflow and
/// are rejected separately.
const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 294_276;

const MICROS_PER_DAY: i64 = 86_400 * 1_000_000;

/// Days from 1970-01-01 to the given proleptic Gregorian date.
fn days_from_civil(year: i32, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year as i64 - 1 } else { year as i64 };
    let era = y.div_euclid(400);
    let yoe = y.rem_euclid(400);
    let mp = (month as i64 + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn parse_date(s: &str) -> Result<i32> {
    let s = s.trim();
    let invalid = || RowError::invalid(format!("invalid date format '{}': expected YYYY-MM-DD", s));

    let mut parts = s.splitn(3, '-');
    let (Some(y), Some(m), Some(d)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid().into());
    };
    let year: i32 = y.parse().map_err(|_| invalid())?;
    let month: u32 = m.parse().map_err(|_| invalid())?;
    let day: u32 = d.parse().map_err(|_| invalid())?;

    ensure!(
        (MIN_YEAR..=MAX_YEAR).contains(&year)
            && (1..=12).contains(&month)
            && day >= 1
            && day <= days_in_month(year, month),
        RowError::invalid(format!("date '{}' is out of range", s))
    );
    i32::try_from(days_from_civil(year, month, day))
        .map_err(|_| RowError::invalid(format!("date '{}' is out of range", s)).into())
}

fn parse_time(s: &str) -> Result<i64> {
    let invalid = || RowError::invalid(format!("invalid time format '{}': expected HH:MM:SS", s));

    let (clock, fraction) = match s.split_once('.') {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (s, None),
    };
    let mut parts = clock.splitn(3, ':');
    let (Some(h), Some(m), Some(sec)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid().into());
    };
    let hour: i64 = h.parse().map_err(|_| invalid())?;
    let minute: i64 = m.parse().map_err(|_| invalid())?;
    let second: i64 = sec.parse().map_err(|_| invalid())?;
    ensure!(
        (0..24).contains(&hour) && (0..60).contains(&minute) && (0..60).contains(&second),
        RowError::invalid(format!("time '{}' is out of range", s))
    );

    let micros = match fraction {
        Some(frac) => {
            ensure!(
                !frac.is_empty() && frac.len() <= 6 && frac.bytes().all(|b| b.is_ascii_digit()),
                invalid()
            );
            let padded = format!("{:0<6}", frac);
            padded.parse::<i64>().map_err(|_| invalid())?
        }
        None => 0,
    };
    Ok((hour * 3600 + minute * 60 + second) * 1_000_000 + micros)
}

fn parse_timestamp(s: &str) -> Result<i64> {
    let s = s.trim();
    let Some((date, time)) = s.split_once(['T', ' ']) else {
        return Err(RowError::invalid(format!(
            "invalid timestamp format '{}': expected YYYY-MM-DD HH:MM:SS",
            s
        ))
        .into());
    };
    let days = parse_date(date)? as i64;
    let time = parse_time(time.trim())?;
    days.checked_mul(MICROS_PER_DAY)
        .and_then(|micros| micros.checked_add(time))
        .ok_or_else(|| RowError::invalid(format!("timestamp '{}' is out of range", s)).into())
}

fn parse_name(raw: &[u8]) -> Result<Vec<u8>> {
    let width = NAMEDATALEN as usize;
    ensure!(
        raw.len() < width && !raw.contains(&0),
        RowError::invalid(format!("name of {} bytes exceeds {} limit", raw.len(), width - 1))
    );
    let mut bytes = vec![0u8; width];
    bytes[..raw.len()].copy_from_slice(raw);
    Ok(bytes)
}

fn parse_cstring(raw: &[u8]) -> Result<Datum<'static>> {
    ensure!(
        !raw.contains(&0),
        RowError::invalid("cstring input contains NUL")
    );
    Ok(Datum::CString(Cow::Owned(raw.to_vec())))
}

fn parse_builtin(raw: &[u8], column: &ColumnDef, dt: DataType) -> Result<Datum<'static>> {
    let datum = match dt {
        DataType::Bool => Datum::bool(parse_bool(utf8(raw, column)?)?),
        DataType::Int2 => Datum::int2(parse_number(utf8(raw, column)?, column)?),
        DataType::Int4 => Datum::int4(parse_number(utf8(raw, column)?, column)?),
        DataType::Int8 => Datum::int8(parse_number(utf8(raw, column)?, column)?),
        DataType::Float4 => Datum::float4(parse_number(utf8(raw, column)?, column)?),
        DataType::Float8 => Datum::float8(parse_number(utf8(raw, column)?, column)?),
        DataType::Oid => Datum::oid(parse_number(utf8(raw, column)?, column)?),
        DataType::Date => Datum::int4(parse_date(utf8(raw, column)?)?),
        DataType::Timestamp => Datum::int8(parse_timestamp(utf8(raw, column)?)?),
        DataType::Char => Datum::ByVal(raw.first().copied().unwrap_or(0) as u64),
        DataType::Name => Datum::Ref(Cow::Owned(parse_name(raw)?)),
        DataType::Uuid => Datum::Ref(Cow::Owned(parse_uuid(utf8(raw, column)?)?.to_vec())),
        DataType::Bytea => match raw.strip_prefix(b"\\x") {
            Some(hex) => Datum::bytea(&parse_hex(utf8(hex, column)?)?),
            None => Datum::bytea(raw),
        },
        DataType::Text | DataType::Varchar | DataType::Numeric | DataType::Jsonb => {
            Datum::Varlena(Cow::Owned(varlena::long_from_payload(raw)))
        }
        DataType::Record => {
            return Err(RowError::invalid(format!(
                "column \"{}\": record input must arrive as a nested composite",
                column.name()
            ))
            .into())
        }
        DataType::Cstring => parse_cstring(raw)?,
    };
    Ok(datum)
}

/// Parses a column with no catalog type by its length class alone.
fn parse_custom(raw: &[u8], column: &ColumnDef) -> Result<Datum<'static>> {
    match column.storage_length() {
        StorageLength::Fixed(len) if column.by_val() => {
            let v: i64 = parse_number(utf8(raw, column)?, column)?;
            let bits = len as u32 * 8;
            let value = if bits == 64 { v as u64 } else { (v as u64) & ((1u64 << bits) - 1) };
            Ok(Datum::ByVal(value))
        }
        StorageLength::Fixed(len) => {
            ensure!(
                raw.len() == len as usize,
                RowError::invalid(format!(
                    "column \"{}\" expects {} bytes, input has {}",
                    column.name(),
                    len,
                    raw.len()
                ))
            );
            Ok(Datum::Ref(Cow::Owned(raw.to_vec())))
        }
        StorageLength::Varlena => Ok(Datum::Varlena(Cow::Owned(varlena::long_from_payload(raw)))),
        StorageLength::CString => parse_cstring(raw),
    }
}

impl TypeInput for TextInput {
    fn parse(&self, raw: &[u8], column: &ColumnDef) -> Result<Datum<'static>> {
        match column.data_type() {
            Some(dt) => parse_builtin(raw, column, dt),
            None => parse_custom(raw, column),
        }
    }

    fn describe(&self, desc: &[u8]) -> Result<Schema> {
        let text = std::str::from_utf8(desc)
            .map_err(|_| RowError::invalid("composite description is not valid UTF-8"))?;
        ensure!(
            !text.trim().is_empty(),
            RowError::invalid("empty composite description")
        );

        let columns = text
            .split(',')
            .enumerate()
            .map(|(i, name)| -> Result<ColumnDef> {
                DataType::from_name(name)
                    .map(|dt| ColumnDef::new(format!("f{}", i + 1), dt))
                    .ok_or_else(|| {
                        RowError::invalid(format!("unknown type '{}' in composite", name.trim())).into()
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Schema::new(columns))
    }
}
