//! # Built-in Data Types
//!
//! `DataType` is the catalog of column types the codec knows about out of the
//! box. Each type maps to the physical properties that drive row layout:
//!
//! | Type | Oid | Length | By value | Align | Storage |
//! |------|-----|--------|----------|-------|---------|
//! | bool | 16 | 1 | yes | char | plain |
//! | int2 | 21 | 2 | yes | short | plain |
//! | int4 | 23 | 4 | yes | int | plain |
//! | int8 | 20 | 8 | yes | double | plain |
//! | float4 | 700 | 4 | yes | int | plain |
//! | float8 | 701 | 8 | yes | double | plain |
//! | oid | 26 | 4 | yes | int | plain |
//! | date | 1082 | 4 | yes | int | plain |
//! | timestamp | 1114 | 8 | yes | double | plain |
//! | "char" | 18 | 1 | yes | char | plain |
//! | name | 19 | 64 | no | char | plain |
//! | uuid | 2950 | 16 | no | char | plain |
//! | text | 25 | varlena | no | int | extended |
//! | varchar | 1043 | varlena | no | int | extended |
//! | bytea | 17 | varlena | no | int | extended |
//! | numeric | 1700 | varlena | no | int | main |
//! | jsonb | 3802 | varlena | no | int | extended |
//! | record | 2249 | varlena | no | double | extended |
//! | cstring | 2275 | cstring | no | char | plain |
//!
//! Types outside this table are described with
//! [`ColumnDef::custom`](crate::types::ColumnDef::custom).

use super::column::{Align, Storage, StorageLength};

/// Length of the fixed-width `name` type.
pub const NAMEDATALEN: u16 = 64;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool = 0,
    Int2 = 1,
    Int4 = 2,
    Int8 = 3,
    Float4 = 4,
    Float8 = 5,
    Oid = 6,
    Date = 7,
    Timestamp = 8,
    Char = 9,
    Name = 10,
    Uuid = 11,

    Text = 20,
    Varchar = 21,
    Bytea = 22,
    Numeric = 23,
    Jsonb = 24,
    Record = 25,

    Cstring = 30,
}

impl DataType {
    pub fn type_oid(&self) -> u32 {
        match self {
            DataType::Bool => 16,
            DataType::Int2 => 21,
            DataType::Int4 => 23,
            DataType::Int8 => 20,
            DataType::Float4 => 700,
            DataType::Float8 => 701,
            DataType::Oid => 26,
            DataType::Date => 1082,
            DataType::Timestamp => 1114,
            DataType::Char => 18,
            DataType::Name => 19,
            DataType::Uuid => 2950,
            DataType::Text => 25,
            DataType::Varchar => 1043,
            DataType::Bytea => 17,
            DataType::Numeric => 1700,
            DataType::Jsonb => 3802,
            DataType::Record => 2249,
            DataType::Cstring => 2275,
        }
    }

    pub fn storage_length(&self) -> StorageLength {
        match self {
            DataType::Bool | DataType::Char => StorageLength::Fixed(1),
            DataType::Int2 => StorageLength::Fixed(2),
            DataType::Int4 | DataType::Float4 | DataType::Oid | DataType::Date => {
                StorageLength::Fixed(4)
            }
            DataType::Int8 | DataType::Float8 | DataType::Timestamp => StorageLength::Fixed(8),
            DataType::Name => StorageLength::Fixed(NAMEDATALEN),
            DataType::Uuid => StorageLength::Fixed(16),
            DataType::Text
            | DataType::Varchar
            | DataType::Bytea
            | DataType::Numeric
            | DataType::Jsonb
            | DataType::Record => StorageLength::Varlena,
            DataType::Cstring => StorageLength::CString,
        }
    }

    pub fn by_val(&self) -> bool {
        matches!(
            self,
            DataType::Bool
                | DataType::Int2
                | DataType::Int4
                | DataType::Int8
                | DataType::Float4
                | DataType::Float8
                | DataType::Oid
                | DataType::Date
                | DataType::Timestamp
                | DataType::Char
        )
    }

    pub fn align(&self) -> Align {
        match self {
            DataType::Bool | DataType::Char | DataType::Name | DataType::Uuid => Align::Char,
            DataType::Cstring => Align::Char,
            DataType::Int2 => Align::Short,
            DataType::Int8 | DataType::Float8 | DataType::Timestamp | DataType::Record => {
                Align::Double
            }
            _ => Align::Int,
        }
    }

    pub fn default_storage(&self) -> Storage {
        match self {
            DataType::Text
            | DataType::Varchar
            | DataType::Bytea
            | DataType::Jsonb
            | DataType::Record => Storage::Extended,
            DataType::Numeric => Storage::Main,
            _ => Storage::Plain,
        }
    }

    pub fn is_variable(&self) -> bool {
        !matches!(self.storage_length(), StorageLength::Fixed(_))
    }

    /// Looks a type up by its SQL name, accepting the common aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        let dt = match lower.as_str() {
            "bool" | "boolean" => DataType::Bool,
            "int2" | "smallint" => DataType::Int2,
            "int4" | "int" | "integer" => DataType::Int4,
            "int8" | "bigint" => DataType::Int8,
            "float4" | "real" => DataType::Float4,
            "float8" | "double precision" => DataType::Float8,
            "oid" => DataType::Oid,
            "date" => DataType::Date,
            "timestamp" => DataType::Timestamp,
            "\"char\"" | "char" => DataType::Char,
            "name" => DataType::Name,
            "uuid" => DataType::Uuid,
            "text" => DataType::Text,
            "varchar" | "character varying" => DataType::Varchar,
            "bytea" => DataType::Bytea,
            "numeric" | "decimal" => DataType::Numeric,
            "jsonb" => DataType::Jsonb,
            "record" => DataType::Record,
            "cstring" => DataType::Cstring,
            _ => return None,
        };
        Some(dt)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Int2 => "int2",
            DataType::Int4 => "int4",
            DataType::Int8 => "int8",
            DataType::Float4 => "float4",
            DataType::Float8 => "float8",
            DataType::Oid => "oid",
            DataType::Date => "date",
            DataType::Timestamp => "timestamp",
            DataType::Char => "\"char\"",
            DataType::Name => "name",
            DataType::Uuid => "uuid",
            DataType::Text => "text",
            DataType::Varchar => "varchar",
            DataType::Bytea => "bytea",
            DataType::Numeric => "numeric",
            DataType::Jsonb => "jsonb",
            DataType::Record => "record",
            DataType::Cstring => "cstring",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_types_are_by_value_up_to_eight_bytes() {
        for dt in [
            DataType::Bool,
            DataType::Int2,
            DataType::Int4,
            DataType::Int8,
            DataType::Float8,
            DataType::Timestamp,
        ] {
            match dt.storage_length() {
                StorageLength::Fixed(len) => assert!(len <= 8),
                other => panic!("{} unexpectedly {:?}", dt, other),
            }
            assert!(dt.by_val());
        }
        assert!(!DataType::Uuid.by_val());
        assert!(!DataType::Name.by_val());
    }

    #[test]
    fn from_name_accepts_aliases() {
        assert_eq!(DataType::from_name("INTEGER"), Some(DataType::Int4));
        assert_eq!(DataType::from_name(" text "), Some(DataType::Text));
        assert_eq!(DataType::from_name("character varying"), Some(DataType::Varchar));
        assert_eq!(DataType::from_name("point"), None);
    }

    #[test]
    fn name_roundtrips_through_from_name() {
        for dt in [DataType::Int8, DataType::Jsonb, DataType::Cstring, DataType::Char] {
            assert_eq!(DataType::from_name(dt.name()), Some(dt));
        }
    }

    #[test]
    fn varlena_types_default_to_packable_storage() {
        assert_eq!(DataType::Text.default_storage(), Storage::Extended);
        assert_eq!(DataType::Numeric.default_storage(), Storage::Main);
        assert!(DataType::Numeric.default_storage().is_packable());
        assert!(!DataType::Int4.default_storage().is_packable());
    }
}
