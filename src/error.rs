//! # Row Codec Errors
//!
//! Every fallible operation returns `eyre::Result`. Failures that a caller may
//! need to tell apart carry a [`RowError`] inside the report, recoverable with
//! `report.downcast_ref::<RowError>()`.
//!
//! | Kind | Raised when | Typical caller reaction |
//! |------|-------------|-------------------------|
//! | `SchemaLimit` | a row would carry more columns than allowed | abort the statement |
//! | `InvalidArgument` | bad column number, datum/column mismatch | programmer error |
//! | `DataCorrupted` | wire record or stored bytes disagree with the schema | fail the request |
//! | `MissingRow` | decoding from an empty slot | programmer error |
//!
//! Nothing in this crate retries; there is no partial success.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SchemaLimit,
    InvalidArgument,
    DataCorrupted,
    MissingRow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    TooManyColumns { count: usize, limit: usize },
    InvalidColumn { attnum: usize, natts: usize },
    InvalidArgument(String),
    DataCorrupted(String),
    MissingRow(&'static str),
}

impl RowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RowError::TooManyColumns { .. } => ErrorKind::SchemaLimit,
            RowError::InvalidColumn { .. } | RowError::InvalidArgument(_) => {
                ErrorKind::InvalidArgument
            }
            RowError::DataCorrupted(_) => ErrorKind::DataCorrupted,
            RowError::MissingRow(_) => ErrorKind::MissingRow,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        RowError::InvalidArgument(msg.into())
    }

    pub(crate) fn corrupted(msg: impl Into<String>) -> Self {
        RowError::DataCorrupted(msg.into())
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowError::TooManyColumns { count, limit } => {
                write!(f, "number of columns ({}) exceeds limit ({})", count, limit)
            }
            RowError::InvalidColumn { attnum, natts } => {
                write!(f, "invalid column number {} (row has {} columns)", attnum, natts)
            }
            RowError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            RowError::DataCorrupted(msg) => write!(f, "data corrupted: {}", msg),
            RowError::MissingRow(what) => write!(f, "cannot extract {} from empty tuple slot", what),
        }
    }
}

impl std::error::Error for RowError {}

/// Returns the [`ErrorKind`] carried by a report, if it wraps a [`RowError`].
pub fn error_kind(report: &eyre::Report) -> Option<ErrorKind> {
    report.downcast_ref::<RowError>().map(RowError::kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_taxonomy() {
        let limit = RowError::TooManyColumns { count: 2000, limit: 1664 };
        assert_eq!(limit.kind(), ErrorKind::SchemaLimit);
        assert_eq!(
            RowError::InvalidColumn { attnum: 0, natts: 3 }.kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(RowError::corrupted("x").kind(), ErrorKind::DataCorrupted);
        assert_eq!(RowError::MissingRow("attribute").kind(), ErrorKind::MissingRow);
    }

    #[test]
    fn report_roundtrips_kind() {
        let report = eyre::Report::new(RowError::corrupted("bad column count"));
        assert_eq!(error_kind(&report), Some(ErrorKind::DataCorrupted));
        assert!(report.to_string().contains("bad column count"));

        let plain = eyre::eyre!("something else");
        assert_eq!(error_kind(&plain), None);
    }

    #[test]
    fn display_mentions_limit() {
        let err = RowError::TooManyColumns { count: 1700, limit: 1664 };
        assert_eq!(err.to_string(), "number of columns (1700) exceeds limit (1664)");
    }
}
