//! Column decoding for stored documents

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Error as SqlError, Row};

/// Read an RFC3339 timestamp column
pub fn timestamp_column(row: &Row<'_>, idx: usize) -> Result<DateTime<Utc>, SqlError> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SqlError::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Turns "no row" into `None` for single-row lookups
pub trait OptionalRow<T> {
    fn optional(self) -> Result<Option<T>, SqlError>;
}

impl<T> OptionalRow<T> for Result<T, SqlError> {
    fn optional(self) -> Result<Option<T>, SqlError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(SqlError::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
