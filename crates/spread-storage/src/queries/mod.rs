//! Query modules, one per table family. Every function takes a
//! `&Connection` so it can run on the writer, a pooled reader, or inside a
//! transaction.

pub mod alerts;
pub mod metrics;
pub mod point_values;
pub mod runs;
pub mod snapshots;
pub mod status;
pub mod verification;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;

/// Unix seconds to `DateTime<Utc>`, as a column conversion.
pub(crate) fn ts_from_col(secs: i64, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, secs))
}

/// Parse a TEXT column through `FromStr`.
pub(crate) fn parse_col<T>(value: &str, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
