//! Typed filter arguments

use chrono::{DateTime, FixedOffset};
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;
use std::fmt;

/// A filter value after type detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Timestamp(DateTime<FixedOffset>),
    Integer(i64),
    Text(String),
}

impl QueryValue {
    /// Detect the type of a raw filter value.
    ///
    /// Tried in order: RFC3339 timestamp (with or without fractional
    /// seconds), base-10 `i64`, raw string. The timestamp parse has to
    /// consume the whole input, so `"2024"` is an integer and never a date.
    pub fn parse(raw: &str) -> Self {
        if let Some(ts) = parse_timestamp(raw) {
            QueryValue::Timestamp(ts)
        } else if let Ok(n) = raw.parse::<i64>() {
            QueryValue::Integer(n)
        } else {
            QueryValue::Text(raw.to_string())
        }
    }

    /// Bind this value as the next positional argument of `query`
    pub fn bind<'q>(
        &'q self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Query<'q, Postgres, PgArguments> {
        match self {
            QueryValue::Timestamp(ts) => query.bind(*ts),
            QueryValue::Integer(n) => query.bind(*n),
            QueryValue::Text(s) => query.bind(s.as_str()),
        }
    }
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            QueryValue::Integer(n) => write!(f, "{}", n),
            QueryValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Integer(value)
    }
}

impl From<DateTime<FixedOffset>> for QueryValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        QueryValue::Timestamp(value)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

/// Strict RFC3339: an uppercase `T` separator, a `Z` or `±hh:mm` offset and
/// no leap second. chrono alone also takes a space, lowercase `t`/`z` and
/// second 60, which must stay text here.
fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let bytes = raw.as_bytes();
    // YYYY-MM-DDTHH:MM:SSZ is the shortest valid form
    if bytes.len() < 20 || bytes[10] != b'T' || &bytes[17..19] == b"60" {
        return None;
    }

    let len = bytes.len();
    let offset_ok = bytes[len - 1] == b'Z'
        || (len >= 25 && matches!(bytes[len - 6], b'+' | b'-') && bytes[len - 3] == b':');
    if !offset_ok {
        return None;
    }

    DateTime::parse_from_rfc3339(raw).ok()
}

/// Bind `values` onto `query` in order
pub fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    values: &'q [QueryValue],
) -> Query<'q, Postgres, PgArguments> {
    for value in values {
        query = value.bind(query);
    }
    query
}
