//! Sort specification parsing

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Direction of an ORDER BY term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for SortDirection {
    type Err = Error;

    /// Accepts any spelling that normalizes to a known synonym. An empty
    /// string means descending.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = normalize_direction(s);
        match normalized.as_str() {
            "desc" | "d" | "down" | "descending" | "hightolow" | "" => Ok(SortDirection::Desc),
            "asc" | "a" | "up" | "ascending" | "lowtohigh" => Ok(SortDirection::Asc),
            _ => Err(Error::InvalidSortOrder(normalized)),
        }
    }
}

/// A validated `column[:direction]` sort spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Render as an ORDER BY term, e.g. `created_at DESC`
    pub fn to_sql(&self) -> String {
        format!("{} {}", self.column, self.direction.as_sql())
    }
}

impl FromStr for SortSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_sort(s)
    }
}

/// Lowercase `raw` and drop everything that is not `a`-`z`.
///
/// `"High-To-Low"` becomes `"hightolow"`. Applying it twice gives the same
/// result as applying it once.
pub fn normalize_direction(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect()
}

/// Parse a `column[:direction]` sort spec.
///
/// The whole input is trimmed first. The column is taken verbatim and must
/// be checked against an allow-list by the caller. A missing direction
/// means descending.
pub fn parse_sort(spec: &str) -> Result<SortSpec> {
    let spec = spec.trim();
    let parts: Vec<&str> = spec.split(':').collect();

    let (column, direction) = match parts.as_slice() {
        [column] => (*column, ""),
        [column, direction] => (*column, *direction),
        _ => return Err(Error::InvalidSort(spec.to_string())),
    };

    Ok(SortSpec {
        column: column.to_string(),
        direction: direction.parse()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_direction() {
        assert_eq!(normalize_direction("High-To-Low"), "hightolow");
        assert_eq!(normalize_direction(" ASC1 "), "asc");
        assert_eq!(normalize_direction("déscending"), "dscending");
        assert_eq!(normalize_direction("!!"), "");
    }

    #[test]
    fn test_trims_whole_spec_only() {
        let sort = parse_sort("  name :  Up  ").unwrap();
        assert_eq!(sort.column, "name ");
        assert_eq!(sort.direction, SortDirection::Asc);
    }

    #[test]
    fn test_punctuation_only_direction_is_desc() {
        let sort = parse_sort("amount:--").unwrap();
        assert_eq!(sort.direction, SortDirection::Desc);
        let sort = parse_sort("amount:").unwrap();
        assert_eq!(sort.direction, SortDirection::Desc);
    }

    #[test]
    fn test_too_many_parts() {
        let err = parse_sort(" a:b:c ").unwrap_err();
        match err {
            Error::InvalidSort(spec) => assert_eq!(spec, "a:b:c"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_invalid_order_reports_normalized_token() {
        let err = parse_sort("x:Side-Ways").unwrap_err();
        match err {
            Error::InvalidSortOrder(token) => assert_eq!(token, "sideways"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_to_sql_and_from_str() {
        let sort: SortSpec = "created_at:lowtohigh".parse().unwrap();
        assert_eq!(sort.to_sql(), "created_at ASC");
        assert_eq!(SortDirection::Desc.to_string(), "DESC");
    }
}
