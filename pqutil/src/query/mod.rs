//! Query fragment module for pqutil
//!
//! This module turns loosely structured filter strings into parameterized
//! SQL fragments. Everything here is pure: no I/O and no shared state.

pub mod amount;
pub mod placeholder;
pub mod sort;
pub mod value;

// Re-export key types
pub use amount::{parse_amount_query, AmountFilter, Comparison};
pub use placeholder::{count_placeholders, to_numbered};
pub use sort::{normalize_direction, parse_sort, SortDirection, SortSpec};
pub use value::QueryValue;
