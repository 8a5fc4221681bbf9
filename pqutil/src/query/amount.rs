//! Amount query parsing
//!
//! An amount query is a list of tokens for a single column, each either a
//! bare value or `op_value`. For example `["gt_100", "lte_500"]` on
//! `amount` becomes `(amount > ? AND amount <= ?)` with arguments
//! `[100, 500]`.

use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

use crate::error::{Error, Result};
use crate::query::placeholder;
use crate::query::value::{bind_all, QueryValue};

/// Comparison operators an amount token can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl Comparison {
    /// Map an operator prefix to a comparison. Never fails: anything not
    /// recognized, `eq` included, is equality.
    pub fn from_flag(flag: &str) -> Self {
        match flag {
            "gt" => Comparison::Gt,
            "lt" => Comparison::Lt,
            "gte" => Comparison::Gte,
            "lte" => Comparison::Lte,
            _ => Comparison::Eq,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Gt => ">",
            Comparison::Lt => "<",
            Comparison::Gte => ">=",
            Comparison::Lte => "<=",
        }
    }
}

/// A parenthesized predicate with `?` placeholders and its arguments.
/// `args[n]` belongs to the n-th placeholder in `sql`.
#[derive(Debug, Clone, PartialEq)]
pub struct AmountFilter {
    pub sql: String,
    pub args: Vec<QueryValue>,
}

impl AmountFilter {
    /// The fragment with `$n` placeholders, numbered after `offset`
    /// placeholders already present in the enclosing statement
    pub fn to_numbered(&self, offset: usize) -> String {
        placeholder::to_numbered(&self.sql, offset)
    }

    /// Bind the arguments onto a query in placeholder order
    pub fn bind<'q>(
        &'q self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Query<'q, Postgres, PgArguments> {
        bind_all(query, &self.args)
    }
}

/// Parse a set of filter tokens for `key` into an SQL fragment and its
/// arguments.
///
/// Each token is `value` or `op_value` with `op` one of `gt`, `lt`, `gte`,
/// `lte` or `eq`. Values are typed as timestamps, integers or text, in that
/// order (see [`QueryValue::parse`]). Predicates are joined with `AND` and
/// wrapped in parentheses.
///
/// An unknown operator prefix is not an error. It is stripped and the
/// comparison falls back to equality, so `gtt_5` filters on `key = 5`.
/// Callers that need strict operators must check the prefix themselves.
///
/// `key` is inserted verbatim. It must come from an allow-list, never from
/// user input.
pub fn parse_amount_query<S: AsRef<str>>(key: &str, tokens: &[S]) -> Result<AmountFilter> {
    let mut predicates = Vec::with_capacity(tokens.len());
    let mut args = Vec::with_capacity(tokens.len());

    for token in tokens {
        let token = token.as_ref();
        let parts: Vec<&str> = token.split('_').collect();

        let (comparison, value) = match parts.as_slice() {
            [value] => (Comparison::Eq, *value),
            [flag, value] => (Comparison::from_flag(flag), *value),
            _ => return Err(invalid_query(key, token)),
        };

        if value.is_empty() {
            return Err(invalid_query(key, token));
        }

        predicates.push(format!("{} {} ?", key, comparison.as_sql()));
        args.push(QueryValue::parse(value));
    }

    Ok(AmountFilter {
        sql: format!("({})", predicates.join(" AND ")),
        args,
    })
}

fn invalid_query(key: &str, token: &str) -> Error {
    Error::InvalidQuery {
        key: key.to_string(),
        token: token.to_string(),
    }
}
