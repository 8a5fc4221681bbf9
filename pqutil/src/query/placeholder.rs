//! Placeholder translation
//!
//! Fragments are built with positional `?` placeholders. PostgreSQL wants
//! `$1`, `$2`, ... instead. Translation keeps the left-to-right order, so
//! the argument list does not need reordering. A `?` inside a single-quoted
//! literal is left alone.

/// Replace each `?` in `sql` with `$n`, starting at `offset + 1`
pub fn to_numbered(sql: &str, offset: usize) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut next = offset;
    let mut in_literal = false;

    for c in sql.chars() {
        match c {
            '\'' => {
                in_literal = !in_literal;
                out.push(c);
            }
            '?' if !in_literal => {
                next += 1;
                out.push('$');
                out.push_str(&next.to_string());
            }
            _ => out.push(c),
        }
    }

    out
}

/// Count the `?` placeholders in `sql` outside of string literals
pub fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    let mut in_literal = false;

    for c in sql.chars() {
        match c {
            '\'' => in_literal = !in_literal,
            '?' if !in_literal => count += 1,
            _ => {}
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_numbered() {
        assert_eq!(to_numbered("(a > ? AND a <= ?)", 0), "(a > $1 AND a <= $2)");
        assert_eq!(to_numbered("a = ?", 9), "a = $10");
        assert_eq!(to_numbered("no placeholders", 0), "no placeholders");
    }

    #[test]
    fn test_literals_are_skipped() {
        assert_eq!(to_numbered("a = '?' AND b = ?", 0), "a = '?' AND b = $1");
        assert_eq!(to_numbered("a = 'it''s?' AND b = ?", 0), "a = 'it''s?' AND b = $1");
        assert_eq!(count_placeholders("a = '?' AND b = ? AND c = ?"), 2);
    }
}
