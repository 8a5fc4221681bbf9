//! Naming utilities for pqutil
//!
//! Helpers for migration file names and the identifiers pqutil writes into
//! SQL itself.

use inflector::Inflector;

/// PostgreSQL's NAMEDATALEN - 1
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Turn a free-form migration name into a file-name friendly snake_case slug
pub fn migration_slug(name: &str) -> String {
    let slug = sanitize_identifier(&name.to_snake_case());
    slug.trim_matches('_').to_string()
}

/// Build `<version>_<slug>.sql`
pub fn migration_file_name(version: i64, name: &str) -> String {
    format!("{}_{}.sql", version, migration_slug(name))
}

/// Sanitize identifiers for SQL
pub fn sanitize_identifier(name: &str) -> String {
    // Remove or replace characters not allowed in SQL identifiers
    let mut sanitized = name.replace(|c: char| !c.is_ascii_alphanumeric() && c != '_', "_");

    // Ensure identifier doesn't start with a number
    if sanitized.chars().next().map_or(false, |c| c.is_ascii_digit()) {
        sanitized = format!("_{}", sanitized);
    }

    sanitized
}

/// Whether `name` can be used unquoted as a (optionally schema-qualified)
/// table name
pub fn is_valid_table_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            !part.is_empty()
                && part.len() <= MAX_IDENTIFIER_LENGTH
                && sanitize_identifier(part) == *part
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_slug() {
        assert_eq!(migration_slug("AddUserEmail"), "add_user_email");
        assert_eq!(migration_slug("add some column"), "add_some_column");
        assert_eq!(migration_slug("init"), "init");
    }

    #[test]
    fn test_migration_file_name() {
        assert_eq!(
            migration_file_name(20240101120000, "create users"),
            "20240101120000_create_users.sql"
        );
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("user-name"), "user_name");
        assert_eq!(sanitize_identifier("123user"), "_123user");
        assert_eq!(sanitize_identifier("user.name"), "user_name");
        assert_eq!(sanitize_identifier("user@name"), "user_name");
    }

    #[test]
    fn test_is_valid_table_name() {
        assert!(is_valid_table_name("schema_migrations"));
        assert!(is_valid_table_name("public.goose_db_version"));
        assert!(!is_valid_table_name("migrations; DROP TABLE users"));
        assert!(!is_valid_table_name("a.b.c"));
        assert!(!is_valid_table_name(""));
        assert!(!is_valid_table_name("1migrations"));
    }
}
