//! PostgreSQL error diagnostics
//!
//! Renders every field the server sent with an error, one per line, for
//! printing on the command line.

use sqlx::postgres::{PgDatabaseError, PgErrorPosition};

/// Format the extended fields of a server error
pub fn describe(err: &PgDatabaseError) -> String {
    let (position, internal_position, internal_query) = match err.position() {
        Some(PgErrorPosition::Original(position)) => (position.to_string(), String::new(), ""),
        Some(PgErrorPosition::Internal { position, query }) => {
            (String::new(), position.to_string(), query)
        }
        None => (String::new(), String::new(), ""),
    };

    let fields: [(&str, String); 17] = [
        ("Severity", format!("{:?}", err.severity())),
        ("Code", err.code().to_string()),
        ("Message", err.message().to_string()),
        ("Detail", opt(err.detail())),
        ("Hint", opt(err.hint())),
        ("Position", position),
        ("InternalPosition", internal_position),
        ("InternalQuery", internal_query.to_string()),
        ("Where", opt(err.r#where())),
        ("Schema", opt(err.schema())),
        ("Table", opt(err.table())),
        ("Column", opt(err.column())),
        ("DataTypeName", opt(err.data_type())),
        ("Constraint", opt(err.constraint())),
        ("File", opt(err.file())),
        ("Line", err.line().map(|l| l.to_string()).unwrap_or_default()),
        ("Routine", opt(err.routine())),
    ];

    render(&fields)
}

fn render(fields: &[(&str, String)]) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn opt(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}
