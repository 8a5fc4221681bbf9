//! Integration tests for the filter and sort parsers

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use rstest::rstest;

use pqutil::query::{count_placeholders, normalize_direction, to_numbered};
use pqutil::{parse_amount_query, parse_sort, Error, QueryValue, SortDirection};

#[test]
fn test_range_with_timestamp() {
    let filter = parse_amount_query("amount", &["gt_100", "lte_2024-01-01T00:00:00Z"]).unwrap();

    assert_eq!(filter.sql, "(amount > ? AND amount <= ?)");
    assert_eq!(
        filter.args,
        vec![
            QueryValue::Integer(100),
            QueryValue::Timestamp(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().into()),
        ]
    );
}

#[test]
fn test_bare_text_value() {
    let filter = parse_amount_query("name", &["bob"]).unwrap();
    assert_eq!(filter.sql, "(name = ?)");
    assert_eq!(filter.args, vec![QueryValue::Text("bob".to_string())]);
}

#[test]
fn test_three_way_split_is_invalid() {
    let err = parse_amount_query("x", &["a_b_c"]).unwrap_err();
    assert!(matches!(err, Error::InvalidQuery { ref key, ref token } if key == "x" && token == "a_b_c"));
}

#[test]
fn test_error_stops_whole_batch() {
    let tokens = vec!["gt_1".to_string(), "lt_2_3".to_string()];
    assert!(parse_amount_query("amount", &tokens).is_err());
}

#[rstest]
#[case("gt_5", ">")]
#[case("lt_5", "<")]
#[case("gte_5", ">=")]
#[case("lte_5", "<=")]
#[case("eq_5", "=")]
#[case("5", "=")]
#[case("GT_5", "=")]
#[case("between_5", "=")]
fn test_operator_table(#[case] token: &str, #[case] op: &str) {
    let filter = parse_amount_query("amount", &[token]).unwrap();
    assert_eq!(filter.sql, format!("(amount {} ?)", op));
    assert_eq!(filter.args, vec![QueryValue::Integer(5)]);
}

#[rstest]
#[case("2024-01-01T00:00:00Z")]
#[case("2024-01-01T00:00:00.5Z")]
#[case("1999-12-31T23:59:59.999999999-08:00")]
fn test_rfc3339_values_are_timestamps(#[case] raw: &str) {
    let filter = parse_amount_query("created_at", &[format!("gte_{}", raw)]).unwrap();
    assert!(matches!(filter.args[0], QueryValue::Timestamp(_)));
}

#[rstest]
#[case("0", 0)]
#[case("42", 42)]
#[case("-7", -7)]
#[case("20240101", 20240101)]
#[case("9223372036854775807", i64::MAX)]
fn test_integers(#[case] raw: &str, #[case] expected: i64) {
    let filter = parse_amount_query("amount", &[raw]).unwrap();
    assert_eq!(filter.args, vec![QueryValue::Integer(expected)]);
}

#[test]
fn test_placeholders_match_arguments() {
    let tokens = ["1", "gt_2", "lte_x", "2024-06-01T12:00:00+02:00", "gte_-4"];
    for n in 1..=tokens.len() {
        let filter = parse_amount_query("amount", &tokens[..n]).unwrap();
        assert_eq!(count_placeholders(&filter.sql), n);
        assert_eq!(filter.args.len(), n);
    }
}

#[test]
fn test_numbered_keeps_argument_order() {
    let created = parse_amount_query("created_at", &["gte_2024-01-01T00:00:00Z"]).unwrap();
    let amount = parse_amount_query("amount", &["gt_10", "lt_20"]).unwrap();

    let sql = format!(
        "SELECT * FROM payments WHERE {} AND {}",
        created.to_numbered(0),
        amount.to_numbered(created.args.len())
    );
    assert_eq!(
        sql,
        "SELECT * FROM payments WHERE (created_at >= $1) AND (amount > $2 AND amount < $3)"
    );
    assert_eq!(to_numbered(&amount.sql, 0), "(amount > $1 AND amount < $2)");
}

#[rstest]
#[case("created_at:asc", "created_at", SortDirection::Asc)]
#[case("created_at", "created_at", SortDirection::Desc)]
#[case("created_at:", "created_at", SortDirection::Desc)]
#[case("  amount:ASC  ", "amount", SortDirection::Asc)]
#[case("amount:a", "amount", SortDirection::Asc)]
#[case("amount:up", "amount", SortDirection::Asc)]
#[case("amount:ascending", "amount", SortDirection::Asc)]
#[case("amount:Low To High", "amount", SortDirection::Asc)]
#[case("amount:d", "amount", SortDirection::Desc)]
#[case("amount:down", "amount", SortDirection::Desc)]
#[case("amount:Descending", "amount", SortDirection::Desc)]
#[case("amount:high-to-low", "amount", SortDirection::Desc)]
#[case("amount:desc1", "amount", SortDirection::Desc)]
fn test_sort_synonyms(
    #[case] spec: &str,
    #[case] column: &str,
    #[case] direction: SortDirection,
) {
    let sort = parse_sort(spec).unwrap();
    assert_eq!(sort.column, column);
    assert_eq!(sort.direction, direction);
}

#[test]
fn test_sort_rejects_unknown_direction() {
    assert!(matches!(parse_sort("x:sideways"), Err(Error::InvalidSortOrder(ref t)) if t == "sideways"));
}

#[test]
fn test_sort_rejects_extra_separator() {
    assert!(matches!(parse_sort("x:asc:desc"), Err(Error::InvalidSort(_))));
}

#[test]
fn test_sort_sql_terms() {
    assert_eq!(parse_sort("created_at:asc").unwrap().direction.as_sql(), "ASC");
    assert_eq!(parse_sort("created_at").unwrap().to_sql(), "created_at DESC");
}

#[rstest]
#[case("DESC")]
#[case("High To Low!")]
#[case("  a-s-c  ")]
#[case("Ünïcödé")]
#[case("")]
fn test_normalization_is_idempotent(#[case] raw: &str) {
    let once = normalize_direction(raw);
    assert_eq!(normalize_direction(&once), once);
}
