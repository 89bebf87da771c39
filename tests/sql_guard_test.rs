//! Black-box tests for the read-only query guard.
//!
//! Table-driven cases for the documented behavior, plus randomized statements
//! built from a keyword vocabulary to check the guard never panics and never
//! admits something it should not.

use pg_sheet_mcp::error::ServerError;
use pg_sheet_mcp::tools::sql_guard::{
    ALLOWED_PREFIXES, DENIED_KEYWORDS, GuardViolation, check_read_only, validate_read_only,
};
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

const VOCABULARY: &[&str] = &[
    "select", "SELECT", "with", "explain", "from", "where", "and", "or", "join", "on", "as",
    "limit", "order", "by", "group", "insert", "update", "delete", "drop", "create", "alter",
    "truncate", "grant", "revoke", "copy", "execute", "call", "updated_at", "created", "callback",
    "dropped", "users", "orders", "id", "1", "*", "(", ")", ",", ";", "'", "\"", "--", "/*", "*/",
    "=", "$1", "\n", "\t",
];

const SEPARATORS: &[&str] = &[" ", "  ", "\n", "", "\t", "("];

fn random_statement() -> String {
    let mut rng = rand::thread_rng();
    let words = rng.gen_range(0..12);
    let mut sql = String::new();
    if rng.gen_bool(0.2) {
        sql.push_str(SEPARATORS.choose(&mut rng).unwrap());
    }
    for _ in 0..words {
        if rng.gen_bool(0.1) {
            sql.push_str(&random_string(rng.gen_range(1..8)));
        } else {
            sql.push_str(VOCABULARY.choose(&mut rng).unwrap());
        }
        sql.push_str(SEPARATORS.choose(&mut rng).unwrap());
    }
    sql
}

/// Whole-word tokens for ASCII input: runs of letters, digits and underscores.
fn tokens(sql: &str) -> Vec<String> {
    sql.to_lowercase()
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

#[test]
fn accepts_read_statements() {
    let accepted = [
        "SELECT * FROM users",
        "  select 1",
        "WITH t AS (SELECT 1) SELECT * FROM t",
        "EXPLAIN SELECT * FROM orders WHERE id = $1",
        "select updated_at, created_by from audit",
        "SELECT * FROM callbacks",
    ];
    for sql in accepted {
        assert!(check_read_only(sql).is_ok(), "{sql} should be accepted");
    }
}

#[test]
fn rejects_write_statements_by_leading_keyword() {
    let rejected = [
        ("INSERT INTO t VALUES (1)", "insert"),
        ("update t set a = 1", "update"),
        ("VACUUM", "vacuum"),
        ("show tables", "show"),
    ];
    for (sql, leading) in rejected {
        assert_eq!(
            check_read_only(sql),
            Err(GuardViolation::LeadingKeyword(leading.to_string())),
            "{sql}"
        );
    }
}

#[test]
fn rejects_denied_keyword_anywhere() {
    let rejected = [
        ("WITH x AS (DELETE FROM t RETURNING *) SELECT * FROM x", "delete"),
        ("SELECT 1; DROP TABLE users", "drop"),
        ("SELECT * FROM t; DELETE FROM t", "delete"),
        ("EXPLAIN ANALYZE INSERT INTO t VALUES (1)", "insert"),
        ("select 'please update me'", "update"),
        ("SELECT * FROM t WHERE note = 'Call me'", "call"),
    ];
    for (sql, keyword) in rejected {
        assert_eq!(
            check_read_only(sql),
            Err(GuardViolation::DeniedKeyword(keyword.to_string())),
            "{sql}"
        );
    }
}

#[test]
fn rejects_empty_and_whitespace() {
    assert_eq!(check_read_only(""), Err(GuardViolation::Empty));
    assert_eq!(check_read_only(" \n\t "), Err(GuardViolation::Empty));
}

#[test]
fn validate_maps_to_not_read_only() {
    let err = validate_read_only("DELETE FROM t").unwrap_err();
    assert!(matches!(err, ServerError::NotReadOnly { .. }));
    assert!(err.to_string().contains("SELECT, WITH or EXPLAIN"));

    let err = validate_read_only("SELECT 1; TRUNCATE t").unwrap_err();
    assert!(err.to_string().contains("'TRUNCATE'"));
}

#[test]
fn fuzz_guard_never_admits_forbidden_statements() {
    for _ in 0..5_000 {
        let sql = random_statement();
        let verdict = check_read_only(&sql);

        if verdict.is_ok() {
            let normalized = sql.trim().to_lowercase();
            assert!(
                ALLOWED_PREFIXES.iter().any(|p| normalized.starts_with(p)),
                "admitted statement without an allowed prefix: {sql:?}"
            );
            let words = tokens(&sql);
            assert!(
                !words.iter().any(|w| DENIED_KEYWORDS.contains(&w.as_str())),
                "admitted statement with a denied keyword: {sql:?}"
            );
        }
    }
}

#[test]
fn fuzz_guard_handles_arbitrary_input() {
    let edge_cases = vec![
        String::new(),
        "\0".to_string(),
        "üöÄ".repeat(100),
        "'; DROP TABLE users--".to_string(),
        "select".repeat(10_000),
        "\u{0000}\u{FFFF}".to_string(),
        random_string(10_000),
    ];
    for sql in edge_cases {
        let _ = check_read_only(&sql);
    }
}
