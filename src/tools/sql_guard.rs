//! Read-only classification for the `query` tool.
//!
//! A keyword heuristic, not a parser: the statement must open with `select`,
//! `with` or `explain`, and no denylisted keyword may appear anywhere as a
//! whole word. Literals and identifiers are not exempt, so
//! `SELECT 'update me'` is rejected. The read-only transaction in
//! [`crate::db::executor`] is the authoritative control; this check only
//! fails fast before a connection is touched.

use crate::error::{ServerError, ServerResult};
use regex::Regex;
use std::sync::LazyLock;

/// Leading keywords a read-only statement may start with.
pub const ALLOWED_PREFIXES: [&str; 3] = ["select", "with", "explain"];

/// Keywords rejected anywhere in the statement.
pub const DENIED_KEYWORDS: [&str; 12] = [
    "insert", "update", "delete", "drop", "create", "alter", "truncate", "grant", "revoke", "copy",
    "execute", "call",
];

static DENYLIST: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(r"(?i)\b({})\b", DENIED_KEYWORDS.join("|"));
    Regex::new(&pattern).expect("Invalid denylist regex")
});

static LEADING_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_]+").expect("Invalid leading word regex"));

/// Which rule rejected a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardViolation {
    Empty,
    /// First word is not an allowed prefix.
    LeadingKeyword(String),
    /// A denylisted keyword occurs in the statement.
    DeniedKeyword(String),
}

impl GuardViolation {
    pub fn reason(&self) -> String {
        match self {
            Self::Empty => "statement is empty".to_string(),
            Self::LeadingKeyword(word) if word.is_empty() => {
                "statement must start with SELECT, WITH or EXPLAIN".to_string()
            }
            Self::LeadingKeyword(word) => format!(
                "statement must start with SELECT, WITH or EXPLAIN (found '{}')",
                word
            ),
            Self::DeniedKeyword(keyword) => format!(
                "statement contains the keyword '{}'",
                keyword.to_uppercase()
            ),
        }
    }
}

/// Classify `sql`, returning the first violated rule.
pub fn check_read_only(sql: &str) -> Result<(), GuardViolation> {
    let normalized = sql.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(GuardViolation::Empty);
    }

    let leading = LEADING_WORD
        .find(&normalized)
        .map(|m| m.as_str())
        .unwrap_or_default();
    if !ALLOWED_PREFIXES.contains(&leading) {
        return Err(GuardViolation::LeadingKeyword(leading.to_string()));
    }

    if let Some(found) = DENYLIST.find(&normalized) {
        return Err(GuardViolation::DeniedKeyword(found.as_str().to_string()));
    }

    Ok(())
}

/// Validate SQL for the `query` tool.
pub fn validate_read_only(sql: &str) -> ServerResult<()> {
    check_read_only(sql).map_err(|v| ServerError::not_read_only(v.reason()))
}
