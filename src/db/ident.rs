//! Identifier quoting for SQL built by interpolation.
//!
//! Table and schema names cannot be bound as placeholders, so every name that
//! ends up inside generated SQL goes through [`quote_ident`].

/// Quote a PostgreSQL identifier: wrap in double quotes and double any
/// embedded double quote.
pub fn quote_ident(ident: &str) -> String {
    let mut quoted = String::with_capacity(ident.len() + 2);
    quoted.push('"');
    for ch in ident.chars() {
        if ch == '"' {
            quoted.push('"');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

/// `"schema"."table"`
pub fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}
