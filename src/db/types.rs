//! PostgreSQL to JSON type mappings.
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies the driver's type name into a logical category
//! 2. A per-category decoder extracts the value from the row
//!
//! Values that cannot be decoded (unsupported types, decode errors) become
//! `null` rather than failing the whole row.

use crate::models::ColumnMetadata;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::{Column, Decode, Row, Type, TypeInfo};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for PostgreSQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Json,
    Uuid,
    Binary,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Array,
    Text,
}

/// Classify a PostgreSQL type name (as reported by `PgTypeInfo::name`).
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let upper = type_name.to_uppercase();

    if upper.ends_with("[]") {
        return TypeCategory::Array;
    }

    match upper.as_str() {
        "INT2" | "INT4" | "INT8" | "SMALLINT" | "INTEGER" | "BIGINT" | "OID" => {
            TypeCategory::Integer
        }
        "FLOAT4" | "FLOAT8" | "REAL" | "DOUBLE PRECISION" => TypeCategory::Float,
        "NUMERIC" | "DECIMAL" => TypeCategory::Decimal,
        "BOOL" | "BOOLEAN" => TypeCategory::Boolean,
        "JSON" | "JSONB" => TypeCategory::Json,
        "UUID" => TypeCategory::Uuid,
        "BYTEA" => TypeCategory::Binary,
        "DATE" => TypeCategory::Date,
        "TIME" => TypeCategory::Time,
        "TIMESTAMP" => TypeCategory::Timestamp,
        "TIMESTAMPTZ" => TypeCategory::TimestampTz,
        // text, varchar, bpchar, name, citext, enums ...
        _ => TypeCategory::Text,
    }
}

// =============================================================================
// Numeric Support
// =============================================================================

/// Wrapper type for raw NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("NUMERIC")
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_uppercase();
        name == "NUMERIC" || name == "DECIMAL"
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::Postgres>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Binary Encoding
// =============================================================================

/// Encode bytea contents as a base64 string.
pub fn encode_binary_value(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    JsonValue::String(STANDARD.encode(bytes))
}

/// JSON number, or the textual form for NaN and infinities.
pub fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

// =============================================================================
// Row to JSON Trait
// =============================================================================

/// Trait for converting database rows to JSON maps.
pub trait RowToJson {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue>;
    fn get_column_metadata(&self) -> Vec<ColumnMetadata>;
}

impl RowToJson for PgRow {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let value = decode_column(self, idx, type_name, categorize_type(type_name));
                (col.name().to_string(), value)
            })
            .collect()
    }

    fn get_column_metadata(&self) -> Vec<ColumnMetadata> {
        self.columns()
            .iter()
            .map(|col| ColumnMetadata::new(col.name(), col.type_info().name()))
            .collect()
    }
}

// =============================================================================
// Decoders
// =============================================================================

fn decode_column(row: &PgRow, idx: usize, type_name: &str, category: TypeCategory) -> JsonValue {
    match category {
        TypeCategory::Integer => decode_integer(row, idx),
        TypeCategory::Float => decode_float(row, idx),
        TypeCategory::Decimal => decode_decimal(row, idx),
        TypeCategory::Boolean => decode_optional::<bool>(row, idx, JsonValue::Bool),
        TypeCategory::Json => decode_optional::<JsonValue>(row, idx, |v| v),
        TypeCategory::Uuid => {
            decode_optional::<uuid::Uuid>(row, idx, |v| JsonValue::String(v.to_string()))
        }
        TypeCategory::Binary => decode_optional::<Vec<u8>>(row, idx, |v| encode_binary_value(&v)),
        TypeCategory::Date => {
            decode_optional::<chrono::NaiveDate>(row, idx, |v| JsonValue::String(v.to_string()))
        }
        TypeCategory::Time => {
            decode_optional::<chrono::NaiveTime>(row, idx, |v| JsonValue::String(v.to_string()))
        }
        TypeCategory::Timestamp => decode_optional::<chrono::NaiveDateTime>(row, idx, |v| {
            JsonValue::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        }),
        TypeCategory::TimestampTz => {
            decode_optional::<chrono::DateTime<chrono::Utc>>(row, idx, |v| {
                JsonValue::String(v.to_rfc3339())
            })
        }
        TypeCategory::Array => decode_array(row, idx, type_name),
        TypeCategory::Text => decode_text(row, idx, type_name),
    }
}

fn decode_optional<'r, T>(row: &'r PgRow, idx: usize, map: impl FnOnce(T) -> JsonValue) -> JsonValue
where
    T: Decode<'r, sqlx::Postgres> + Type<sqlx::Postgres>,
{
    match row.try_get::<Option<T>, _>(idx) {
        Ok(Some(v)) => map(v),
        Ok(None) => JsonValue::Null,
        Err(e) => {
            tracing::debug!(column = idx, error = %e, "Failed to decode column");
            JsonValue::Null
        }
    }
}

fn decode_integer(row: &PgRow, idx: usize) -> JsonValue {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(|v| JsonValue::Number(v.into())).unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
        return v.map(|v| JsonValue::Number(v.into())).unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
        return v.map(|v| JsonValue::Number(v.into())).unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<sqlx::postgres::types::Oid>, _>(idx) {
        return v.map(|v| JsonValue::Number(v.0.into())).unwrap_or(JsonValue::Null);
    }
    JsonValue::Null
}

fn decode_float(row: &PgRow, idx: usize) -> JsonValue {
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map(float_value).unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
        return v.map(|v| float_value(v as f64)).unwrap_or(JsonValue::Null);
    }
    JsonValue::Null
}

fn decode_decimal(row: &PgRow, idx: usize) -> JsonValue {
    match row.try_get::<Option<RawDecimal>, _>(idx) {
        Ok(Some(v)) => JsonValue::String(v.0),
        Ok(None) => JsonValue::Null,
        Err(e) => {
            tracing::error!("Failed to decode NUMERIC: {:?}", e);
            JsonValue::Null
        }
    }
}

fn decode_array(row: &PgRow, idx: usize, type_name: &str) -> JsonValue {
    if let Ok(v) = row.try_get::<Option<Vec<i64>>, _>(idx) {
        return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<i32>>, _>(idx) {
        return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<i16>>, _>(idx) {
        return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<f64>>, _>(idx) {
        return v
            .map(|v| JsonValue::Array(v.into_iter().map(float_value).collect()))
            .unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<bool>>, _>(idx) {
        return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<String>>, _>(idx) {
        return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
    }
    tracing::debug!(column = idx, type_name, "Unsupported array type");
    JsonValue::Null
}

fn decode_text(row: &PgRow, idx: usize, type_name: &str) -> JsonValue {
    match row.try_get::<Option<String>, _>(idx) {
        Ok(v) => v.map(JsonValue::String).unwrap_or(JsonValue::Null),
        Err(_) => {
            // interval, inet, money ... have no text-compatible decoder
            tracing::debug!(column = idx, type_name, "Unsupported column type");
            JsonValue::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_type_integer() {
        assert_eq!(categorize_type("INT4"), TypeCategory::Integer);
        assert_eq!(categorize_type("INT8"), TypeCategory::Integer);
        assert_eq!(categorize_type("int2"), TypeCategory::Integer);
    }

    #[test]
    fn test_categorize_type_numeric_is_decimal() {
        assert_eq!(categorize_type("NUMERIC"), TypeCategory::Decimal);
        assert_eq!(categorize_type("FLOAT8"), TypeCategory::Float);
    }

    #[test]
    fn test_categorize_type_temporal() {
        assert_eq!(categorize_type("DATE"), TypeCategory::Date);
        assert_eq!(categorize_type("TIMESTAMP"), TypeCategory::Timestamp);
        assert_eq!(categorize_type("TIMESTAMPTZ"), TypeCategory::TimestampTz);
        assert_eq!(categorize_type("TIME"), TypeCategory::Time);
    }

    #[test]
    fn test_categorize_type_arrays_and_fallback() {
        assert_eq!(categorize_type("INT4[]"), TypeCategory::Array);
        assert_eq!(categorize_type("TEXT[]"), TypeCategory::Array);
        assert_eq!(categorize_type("VARCHAR"), TypeCategory::Text);
        assert_eq!(categorize_type("mood"), TypeCategory::Text);
    }

    #[test]
    fn test_categorize_type_json_and_uuid() {
        assert_eq!(categorize_type("JSONB"), TypeCategory::Json);
        assert_eq!(categorize_type("UUID"), TypeCategory::Uuid);
        assert_eq!(categorize_type("BYTEA"), TypeCategory::Binary);
    }

    #[test]
    fn test_encode_binary_value() {
        assert_eq!(
            encode_binary_value(b"hello world"),
            JsonValue::String("aGVsbG8gd29ybGQ=".to_string())
        );
        assert_eq!(
            encode_binary_value(&[0xFF, 0xFE, 0x00, 0x01]),
            JsonValue::String("//4AAQ==".to_string())
        );
        assert_eq!(encode_binary_value(&[]), JsonValue::String(String::new()));
    }

    #[test]
    fn test_float_value_non_finite_becomes_string() {
        assert_eq!(float_value(1.5), serde_json::json!(1.5));
        assert_eq!(float_value(f64::NAN), JsonValue::String("NaN".to_string()));
    }
}
