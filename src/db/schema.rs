//! Schema introspection for PostgreSQL.
//!
//! SQL queries live in the `queries` submodule. Every catalog column that is
//! read back as a Rust `String` is cast to `text` in SQL so the driver never
//! sees `name` or `sql_identifier` domain types.

use crate::db::ident::qualified_name;
use crate::db::types::RowToJson;
use crate::error::{ServerError, ServerResult};
use crate::models::{
    ColumnDefinition, ForeignKey, ForeignKeyAction, IndexInfo, TableInfo, TableSchema, TableType,
};
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;

/// SQLSTATE for `undefined_table`.
const UNDEFINED_TABLE: &str = "42P01";

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// List user schemas (system schemas excluded).
    pub async fn list_schemas(pool: &PgPool) -> ServerResult<Vec<String>> {
        let rows = sqlx::query(queries::LIST_SCHEMAS).fetch_all(pool).await?;
        let schemas = rows
            .iter()
            .map(|row| get_string(row, "schema_name"))
            .collect::<ServerResult<Vec<_>>>()?;

        debug!(count = schemas.len(), "Listed schemas");
        Ok(schemas)
    }

    /// List tables (and optionally views) in a schema.
    pub async fn list_tables(
        pool: &PgPool,
        schema: &str,
        include_views: bool,
    ) -> ServerResult<Vec<TableInfo>> {
        let query = if include_views {
            queries::LIST_TABLES_WITH_VIEWS
        } else {
            queries::LIST_TABLES_NO_VIEWS
        };

        let rows = sqlx::query(query).bind(schema).fetch_all(pool).await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in &rows {
            let name = get_string(row, "table_name")?;
            let type_str = get_string(row, "table_type")?;
            let mut table = TableInfo::new(name, schema, TableType::parse(&type_str));

            if let Ok(Some(total_size)) = row.try_get::<Option<i64>, _>("total_size") {
                table = table.with_total_size(total_size.max(0) as u64);
            }
            if let Ok(Some(count)) = row.try_get::<Option<i64>, _>("row_count") {
                table = table.with_estimated_rows(count.max(0) as u64);
            }
            if let Ok(Some(updated)) = row.try_get::<Option<DateTime<Utc>>, _>("updated_at") {
                table = table.with_updated_at(updated);
            }
            if let Ok(Some(comment)) = row.try_get::<Option<String>, _>("comment") {
                if !comment.is_empty() {
                    table = table.with_comment(comment);
                }
            }
            tables.push(table);
        }

        debug!(count = tables.len(), schema, "Listed tables");
        Ok(tables)
    }

    /// Describe a table's columns, primary key, foreign keys and indexes.
    pub async fn describe_table(
        pool: &PgPool,
        table: &str,
        schema: &str,
    ) -> ServerResult<TableSchema> {
        let columns = fetch_columns(pool, table, schema).await?;
        if columns.is_empty() {
            return Err(table_not_found(schema, table));
        }

        let primary_key = columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.clone())
            .collect();

        let foreign_keys = fetch_foreign_keys(pool, table, schema).await?;
        let indexes = fetch_indexes(pool, table, schema).await?;

        Ok(TableSchema {
            table_name: table.to_string(),
            schema_name: schema.to_string(),
            columns,
            primary_key,
            foreign_keys,
            indexes,
        })
    }

    pub async fn list_indexes(
        pool: &PgPool,
        table: &str,
        schema: &str,
    ) -> ServerResult<Vec<IndexInfo>> {
        ensure_table_exists(pool, table, schema).await?;
        fetch_indexes(pool, table, schema).await
    }

    pub async fn list_foreign_keys(
        pool: &PgPool,
        table: &str,
        schema: &str,
    ) -> ServerResult<Vec<ForeignKey>> {
        ensure_table_exists(pool, table, schema).await?;
        fetch_foreign_keys(pool, table, schema).await
    }

    /// First `limit` rows of a table, in no particular order.
    pub async fn sample_rows(
        pool: &PgPool,
        table: &str,
        schema: &str,
        limit: u32,
    ) -> ServerResult<Vec<serde_json::Map<String, JsonValue>>> {
        let sql = format!("SELECT * FROM {} LIMIT $1", qualified_name(schema, table));
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(pool)
            .await
            .map_err(|e| map_undefined_table(e, schema, table))?;

        Ok(rows.iter().map(RowToJson::to_json_map).collect())
    }

    /// Exact `COUNT(*)` of a table.
    pub async fn row_count(pool: &PgPool, table: &str, schema: &str) -> ServerResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", qualified_name(schema, table));
        let count: i64 = sqlx::query_scalar(&sql)
            .fetch_one(pool)
            .await
            .map_err(|e| map_undefined_table(e, schema, table))?;
        Ok(count)
    }
}

// =============================================================================
// SQL Query Templates
// =============================================================================

mod queries {
    pub const LIST_SCHEMAS: &str = r#"
        SELECT CAST(schema_name AS TEXT) AS schema_name
        FROM information_schema.schemata
        WHERE schema_name NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
        AND schema_name NOT LIKE 'pg_temp_%'
        AND schema_name NOT LIKE 'pg_toast_temp_%'
        ORDER BY schema_name
        "#;

    pub const LIST_TABLES_WITH_VIEWS: &str = r#"
        SELECT
            t.table_name::text AS table_name,
            t.table_type::text AS table_type,
            CASE
                WHEN t.table_type = 'BASE TABLE' THEN pg_total_relation_size(quote_ident($1) || '.' || quote_ident(t.table_name))
                ELSE NULL
            END AS total_size,
            s.n_live_tup AS row_count,
            GREATEST(s.last_vacuum, s.last_autovacuum, s.last_analyze, s.last_autoanalyze) AS updated_at,
            obj_description((quote_ident($1) || '.' || quote_ident(t.table_name))::regclass) AS comment
        FROM information_schema.tables t
        LEFT JOIN pg_stat_user_tables s
            ON s.schemaname = t.table_schema AND s.relname = t.table_name
        WHERE t.table_schema = $1
        AND t.table_type IN ('BASE TABLE', 'VIEW')
        ORDER BY t.table_name
        "#;

    pub const LIST_TABLES_NO_VIEWS: &str = r#"
        SELECT
            t.table_name::text AS table_name,
            t.table_type::text AS table_type,
            pg_total_relation_size(quote_ident($1) || '.' || quote_ident(t.table_name)) AS total_size,
            s.n_live_tup AS row_count,
            GREATEST(s.last_vacuum, s.last_autovacuum, s.last_analyze, s.last_autoanalyze) AS updated_at,
            obj_description((quote_ident($1) || '.' || quote_ident(t.table_name))::regclass) AS comment
        FROM information_schema.tables t
        LEFT JOIN pg_stat_user_tables s
            ON s.schemaname = t.table_schema AND s.relname = t.table_name
        WHERE t.table_schema = $1
        AND t.table_type = 'BASE TABLE'
        ORDER BY t.table_name
        "#;

    pub const TABLE_EXISTS: &str = r#"
        SELECT EXISTS (
            SELECT 1
            FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE c.relname = $1 AND n.nspname = $2
            AND c.relkind IN ('r', 'p', 'v', 'm', 'f')
        )
        "#;

    pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            c.column_name::text AS column_name,
            format_type(a.atttypid, a.atttypmod) AS column_type,
            c.is_nullable::text AS is_nullable,
            c.column_default::text AS column_default,
            CASE WHEN pk.column_name IS NOT NULL THEN true ELSE false END AS is_primary_key,
            col_description(t.oid, a.attnum) AS column_comment
        FROM information_schema.columns c
        JOIN pg_class t ON t.relname = c.table_name
        JOIN pg_namespace n ON n.oid = t.relnamespace AND n.nspname = c.table_schema
        JOIN pg_attribute a ON a.attrelid = t.oid AND a.attname = c.column_name
        LEFT JOIN (
            SELECT kcu.column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            WHERE tc.table_name = $1
            AND tc.table_schema = $2
            AND tc.constraint_type = 'PRIMARY KEY'
        ) pk ON c.column_name = pk.column_name
        WHERE c.table_name = $1 AND c.table_schema = $2
        ORDER BY c.ordinal_position
        "#;

    pub const DESCRIBE_FOREIGN_KEYS: &str = r#"
        SELECT
            con.conname::text AS constraint_name,
            att.attname::text AS column_name,
            fns.nspname::text AS foreign_schema_name,
            ft.relname::text AS foreign_table_name,
            fatt.attname::text AS foreign_column_name,
            CASE con.confdeltype
                WHEN 'r' THEN 'RESTRICT' WHEN 'c' THEN 'CASCADE'
                WHEN 'n' THEN 'SET NULL' WHEN 'd' THEN 'SET DEFAULT'
                ELSE 'NO ACTION'
            END AS delete_rule,
            CASE con.confupdtype
                WHEN 'r' THEN 'RESTRICT' WHEN 'c' THEN 'CASCADE'
                WHEN 'n' THEN 'SET NULL' WHEN 'd' THEN 'SET DEFAULT'
                ELSE 'NO ACTION'
            END AS update_rule
        FROM pg_constraint con
        JOIN pg_class t ON t.oid = con.conrelid
        JOIN pg_namespace n ON n.oid = t.relnamespace
        JOIN pg_class ft ON ft.oid = con.confrelid
        JOIN pg_namespace fns ON fns.oid = ft.relnamespace
        CROSS JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(attnum, fattnum, ord)
        JOIN pg_attribute att ON att.attrelid = con.conrelid AND att.attnum = k.attnum
        JOIN pg_attribute fatt ON fatt.attrelid = con.confrelid AND fatt.attnum = k.fattnum
        WHERE con.contype = 'f' AND t.relname = $1 AND n.nspname = $2
        ORDER BY con.conname, k.ord
        "#;

    pub const DESCRIBE_INDEXES: &str = r#"
        SELECT
            i.relname::text AS index_name,
            array_agg(a.attname::text ORDER BY array_position(ix.indkey, a.attnum)) AS column_names,
            ix.indisunique AS is_unique,
            ix.indisprimary AS is_primary,
            am.amname::text AS index_method,
            pg_get_indexdef(ix.indexrelid) AS definition
        FROM pg_index ix
        JOIN pg_class i ON i.oid = ix.indexrelid
        JOIN pg_class t ON t.oid = ix.indrelid
        JOIN pg_namespace n ON n.oid = t.relnamespace
        LEFT JOIN pg_am am ON am.oid = i.relam
        JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
        WHERE t.relname = $1 AND n.nspname = $2
        GROUP BY i.relname, ix.indexrelid, ix.indisunique, ix.indisprimary, am.amname
        ORDER BY i.relname
        "#;
}

// =============================================================================
// Helpers
// =============================================================================

fn get_string(row: &PgRow, column: &str) -> ServerResult<String> {
    Ok(row.try_get::<String, _>(column)?)
}

fn table_not_found(schema: &str, table: &str) -> ServerError {
    ServerError::object_not_found("Table", format!("{}.{}", schema, table))
}

fn map_undefined_table(err: sqlx::Error, schema: &str, table: &str) -> ServerError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNDEFINED_TABLE) {
            return table_not_found(schema, table);
        }
    }
    err.into()
}

async fn ensure_table_exists(pool: &PgPool, table: &str, schema: &str) -> ServerResult<()> {
    let exists: bool = sqlx::query_scalar(queries::TABLE_EXISTS)
        .bind(table)
        .bind(schema)
        .fetch_one(pool)
        .await?;
    if exists {
        Ok(())
    } else {
        Err(table_not_found(schema, table))
    }
}

async fn fetch_columns(
    pool: &PgPool,
    table: &str,
    schema: &str,
) -> ServerResult<Vec<ColumnDefinition>> {
    let rows = sqlx::query(queries::DESCRIBE_COLUMNS)
        .bind(table)
        .bind(schema)
        .fetch_all(pool)
        .await?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        let name = get_string(row, "column_name")?;
        let column_type = get_string(row, "column_type")?;
        let nullable = get_string(row, "is_nullable")?;
        let default_value: Option<String> = row.try_get("column_default")?;
        let is_pk: bool = row.try_get("is_primary_key")?;
        let comment: Option<String> = row.try_get("column_comment")?;

        let mut col =
            ColumnDefinition::new(name, column_type, nullable == "YES").with_primary_key(is_pk);
        if let Some(ref def) = default_value {
            col = col.with_default_str(def);
        }
        if let Some(c) = comment.filter(|c| !c.is_empty()) {
            col = col.with_comment(c);
        }
        columns.push(col);
    }
    Ok(columns)
}

async fn fetch_foreign_keys(
    pool: &PgPool,
    table: &str,
    schema: &str,
) -> ServerResult<Vec<ForeignKey>> {
    let rows = sqlx::query(queries::DESCRIBE_FOREIGN_KEYS)
        .bind(table)
        .bind(schema)
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| {
            Ok(ForeignKey {
                name: get_string(row, "constraint_name")?,
                column: get_string(row, "column_name")?,
                references_schema: get_string(row, "foreign_schema_name")?,
                references_table: get_string(row, "foreign_table_name")?,
                references_column: get_string(row, "foreign_column_name")?,
                on_delete: ForeignKeyAction::parse(&get_string(row, "delete_rule")?),
                on_update: ForeignKeyAction::parse(&get_string(row, "update_rule")?),
            })
        })
        .collect()
}

async fn fetch_indexes(pool: &PgPool, table: &str, schema: &str) -> ServerResult<Vec<IndexInfo>> {
    let rows = sqlx::query(queries::DESCRIBE_INDEXES)
        .bind(table)
        .bind(schema)
        .fetch_all(pool)
        .await?;

    let mut indexes = Vec::with_capacity(rows.len());
    for row in &rows {
        let name = get_string(row, "index_name")?;
        let columns: Vec<String> = row.try_get("column_names")?;
        if columns.is_empty() {
            continue;
        }
        let is_unique: bool = row.try_get("is_unique")?;
        let is_primary: bool = row.try_get("is_primary")?;

        let mut index = IndexInfo::new(name, columns)
            .with_unique(is_unique)
            .with_primary(is_primary);
        if let Ok(Some(method)) = row.try_get::<Option<String>, _>("index_method") {
            index = index.with_method(method);
        }
        if let Ok(Some(definition)) = row.try_get::<Option<String>, _>("definition") {
            index = index.with_definition(definition);
        }
        indexes.push(index);
    }
    Ok(indexes)
}
