//! Query execution engine.
//!
//! Every query runs inside a transaction switched to `READ ONLY` that is always
//! rolled back, so a statement that slips past the keyword guard still cannot
//! modify data. Row limits are enforced while streaming: at most `limit + 1`
//! rows are pulled from the server, the extra row only marks truncation.

use crate::db::types::RowToJson;
use crate::error::ServerResult;
use crate::models::{QueryParam, QueryRequest, QueryResult};
use futures_util::StreamExt;
use sqlx::PgPool;
use sqlx::postgres::{PgArguments, PgRow};
use std::time::Instant;
use tracing::{debug, warn};

/// Query executor for read-only statements.
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryExecutor;

impl QueryExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Execute a query and return at most `request.effective_limit()` rows.
    ///
    /// The caller is expected to have passed the SQL through the read-only
    /// guard already.
    pub async fn execute_query(&self, pool: &PgPool, request: &QueryRequest) -> ServerResult<QueryResult> {
        let start = Instant::now();
        let row_limit = request.effective_limit();

        debug!(
            sql = %request.sql,
            params = request.params.len(),
            limit = row_limit,
            "Executing query"
        );

        let rows = fetch_rows(pool, &request.sql, &request.params, row_limit).await?;
        Ok(process_rows(rows, row_limit, start))
    }
}

async fn fetch_rows(
    pool: &PgPool,
    sql: &str,
    params: &[QueryParam],
    row_limit: u32,
) -> ServerResult<Vec<PgRow>> {
    let fetch_limit = row_limit as usize + 1;

    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION READ ONLY")
        .execute(&mut *tx)
        .await?;

    let results = if params.is_empty() {
        // Unprepared: statements like EXPLAIN ANALYZE do not always prepare cleanly
        use sqlx::Executor;
        (&mut *tx)
            .fetch(sql)
            .take(fetch_limit)
            .collect::<Vec<_>>()
            .await
    } else {
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_param(query, param);
        }
        query
            .fetch(&mut *tx)
            .take(fetch_limit)
            .collect::<Vec<_>>()
            .await
    };

    tx.rollback().await?;

    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        rows.push(result?);
    }
    Ok(rows)
}

fn bind_param<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    param: &'q QueryParam,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
    }
}

/// Convert fetched rows into a `QueryResult`, dropping the look-ahead row.
fn process_rows<R: RowToJson>(rows: Vec<R>, row_limit: u32, start: Instant) -> QueryResult {
    let execution_time_ms = start.elapsed().as_millis() as u64;

    let Some(first) = rows.first() else {
        return QueryResult::empty(execution_time_ms);
    };

    let columns = first.get_column_metadata();
    let total_rows = rows.len();
    let truncated = total_rows > row_limit as usize;

    let json_rows = rows
        .iter()
        .take(row_limit as usize)
        .map(RowToJson::to_json_map)
        .collect();

    if truncated {
        warn!(limit = row_limit, "Query result truncated");
    }

    QueryResult {
        columns,
        rows: json_rows,
        truncated,
        execution_time_ms,
    }
}
