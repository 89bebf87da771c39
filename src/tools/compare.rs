//! Cross-connection comparison tools.
//!
//! `compare_schemas` and `compare_row_counts` fan out to every named
//! connection concurrently. Each target reports its own result or error; one
//! failing target never aborts the others.

use crate::db::{ConnectionRegistry, SchemaInspector};
use crate::error::{ServerError, ServerResult};
use crate::tools::schema::default_schema;
use futures_util::future::join_all;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CompareSchemasInput {
    /// Connection names to compare (at least one)
    pub connections: Vec<String>,
    /// Schema to compare on every connection. Default: public
    #[serde(default = "default_schema")]
    pub schema: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CompareRowCountsInput {
    /// Connection names to compare (at least one)
    pub connections: Vec<String>,
    /// Table to count on every connection
    pub table: String,
    /// Schema containing the table. Default: public
    #[serde(default = "default_schema")]
    pub schema: String,
}

/// Per-connection outcome: either a value or the error message.
#[derive(Debug, Clone, Serialize)]
pub struct TargetResult<T> {
    pub connection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> TargetResult<T> {
    fn from_result(connection: String, result: ServerResult<T>) -> Self {
        match result {
            Ok(value) => Self {
                connection,
                value: Some(value),
                error: None,
            },
            Err(e) => Self {
                connection,
                value: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UniqueTables {
    pub connection: String,
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareSchemasOutput {
    pub schema: String,
    /// Table names per connection (`value`) or the failure (`error`)
    pub results: Vec<TargetResult<Vec<String>>>,
    /// Tables present on every connection that answered
    pub common_tables: Vec<String>,
    /// Tables present on one connection but missing from at least one other
    pub unique_tables: Vec<UniqueTables>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareRowCountsOutput {
    pub table: String,
    pub schema: String,
    /// Row count per connection (`value`) or the failure (`error`)
    pub results: Vec<TargetResult<i64>>,
    /// True when every connection answered with the same count
    pub all_equal: bool,
}

/// Drop blanks and repeated names, keeping first-seen order.
fn normalize_targets(connections: Vec<String>) -> ServerResult<Vec<String>> {
    let mut seen = BTreeSet::new();
    let targets: Vec<String> = connections
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty() && seen.insert(c.clone()))
        .collect();

    if targets.is_empty() {
        return Err(ServerError::invalid_input(
            "connections must name at least one registered connection",
        ));
    }
    Ok(targets)
}

/// Intersection and per-target differences of the successful table lists.
fn diff_tables(results: &[TargetResult<Vec<String>>]) -> (Vec<String>, Vec<UniqueTables>) {
    let sets: Vec<(&str, BTreeSet<&str>)> = results
        .iter()
        .filter_map(|r| {
            r.value.as_ref().map(|tables| {
                (
                    r.connection.as_str(),
                    tables.iter().map(String::as_str).collect(),
                )
            })
        })
        .collect();

    let Some((_, first)) = sets.first() else {
        return (Vec::new(), Vec::new());
    };

    let common: BTreeSet<&str> = sets
        .iter()
        .skip(1)
        .fold(first.clone(), |acc, (_, set)| {
            acc.intersection(set).copied().collect()
        });

    let unique = sets
        .iter()
        .map(|(connection, set)| UniqueTables {
            connection: connection.to_string(),
            tables: set
                .difference(&common)
                .map(|t| t.to_string())
                .collect(),
        })
        .collect();

    (common.into_iter().map(String::from).collect(), unique)
}

pub struct CompareToolHandler {
    registry: Arc<ConnectionRegistry>,
}

impl CompareToolHandler {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    async fn table_names(&self, connection: &str, schema: &str) -> ServerResult<Vec<String>> {
        let pool = self.registry.get(connection).await?;
        let tables = SchemaInspector::list_tables(&pool, schema, false).await?;
        Ok(tables.into_iter().map(|t| t.name).collect())
    }

    async fn count(&self, connection: &str, table: &str, schema: &str) -> ServerResult<i64> {
        let pool = self.registry.get(connection).await?;
        SchemaInspector::row_count(&pool, table, schema).await
    }

    pub async fn compare_schemas(
        &self,
        input: CompareSchemasInput,
    ) -> ServerResult<CompareSchemasOutput> {
        let targets = normalize_targets(input.connections)?;
        let schema = input.schema;

        let outcomes = join_all(targets.iter().map(|c| self.table_names(c, &schema))).await;
        let results: Vec<_> = targets
            .into_iter()
            .zip(outcomes)
            .map(|(connection, result)| TargetResult::from_result(connection, result))
            .collect();

        let (common_tables, unique_tables) = diff_tables(&results);

        info!(
            schema = %schema,
            targets = results.len(),
            common = common_tables.len(),
            "Compared schemas"
        );

        Ok(CompareSchemasOutput {
            schema,
            results,
            common_tables,
            unique_tables,
        })
    }

    pub async fn compare_row_counts(
        &self,
        input: CompareRowCountsInput,
    ) -> ServerResult<CompareRowCountsOutput> {
        let targets = normalize_targets(input.connections)?;

        let outcomes = join_all(
            targets
                .iter()
                .map(|c| self.count(c, &input.table, &input.schema)),
        )
        .await;
        let results: Vec<_> = targets
            .into_iter()
            .zip(outcomes)
            .map(|(connection, result)| TargetResult::from_result(connection, result))
            .collect();

        let all_equal = results.iter().all(|r| r.error.is_none())
            && results.windows(2).all(|w| w[0].value == w[1].value);

        info!(
            table = %input.table,
            targets = results.len(),
            all_equal,
            "Compared row counts"
        );

        Ok(CompareRowCountsOutput {
            table: input.table,
            schema: input.schema,
            results,
            all_equal,
        })
    }
}
