//! Conversion of handler results into MCP tool results.
//!
//! Domain failures become tool results with `isError` set, so the assistant
//! sees the message and can recover. Only a serialization failure is reported
//! as a protocol error.

use crate::error::{ServerError, ServerResult};
use rmcp::ErrorData as McpError;
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use tracing::warn;

/// Pretty JSON on success, the error message (and suggestion) on failure.
pub fn into_call_result<T: Serialize>(
    tool: &str,
    result: ServerResult<T>,
) -> Result<CallToolResult, McpError> {
    match result {
        Ok(value) => {
            let text = serde_json::to_string_pretty(&value).map_err(|e| {
                McpError::internal_error(format!("Failed to serialize {} result: {}", tool, e), None)
            })?;
            Ok(CallToolResult::success(vec![Content::text(text)]))
        }
        Err(err) => {
            warn!(tool, error = %err, "Tool call failed");
            Ok(CallToolResult::error(vec![Content::text(error_text(&err))]))
        }
    }
}

pub fn error_text(err: &ServerError) -> String {
    match err.suggestion() {
        Some(suggestion) => format!("{}\nSuggestion: {}", err, suggestion),
        None => err.to_string(),
    }
}

/// Check a connection name before the registry is asked.
///
/// Names are used exactly as given, so blank names and names with
/// surrounding whitespace are rejected rather than rewritten.
pub fn validate_connection_name(provided: &str) -> ServerResult<String> {
    let trimmed = provided.trim();
    if trimmed.is_empty() {
        return Err(ServerError::invalid_input(
            "connection is required. Call list_connections to see registered names.",
        ));
    }
    if trimmed.len() != provided.len() {
        return Err(ServerError::invalid_input(format!(
            "connection name '{}' has leading or trailing whitespace. Use '{}' instead.",
            provided, trimmed
        )));
    }
    Ok(provided.to_string())
}
