//! Spreadsheet tools.
//!
//! `list_sheets` and `read_spreadsheet`. Parsing is blocking, so both run on
//! tokio's blocking pool.

use crate::error::{ServerError, ServerResult};
use crate::sheet::{self, CellRange, WorkbookSummary};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::info;

/// Default cap on rows returned by `read_spreadsheet`.
pub const DEFAULT_MAX_ROWS: usize = 10_000;

/// Cap on cells built by one `read_spreadsheet` call, header row included.
pub const MAX_CELLS: usize = 1_000_000;

fn default_has_header() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListSheetsInput {
    /// Path to a .xlsx, .xls, .ods or .csv file
    pub path: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ReadSpreadsheetInput {
    /// Path to a .xlsx, .xls, .ods or .csv file
    pub path: String,
    /// Sheet name. Default: the first sheet
    #[serde(default)]
    pub sheet: Option<String>,
    /// Cell range in A1 notation, e.g. "B2:D10" or "C3". Default: the used area
    #[serde(default)]
    pub range: Option<String>,
    /// Treat the first row of the range as column names. Default: true
    #[serde(default = "default_has_header")]
    pub has_header: bool,
    /// Maximum data rows to return
    #[serde(default)]
    pub max_rows: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SheetRows {
    Records(Vec<Map<String, JsonValue>>),
    Grid(Vec<Vec<JsonValue>>),
}

impl SheetRows {
    pub fn len(&self) -> usize {
        match self {
            Self::Records(rows) => rows.len(),
            Self::Grid(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadSpreadsheetOutput {
    pub sheet: String,
    /// Range actually read, absent for an empty sheet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<String>>,
    pub rows: SheetRows,
    pub row_count: usize,
    /// True if the range held more rows than were returned
    pub truncated: bool,
}

pub struct SpreadsheetToolHandler {
    max_rows: usize,
}

impl Default for SpreadsheetToolHandler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ROWS)
    }
}

impl SpreadsheetToolHandler {
    pub fn new(max_rows: usize) -> Self {
        Self {
            max_rows: max_rows.max(1),
        }
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    pub async fn list_sheets(&self, input: ListSheetsInput) -> ServerResult<WorkbookSummary> {
        run_blocking(move || sheet::list_sheets(&input.path)).await
    }

    pub async fn read_spreadsheet(
        &self,
        input: ReadSpreadsheetInput,
    ) -> ServerResult<ReadSpreadsheetOutput> {
        let limit = input
            .max_rows
            .map_or(self.max_rows, |n| n.clamp(1, self.max_rows));
        sheet::validate_path(&input.path)?;
        let range = input.range.as_deref().map(CellRange::parse).transpose()?;

        let path = input.path.clone();
        let output = run_blocking(move || {
            let loaded = sheet::load_sheet(&input.path, input.sheet.as_deref())?;
            shape(loaded, range, input.has_header, limit)
        })
        .await?;

        info!(
            path = %path,
            sheet = %output.sheet,
            row_count = output.row_count,
            truncated = output.truncated,
            "Spreadsheet read"
        );

        Ok(output)
    }
}

/// Cut the requested area out of a sheet and shape it as records or a grid.
fn shape(
    loaded: sheet::Sheet,
    range: Option<CellRange>,
    has_header: bool,
    limit: usize,
) -> ServerResult<ReadSpreadsheetOutput> {
    let Some(area) = range.or_else(|| loaded.bounds()) else {
        return Ok(ReadSpreadsheetOutput {
            sheet: loaded.name,
            range: None,
            headers: has_header.then(Vec::new),
            rows: if has_header {
                SheetRows::Records(Vec::new())
            } else {
                SheetRows::Grid(Vec::new())
            },
            row_count: 0,
            truncated: false,
        });
    };

    let header_rows = usize::from(has_header);
    let max_rows = limit.saturating_add(header_rows);
    let cells = area.height().min(max_rows).saturating_mul(area.width());
    if cells > MAX_CELLS {
        return Err(ServerError::invalid_input(format!(
            "Range {} would return {} cells, over the limit of {}. \
             Narrow the range or lower max_rows",
            area, cells, MAX_CELLS
        )));
    }

    let block = loaded.extract(area, max_rows);
    let mut rows = block.rows.into_iter();

    let (headers, rows) = if has_header {
        let header_row = rows.next().unwrap_or_default();
        let headers = sheet::header_names(&header_row);
        let records = sheet::to_records(&headers, rows.collect());
        (Some(headers), SheetRows::Records(records))
    } else {
        (None, SheetRows::Grid(rows.collect()))
    };

    Ok(ReadSpreadsheetOutput {
        sheet: loaded.name,
        range: Some(area.to_string()),
        headers,
        row_count: rows.len(),
        rows,
        truncated: block.truncated,
    })
}

async fn run_blocking<T, F>(f: F) -> ServerResult<T>
where
    F: FnOnce() -> ServerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServerError::internal(format!("Spreadsheet task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn grid() -> sheet::Sheet {
        sheet::Sheet::new(
            "Data",
            (0, 0),
            vec![
                vec![json!("id"), json!("name"), JsonValue::Null],
                vec![json!(1), json!("alice"), json!(true)],
                vec![json!(2), json!("bob"), JsonValue::Null],
            ],
        )
    }

    #[test]
    fn test_read_input_defaults() {
        let input: ReadSpreadsheetInput =
            serde_json::from_str(r#"{ "path": "/tmp/a.xlsx" }"#).unwrap();
        assert!(input.has_header);
        assert!(input.sheet.is_none());
        assert!(input.range.is_none());
    }

    #[test]
    fn test_shape_header_mode() {
        let output = shape(grid(), None, true, 100).unwrap();
        assert_eq!(output.headers.as_deref().unwrap(), ["id", "name", "column_3"]);
        assert_eq!(output.row_count, 2);
        assert_eq!(output.range.as_deref(), Some("A1:C3"));

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["rows"][0], json!({"id": 1, "name": "alice", "column_3": true}));
        assert_eq!(json["rows"][1]["column_3"], JsonValue::Null);
    }

    #[test]
    fn test_shape_grid_mode() {
        let output = shape(grid(), CellRange::parse("B2:C2").ok(), false, 100).unwrap();
        assert!(output.headers.is_none());
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["rows"], json!([["alice", true]]));
        assert!(json.get("headers").is_none());
    }

    #[test]
    fn test_shape_limit_excludes_header() {
        let output = shape(grid(), None, true, 1).unwrap();
        assert_eq!(output.row_count, 1);
        assert!(output.truncated);
    }

    #[test]
    fn test_shape_rejects_oversized_area() {
        let wide = CellRange::parse("A1:XFD200").ok();
        let err = shape(grid(), wide, false, 10_000).unwrap_err();
        assert!(matches!(err, ServerError::InvalidInput { .. }));
        assert!(err.to_string().contains("A1:XFD200"), "{err}");

        // Row limit shrinks the area below the cap.
        let output = shape(grid(), wide, false, 10).unwrap();
        assert_eq!(output.row_count, 10);
        assert_eq!(output.rows.len(), 10);
    }

    #[test]
    fn test_shape_empty_sheet() {
        let output = shape(sheet::Sheet::new("Empty", (0, 0), Vec::new()), None, true, 10).unwrap();
        assert_eq!(output.row_count, 0);
        assert!(output.range.is_none());
    }

    #[tokio::test]
    async fn test_bad_range_is_invalid_input() {
        let file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        let handler = SpreadsheetToolHandler::default();
        let err = handler
            .read_spreadsheet(ReadSpreadsheetInput {
                path: file.path().to_str().unwrap().to_string(),
                sheet: None,
                range: Some("B2:".to_string()),
                has_header: true,
                max_rows: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let handler = SpreadsheetToolHandler::new(5);
        let err = handler
            .list_sheets(ListSheetsInput {
                path: "/nowhere/book.xlsx".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::FileNotFound { .. }));
    }
}
