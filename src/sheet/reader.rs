//! Loading sheets from disk.
//!
//! Everything here is blocking file I/O; async callers run it on the blocking
//! thread pool.

use super::grid::Sheet;
use super::{validate_path, SpreadsheetFormat};
use crate::db::types::float_value;
use crate::error::{ServerError, ServerResult};
use calamine::{open_workbook_auto, Data, Reader};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::path::Path;
use tracing::debug;

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Largest integer an f64 holds exactly.
const MAX_EXACT_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Clone, Serialize)]
pub struct SheetSummary {
    pub name: String,
    /// Rows in the used area
    pub rows: usize,
    /// Columns in the used area
    pub columns: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkbookSummary {
    pub path: String,
    pub format: SpreadsheetFormat,
    pub sheets: Vec<SheetSummary>,
}

/// Names and used-area sizes of every sheet, in workbook order.
pub fn list_sheets(path: &str) -> ServerResult<WorkbookSummary> {
    let (file, format) = validate_path(path)?;

    let sheets = match format {
        SpreadsheetFormat::Csv => vec![summarize(&read_csv(&file)?)],
        _ => {
            let mut workbook = open_workbook_auto(&file)?;
            let mut summaries = Vec::new();
            for name in workbook.sheet_names() {
                let range = workbook.worksheet_range(&name)?;
                let (rows, columns) = if range.is_empty() {
                    (0, 0)
                } else {
                    range.get_size()
                };
                summaries.push(SheetSummary { name, rows, columns });
            }
            summaries
        }
    };

    debug!(path = %path, format = %format, sheets = sheets.len(), "Listed sheets");

    Ok(WorkbookSummary {
        path: path.to_string(),
        format,
        sheets,
    })
}

/// Load one sheet, or the first one when `sheet` is `None`.
pub fn load_sheet(path: &str, sheet: Option<&str>) -> ServerResult<Sheet> {
    let (file, format) = validate_path(path)?;

    if format == SpreadsheetFormat::Csv {
        let loaded = read_csv(&file)?;
        return match sheet {
            Some(name) if name != loaded.name => {
                Err(ServerError::sheet_not_found(name, &[loaded.name]))
            }
            _ => Ok(loaded),
        };
    }

    let mut workbook = open_workbook_auto(&file)?;
    let names = workbook.sheet_names();
    let name = match sheet {
        Some(requested) if names.iter().any(|n| n == requested) => requested.to_string(),
        Some(requested) => return Err(ServerError::sheet_not_found(requested, &names)),
        None => names
            .first()
            .cloned()
            .ok_or_else(|| ServerError::sheet_not_found("(first)", &names))?,
    };

    let range = workbook.worksheet_range(&name)?;
    let origin = range.start().unwrap_or((0, 0));
    let cells = range
        .rows()
        .map(|row| row.iter().map(cell_to_json).collect())
        .collect();

    Ok(Sheet::new(name, origin, cells))
}

fn summarize(sheet: &Sheet) -> SheetSummary {
    SheetSummary {
        name: sheet.name.clone(),
        rows: sheet.height(),
        columns: sheet.width(),
    }
}

/// Convert a workbook cell to JSON.
pub fn cell_to_json(cell: &Data) -> JsonValue {
    match cell {
        Data::Empty => JsonValue::Null,
        Data::Int(i) => JsonValue::from(*i),
        Data::Float(f) => number_value(*f),
        Data::Bool(b) => JsonValue::Bool(*b),
        Data::String(s) => JsonValue::String(s.clone()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => JsonValue::String(value.format(DATETIME_FORMAT).to_string()),
            None => number_value(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => JsonValue::String(s.clone()),
        Data::Error(e) => JsonValue::String(e.to_string()),
    }
}

/// Whole floats become integers; workbooks store most numbers as floats.
fn number_value(value: f64) -> JsonValue {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < MAX_EXACT_FLOAT_INT {
        JsonValue::from(value as i64)
    } else {
        float_value(value)
    }
}

fn read_csv(path: &Path) -> ServerResult<Sheet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut cells: Vec<Vec<JsonValue>> = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        let line = record.position().map_or(cells.len() as u64 + 1, |p| p.line());
        let row = record
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let field = if cells.is_empty() && i == 0 {
                    field.strip_prefix(UTF8_BOM).unwrap_or(field)
                } else {
                    field
                };
                let text = std::str::from_utf8(field).map_err(|_| {
                    ServerError::parse(format!(
                        "CSV line {}, field {} is not valid UTF-8. Re-save the file as UTF-8",
                        line,
                        i + 1
                    ))
                })?;
                Ok(infer_csv_value(text))
            })
            .collect::<ServerResult<Vec<_>>>()?;
        cells.push(row);
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Sheet1".to_string());

    Ok(Sheet::new(name, (0, 0), cells))
}

/// Type a CSV field: empty -> null, then integer, float, bool, else string.
pub fn infer_csv_value(field: &str) -> JsonValue {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return JsonValue::Null;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return JsonValue::from(i);
    }
    if looks_numeric(trimmed) {
        if let Ok(f) = trimmed.parse::<f64>() {
            return float_value(f);
        }
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return JsonValue::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return JsonValue::Bool(false);
    }
    JsonValue::String(field.to_string())
}

/// Rules out words f64 parsing accepts, like "inf" and "NaN".
fn looks_numeric(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_digit())
        && s
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn csv_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("orders")
            .suffix(".csv")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_infer_csv_value() {
        assert_eq!(infer_csv_value(""), JsonValue::Null);
        assert_eq!(infer_csv_value("  "), JsonValue::Null);
        assert_eq!(infer_csv_value("42"), json!(42));
        assert_eq!(infer_csv_value("-7"), json!(-7));
        assert_eq!(infer_csv_value("3.5"), json!(3.5));
        assert_eq!(infer_csv_value("1e3"), json!(1000.0));
        assert_eq!(infer_csv_value("TRUE"), json!(true));
        assert_eq!(infer_csv_value("false"), json!(false));
        assert_eq!(infer_csv_value("inf"), json!("inf"));
        assert_eq!(infer_csv_value("NaN"), json!("NaN"));
        assert_eq!(infer_csv_value("1-2-3"), json!("1-2-3"));
        assert_eq!(infer_csv_value("hello"), json!("hello"));
    }

    #[test]
    fn test_cell_to_json() {
        assert_eq!(cell_to_json(&Data::Empty), JsonValue::Null);
        assert_eq!(cell_to_json(&Data::Float(3.0)), json!(3));
        assert_eq!(cell_to_json(&Data::Float(2.5)), json!(2.5));
        assert_eq!(cell_to_json(&Data::Int(9)), json!(9));
        assert_eq!(cell_to_json(&Data::Bool(true)), json!(true));
        assert_eq!(
            cell_to_json(&Data::String("x".to_string())),
            json!("x")
        );
        assert_eq!(
            cell_to_json(&Data::Error(calamine::CellErrorType::Div0)),
            json!("#DIV/0!")
        );
    }

    #[test]
    fn test_read_csv_ragged_rows() {
        let file = csv_file("id,name\n1,alice,extra\n2\n");
        let sheet = load_sheet(file.path().to_str().unwrap(), None).unwrap();

        assert!(sheet.name.starts_with("orders"));
        assert_eq!(sheet.height(), 3);
        assert_eq!(sheet.width(), 3);
        assert_eq!(sheet.cells[2], vec![json!(2), JsonValue::Null, JsonValue::Null]);
    }

    #[test]
    fn test_read_csv_strips_bom() {
        let file = csv_file("\u{feff}id,name\n1,a\n");
        let sheet = load_sheet(file.path().to_str().unwrap(), None).unwrap();
        assert_eq!(sheet.cells[0][0], json!("id"));
    }

    #[test]
    fn test_read_csv_rejects_invalid_utf8() {
        let mut file = csv_file("id,name\n");
        file.write_all(b"1,caf\xe9\n").unwrap();

        let err = load_sheet(file.path().to_str().unwrap(), None).unwrap_err();
        assert!(matches!(err, ServerError::Parse { .. }));
        assert!(err.to_string().contains("line 2, field 2"), "{err}");
    }

    #[test]
    fn test_csv_unknown_sheet() {
        let file = csv_file("a\n1\n");
        let err = load_sheet(file.path().to_str().unwrap(), Some("Other")).unwrap_err();
        assert!(matches!(err, ServerError::SheetNotFound { .. }));
    }

    #[test]
    fn test_list_sheets_csv() {
        let file = csv_file("a,b\n1,2\n3,4\n");
        let summary = list_sheets(file.path().to_str().unwrap()).unwrap();
        assert_eq!(summary.format, SpreadsheetFormat::Csv);
        assert_eq!(summary.sheets.len(), 1);
        assert_eq!(summary.sheets[0].rows, 3);
        assert_eq!(summary.sheets[0].columns, 2);
    }
}
