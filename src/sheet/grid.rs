//! In-memory cell grid and the header/record shaping applied to it.

use super::range::CellRange;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashSet;

/// One worksheet's used area.
///
/// `origin` is the absolute (row, column) of `cells[0][0]`. Rows are padded to
/// the same width.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub origin: (u32, u32),
    pub cells: Vec<Vec<JsonValue>>,
}

/// Rows cut out of a sheet, plus whether more were available.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub rows: Vec<Vec<JsonValue>>,
    pub truncated: bool,
}

impl Sheet {
    pub fn new(name: impl Into<String>, origin: (u32, u32), mut cells: Vec<Vec<JsonValue>>) -> Self {
        let width = cells.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut cells {
            row.resize(width, JsonValue::Null);
        }
        Self {
            name: name.into(),
            origin,
            cells,
        }
    }

    pub fn height(&self) -> usize {
        self.cells.len()
    }

    pub fn width(&self) -> usize {
        self.cells.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0 || self.width() == 0
    }

    /// The used area as an absolute range, or `None` for an empty sheet.
    pub fn bounds(&self) -> Option<CellRange> {
        if self.is_empty() {
            return None;
        }
        let (row, col) = self.origin;
        Some(CellRange::new(
            (row, col),
            (
                row + self.height() as u32 - 1,
                col + self.width() as u32 - 1,
            ),
        ))
    }

    /// Value at an absolute position, `Null` outside the used area.
    pub fn cell(&self, row: u32, col: u32) -> JsonValue {
        let (origin_row, origin_col) = self.origin;
        if row < origin_row || col < origin_col {
            return JsonValue::Null;
        }
        self.cells
            .get((row - origin_row) as usize)
            .and_then(|r| r.get((col - origin_col) as usize))
            .cloned()
            .unwrap_or(JsonValue::Null)
    }

    /// Copy at most `max_rows` rows of `area`, padding with `Null` where the
    /// area reaches past the used cells.
    pub fn extract(&self, area: CellRange, max_rows: usize) -> Block {
        let take = area.height().min(max_rows);
        let rows = (0..take as u32)
            .map(|offset| {
                let row = area.start_row + offset;
                (area.start_col..=area.end_col)
                    .map(|col| self.cell(row, col))
                    .collect()
            })
            .collect();

        Block {
            rows,
            truncated: area.height() > take,
        }
    }
}

/// Turn a header row into unique, non-empty column names.
///
/// Blank headers become `column_<n>` (1-based position). Repeats get `_2`,
/// `_3`, ... appended.
pub fn header_names(row: &[JsonValue]) -> Vec<String> {
    let mut used = HashSet::new();
    row.iter()
        .enumerate()
        .map(|(i, value)| {
            let base = match header_text(value) {
                Some(text) => text,
                None => format!("column_{}", i + 1),
            };

            let mut name = base.clone();
            let mut n = 2;
            while !used.insert(name.clone()) {
                name = format!("{}_{}", base, n);
                n += 1;
            }
            name
        })
        .collect()
}

fn header_text(value: &JsonValue) -> Option<String> {
    let text = match value {
        JsonValue::Null => return None,
        JsonValue::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// Pair each row with the headers. Every record carries every header key.
pub fn to_records(headers: &[String], rows: Vec<Vec<JsonValue>>) -> Vec<Map<String, JsonValue>> {
    rows.into_iter()
        .map(|row| {
            let mut values = row.into_iter();
            headers
                .iter()
                .map(|h| (h.clone(), values.next().unwrap_or(JsonValue::Null)))
                .collect()
        })
        .collect()
}
