//! A1 cell range notation.
//!
//! Positions are absolute and zero-based: `A1` is row 0, column 0. A range is
//! `TOPLEFT:BOTTOMRIGHT` or a single cell. `$` anchors are accepted and
//! ignored, corners given in reverse order are normalized.

use crate::error::{ServerError, ServerResult};
use std::fmt;
use std::str::FromStr;

/// Largest column index addressable in a worksheet (`XFD`).
pub const MAX_COLUMN: u32 = 16_383;

/// Largest row index addressable in a worksheet (row 1048576).
pub const MAX_ROW: u32 = 1_048_575;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl CellRange {
    /// Range spanning two corners in any order.
    pub fn new(a: (u32, u32), b: (u32, u32)) -> Self {
        Self {
            start_row: a.0.min(b.0),
            start_col: a.1.min(b.1),
            end_row: a.0.max(b.0),
            end_col: a.1.max(b.1),
        }
    }

    pub fn height(&self) -> usize {
        (self.end_row - self.start_row) as usize + 1
    }

    pub fn width(&self) -> usize {
        (self.end_col - self.start_col) as usize + 1
    }

    pub fn parse(input: &str) -> ServerResult<Self> {
        let trimmed = input.trim();
        let invalid = || {
            ServerError::invalid_input(format!(
                "Invalid cell range '{}': expected A1 notation such as B2:D10 or C3",
                input
            ))
        };

        let (first, second) = match trimmed.split_once(':') {
            Some((a, b)) => (a, Some(b)),
            None => (trimmed, None),
        };

        let start = parse_cell(first).ok_or_else(invalid)?;
        let end = match second {
            Some(b) => parse_cell(b).ok_or_else(invalid)?,
            None => start,
        };
        Ok(Self::new(start, end))
    }
}

impl FromStr for CellRange {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}{}",
            column_name(self.start_col),
            self.start_row + 1,
            column_name(self.end_col),
            self.end_row + 1
        )
    }
}

/// `"C3"` -> `(2, 2)`
fn parse_cell(cell: &str) -> Option<(u32, u32)> {
    let cell = cell.trim();
    let cell = cell.strip_prefix('$').unwrap_or(cell);
    let split = cell.find(|c: char| !c.is_ascii_alphabetic())?;
    let (letters, digits) = cell.split_at(split);
    let digits = digits.strip_prefix('$').unwrap_or(digits);

    if letters.is_empty() || digits.is_empty() {
        return None;
    }
    if !letters.chars().all(|c| c.is_ascii_alphabetic())
        || !digits.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let col = column_index(letters)?;
    let row: u32 = digits.parse().ok()?;
    if row == 0 || row - 1 > MAX_ROW {
        return None;
    }
    Some((row - 1, col))
}

/// `"A"` -> 0, `"Z"` -> 25, `"AA"` -> 26
pub fn column_index(letters: &str) -> Option<u32> {
    let mut index: u32 = 0;
    for c in letters.chars() {
        let value = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        index = index.checked_mul(26)?.checked_add(value)?;
        if index - 1 > MAX_COLUMN {
            return None;
        }
    }
    index.checked_sub(1)
}

/// 0 -> `"A"`, 26 -> `"AA"`
pub fn column_name(index: u32) -> String {
    let mut n = index + 1;
    let mut name = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        name.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_corners() {
        let range = CellRange::parse("B2:D10").unwrap();
        assert_eq!(
            range,
            CellRange {
                start_row: 1,
                start_col: 1,
                end_row: 9,
                end_col: 3
            }
        );
        assert_eq!(range.height(), 9);
        assert_eq!(range.width(), 3);
    }

    #[test]
    fn test_parse_single_cell() {
        let range = CellRange::parse("C3").unwrap();
        assert_eq!(range.height(), 1);
        assert_eq!(range.width(), 1);
        assert_eq!(range.to_string(), "C3:C3");
    }

    #[test]
    fn test_parse_normalizes_reversed_and_anchored() {
        let range: CellRange = "$d$10:b2".parse().unwrap();
        assert_eq!(range.to_string(), "B2:D10");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "2B", "B", "B0", "B2:", ":B2", "B2:D", "B-2", "A1:B2:C3", "XFE1"] {
            assert!(CellRange::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_column_conversions() {
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("z"), Some(25));
        assert_eq!(column_index("AA"), Some(26));
        assert_eq!(column_index("XFD"), Some(MAX_COLUMN));
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(27), "AB");
        assert_eq!(column_name(MAX_COLUMN), "XFD");
    }
}
