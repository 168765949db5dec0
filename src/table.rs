// 📄 Raw Tables - one parsed export file, before normalization
//
// Headers are made unique the way spreadsheet exports are usually read:
// blank header cells become "Unnamed: {index}" and repeats get ".{n}".

use crate::error::{LedgerError, Result};
use crate::normalizer::SourceKind;
use csv::{ByteRecord, ReaderBuilder};
use std::collections::HashMap;
use std::io::Read;

/// Cell texts treated as missing values.
const NULL_MARKERS: &[&str] = &["NA", "N/A", "NaN", "nan", "null", "NULL", "None", "#N/A"];

pub fn is_null_cell(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || NULL_MARKERS.contains(&trimmed)
}

// ============================================================================
// CORE TYPES
// ============================================================================

/// RawTable - An export exactly as uploaded, cells as text (or null)
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<RawRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Line in the original file (header is line 1)
    pub line_number: usize,
    cells: Vec<Option<String>>,
}

impl RawRow {
    /// Cell text at a column, `None` when null or out of range
    pub fn get(&self, column: usize) -> Option<&str> {
        self.cells.get(column).and_then(|cell| cell.as_deref())
    }
}

impl RawTable {
    /// Parse a CSV export.
    ///
    /// Short rows are padded with nulls and long rows truncated to the header
    /// width. Invalid UTF-8 is decoded lossily. A file without a header row
    /// is rejected.
    pub fn from_reader<R: Read>(kind: SourceKind, reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut records = reader.byte_records();

        let header_record = match records.next() {
            Some(result) => result.map_err(|e| unreadable(kind, e))?,
            None => {
                return Err(LedgerError::UnreadableInput {
                    kind,
                    reason: "file has no header row".to_string(),
                })
            }
        };

        let headers = name_columns(&header_record);
        let width = headers.len();

        let mut rows = Vec::new();
        for (idx, result) in records.enumerate() {
            let record = result.map_err(|e| unreadable(kind, e))?;

            let line_number = record
                .position()
                .map(|pos| pos.line() as usize)
                .unwrap_or(idx + 2);

            let mut cells: Vec<Option<String>> =
                record.iter().take(width).map(decode_cell).collect();
            cells.resize(width, None);

            rows.push(RawRow { line_number, cells });
        }

        Ok(RawTable { headers, rows })
    }

    pub fn from_bytes(kind: SourceKind, bytes: &[u8]) -> Result<Self> {
        Self::from_reader(kind, bytes)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn unreadable(kind: SourceKind, err: csv::Error) -> LedgerError {
    LedgerError::UnreadableInput {
        kind,
        reason: err.to_string(),
    }
}

fn decode_cell(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    if is_null_cell(&text) {
        None
    } else {
        Some(text.into_owned())
    }
}

fn name_columns(record: &ByteRecord) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(record.len());

    for (idx, raw) in record.iter().enumerate() {
        let text = String::from_utf8_lossy(raw);
        let text = if idx == 0 {
            text.trim_start_matches('\u{feff}').to_string()
        } else {
            text.into_owned()
        };

        let base = if text.trim().is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            text
        };

        let count = seen.entry(base.clone()).or_insert(0);
        let name = if *count == 0 {
            base.clone()
        } else {
            format!("{}.{}", base, count)
        };
        *count += 1;

        names.push(name);
    }

    names
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(csv: &str) -> RawTable {
        RawTable::from_bytes(SourceKind::Cantaloupe, csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_headers_and_rows() {
        let table = parse("Day,Location,Amount\n2024-01-05,Lobby,1.00\n2024-01-06,Gym,2.00\n");

        assert_eq!(table.headers(), &["Day", "Location", "Amount"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].get(1), Some("Lobby"));
        assert_eq!(table.rows()[1].get(2), Some("2.00"));
    }

    #[test]
    fn test_blank_headers_are_unnamed() {
        let table = parse("Day,,Location,\n2024-01-05,x,Lobby,y\n");

        assert_eq!(table.headers(), &["Day", "Unnamed: 1", "Location", "Unnamed: 3"]);
    }

    #[test]
    fn test_duplicate_headers_get_suffix() {
        let table = parse("Amount,Amount,Amount\n1,2,3\n");

        assert_eq!(table.headers(), &["Amount", "Amount.1", "Amount.2"]);
    }

    #[test]
    fn test_null_markers_become_none() {
        let table = parse("a,b,c,d\n,N/A,  ,value\n");
        let row = &table.rows()[0];

        assert_eq!(row.get(0), None);
        assert_eq!(row.get(1), None);
        assert_eq!(row.get(2), None);
        assert_eq!(row.get(3), Some("value"));
    }

    #[test]
    fn test_ragged_rows_padded_and_truncated() {
        let table = parse("a,b,c\n1\n1,2,3,4\n");

        assert_eq!(table.rows()[0].get(0), Some("1"));
        assert_eq!(table.rows()[0].get(2), None);
        assert_eq!(table.rows()[1].get(2), Some("3"));
        assert_eq!(table.rows()[1].get(3), None);
    }

    #[test]
    fn test_line_numbers_start_after_header() {
        let table = parse("a,b\n1,2\n3,4\n");

        assert_eq!(table.rows()[0].line_number, 2);
        assert_eq!(table.rows()[1].line_number, 3);
    }

    #[test]
    fn test_bom_stripped_from_first_header() {
        let table = parse("\u{feff}Day,Location\n2024-01-05,Lobby\n");

        assert_eq!(table.headers()[0], "Day");
    }

    #[test]
    fn test_empty_input_rejected() {
        let result = RawTable::from_bytes(SourceKind::KiosoftCoin, b"");

        assert!(matches!(
            result,
            Err(LedgerError::UnreadableInput { kind: SourceKind::KiosoftCoin, .. })
        ));
    }

    #[test]
    fn test_is_null_cell() {
        assert!(is_null_cell(""));
        assert!(is_null_cell("   "));
        assert!(is_null_cell("NaN"));
        assert!(!is_null_cell("0"));
        assert!(!is_null_cell("Unknown"));
    }
}
