// 📤 Export Serializer - ledger to CSV text for download / pivot tables

use crate::coerce::{parse_day, parse_plain_amount};
use crate::error::{LedgerError, Result};
use crate::ledger::Ledger;
use crate::schema::{CanonicalRecord, Field, SchemaVariant};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Terminator, WriterBuilder};
use std::io;

/// Suggested file name for the download collaborator
pub const EXPORT_FILE_NAME: &str = "flat_sales_data.csv";

/// Basic exports carry a midnight timestamp so spreadsheets group by date
pub fn format_day(day: NaiveDate, variant: SchemaVariant) -> String {
    match variant {
        SchemaVariant::Basic => day.format("%Y-%m-%d 00:00:00").to_string(),
        SchemaVariant::Enhanced => day.format("%Y-%m-%d").to_string(),
    }
}

pub fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}

/// Render the ledger as CSV: header row, then one row per record in order.
pub fn to_csv(ledger: &Ledger) -> Result<String> {
    let variant = ledger.variant();
    let fields = variant.fields();

    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(variant.headers())?;

    for record in ledger.records() {
        let row: Vec<String> = fields
            .iter()
            .map(|spec| match spec.field {
                Field::Day => format_day(record.day, variant),
                Field::Amount => format_amount(record.amount),
                field => record
                    .text(field)
                    .or(spec.default)
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect();
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| LedgerError::Io(e.into_error()))?;

    String::from_utf8(bytes)
        .map_err(|e| LedgerError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// Read an export produced by [`to_csv`] back into records.
pub fn parse_export(text: &str, variant: SchemaVariant) -> Result<Vec<CanonicalRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let expected = variant.headers();
    let found: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if found != expected {
        return Err(LedgerError::InvalidExport(format!(
            "expected header {:?}, found {:?}",
            expected, found
        )));
    }

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let row = result?;
        let line = idx + 2;
        let cell = |i: usize| row.get(i).unwrap_or("");

        let day = parse_day(cell(0)).ok_or_else(|| {
            LedgerError::InvalidExport(format!("line {}: bad day '{}'", line, cell(0)))
        })?;
        let amount = parse_plain_amount(cell(1)).ok_or_else(|| {
            LedgerError::InvalidExport(format!("line {}: bad amount '{}'", line, cell(1)))
        })?;

        let mut record = CanonicalRecord::new(day, amount, cell(2).to_string());
        if variant == SchemaVariant::Enhanced {
            record.transaction_type = Some(cell(3).to_string());
            record.response_code = Some(cell(4).to_string());
            record.card_type = Some(cell(5).to_string());
        }
        records.push(record);
    }

    Ok(records)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LedgerEntry, UnionMerger};
    use crate::normalizer::SourceKind;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ledger(variant: SchemaVariant, records: Vec<CanonicalRecord>) -> Ledger {
        let entries = records
            .into_iter()
            .enumerate()
            .map(|(i, record)| LedgerEntry {
                origin: SourceKind::Cantaloupe,
                line_number: i + 2,
                record,
            })
            .collect();
        UnionMerger::new(variant).merge(vec![entries])
    }

    #[test]
    fn test_basic_export() {
        let l = ledger(
            SchemaVariant::Basic,
            vec![CanonicalRecord::new(day(2024, 1, 5), 12.5, "Lobby".to_string())],
        );

        let csv = to_csv(&l).unwrap();
        assert_eq!(csv, "Day,Amount ($),Source\n2024-01-05 00:00:00,12.50,Lobby\n");
    }

    #[test]
    fn test_enhanced_export() {
        let mut rec = CanonicalRecord::new(day(2024, 1, 5), -3.0, "Machine ID 7".to_string());
        rec.transaction_type = Some("Sale".to_string());
        rec.response_code = Some("00".to_string());
        rec.card_type = Some("VISA".to_string());

        let csv = to_csv(&ledger(SchemaVariant::Enhanced, vec![rec])).unwrap();
        assert_eq!(
            csv,
            "Day,Amount ($),Source,Transaction Type,Response Code,Card Type\n\
             2024-01-05,-3.00,Machine ID 7,Sale,00,VISA\n"
        );
    }

    #[test]
    fn test_header_only_for_empty_ledger() {
        let csv = to_csv(&ledger(SchemaVariant::Basic, vec![])).unwrap();
        assert_eq!(csv, "Day,Amount ($),Source\n");
    }

    #[test]
    fn test_source_with_comma_is_quoted() {
        let l = ledger(
            SchemaVariant::Basic,
            vec![CanonicalRecord::new(day(2024, 2, 1), 1.0, "Lobby, East".to_string())],
        );

        let csv = to_csv(&l).unwrap();
        assert!(csv.contains("\"Lobby, East\""));
    }

    #[test]
    fn test_export_round_trip() {
        let mut enhanced =
            CanonicalRecord::new(day(2023, 12, 31), 1234.56, "Gym, \"North\"".to_string());
        enhanced.transaction_type = Some("Coin".to_string());
        enhanced.response_code = Some("N/A".to_string());
        enhanced.card_type = Some("Unknown".to_string());

        let l = ledger(SchemaVariant::Enhanced, vec![enhanced.clone()]);
        let parsed = parse_export(&to_csv(&l).unwrap(), SchemaVariant::Enhanced).unwrap();
        assert_eq!(parsed, vec![enhanced]);

        let basic = CanonicalRecord::new(day(2024, 1, 5), 0.1, "Lobby".to_string());
        let l = ledger(SchemaVariant::Basic, vec![basic.clone()]);
        let parsed = parse_export(&to_csv(&l).unwrap(), SchemaVariant::Basic).unwrap();
        assert_eq!(parsed, vec![basic]);
    }

    #[test]
    fn test_parse_export_rejects_wrong_header() {
        let result = parse_export("Day,Amount ($),Source\n", SchemaVariant::Enhanced);
        assert!(matches!(result, Err(LedgerError::InvalidExport(_))));
    }
}
