// 🧾 Run Report - what each run kept and what it silently dropped
//
// Side channel only: the exported CSV is the same with or without it.

use crate::error::Result;
use crate::normalizer::{Discard, DropReason, SourceKind};
use crate::schema::SchemaVariant;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

// ============================================================================
// SOURCE SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub source: SourceKind,
    pub normalizer_version: String,
    pub rows_read: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
}

// ============================================================================
// RUN REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub variant: SchemaVariant,
    pub sources: Vec<SourceSummary>,
    pub discards: Vec<Discard>,
    pub ledger_rows: usize,
    pub export_sha256: String,
}

impl RunReport {
    pub fn new(
        variant: SchemaVariant,
        sources: Vec<SourceSummary>,
        discards: Vec<Discard>,
        ledger_rows: usize,
        export: &str,
    ) -> Self {
        RunReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            variant,
            sources,
            discards,
            ledger_rows,
            export_sha256: export_digest(export),
        }
    }

    pub fn total_read(&self) -> usize {
        self.sources.iter().map(|s| s.rows_read).sum()
    }

    pub fn total_dropped(&self) -> usize {
        self.discards.len()
    }

    pub fn dropped_for(&self, reason: DropReason) -> usize {
        self.discards.iter().filter(|d| d.reason == reason).count()
    }

    /// Every row read was either kept in the ledger or logged as dropped
    pub fn is_conserved(&self) -> bool {
        let kept: usize = self.sources.iter().map(|s| s.rows_kept).sum();
        kept == self.ledger_rows && kept + self.total_dropped() == self.total_read()
    }

    pub fn summary(&self) -> String {
        let per_source: Vec<String> = self
            .sources
            .iter()
            .map(|s| format!("{} {}/{}", s.source.name(), s.rows_kept, s.rows_read))
            .collect();

        format!(
            "Ledger ({}): {} rows [{}], {} dropped ({} unparsable, {} null, {} missing column)",
            self.variant,
            self.ledger_rows,
            per_source.join(", "),
            self.total_dropped(),
            self.dropped_for(DropReason::Unparsable),
            self.dropped_for(DropReason::NullValue),
            self.dropped_for(DropReason::MissingColumn),
        )
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// SHA-256 of the exported CSV text, hex encoded
pub fn export_digest(export: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(export.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;

    fn summary(source: SourceKind, read: usize, kept: usize) -> SourceSummary {
        SourceSummary {
            source,
            normalizer_version: "1.0.0".to_string(),
            rows_read: read,
            rows_kept: kept,
            rows_dropped: read - kept,
        }
    }

    fn discard(reason: DropReason) -> Discard {
        Discard {
            origin: SourceKind::KiosoftCoin,
            line_number: 4,
            field: Field::Amount,
            reason,
            value: Some("$3,00".to_string()),
        }
    }

    fn sample_report() -> RunReport {
        RunReport::new(
            SchemaVariant::Basic,
            vec![
                summary(SourceKind::Cantaloupe, 3, 3),
                summary(SourceKind::KiosoftCard, 2, 1),
                summary(SourceKind::KiosoftCoin, 2, 1),
            ],
            vec![discard(DropReason::NullValue), discard(DropReason::Unparsable)],
            5,
            "Day,Amount ($),Source\n",
        )
    }

    #[test]
    fn test_report_conservation() {
        let report = sample_report();

        assert_eq!(report.total_read(), 7);
        assert_eq!(report.total_dropped(), 2);
        assert!(report.is_conserved());
    }

    #[test]
    fn test_report_summary() {
        let report = sample_report();
        let text = report.summary();

        assert!(text.starts_with("Ledger (basic): 5 rows"));
        assert!(text.contains("Kiosoft Card 1/2"));
        assert!(text.contains("1 unparsable, 1 null, 0 missing column"));
    }

    #[test]
    fn test_report_json() {
        let json = sample_report().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["variant"], "basic");
        assert_eq!(value["sources"][1]["source"], "kiosoft_card");
        assert_eq!(value["discards"][0]["field"], "amount");
        assert_eq!(value["discards"][0]["reason"], "null_value");
        assert_eq!(value["export_sha256"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn test_export_digest_is_stable() {
        assert_eq!(export_digest("abc"), export_digest("abc"));
        assert_ne!(export_digest("abc"), export_digest("abd"));
        assert_eq!(
            export_digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(sample_report().run_id, sample_report().run_id);
    }
}
