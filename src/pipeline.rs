// 🔁 Pipeline - three exports in, one ledger and its CSV out
//
// Normalizers → Schema Aligner → Union Merger → Export Serializer.
// Each run is independent: nothing is shared or kept between calls.

use crate::config::PipelineConfig;
use crate::error::{LedgerError, Result};
use crate::export;
use crate::ledger::{Ledger, UnionMerger};
use crate::normalizer::{get_normalizer, SourceKind};
use crate::report::{RunReport, SourceSummary};
use crate::schema::SchemaAligner;
use crate::table::RawTable;
use tracing::info;

/// Raw export bytes as uploaded. Every source must be present.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineInputs<'a> {
    pub cantaloupe: Option<&'a [u8]>,
    pub kiosoft_card: Option<&'a [u8]>,
    pub kiosoft_coin: Option<&'a [u8]>,
}

impl<'a> PipelineInputs<'a> {
    pub fn get(&self, kind: SourceKind) -> Option<&'a [u8]> {
        match kind {
            SourceKind::Cantaloupe => self.cantaloupe,
            SourceKind::KiosoftCard => self.kiosoft_card,
            SourceKind::KiosoftCoin => self.kiosoft_coin,
        }
    }
}

/// The three parsed exports
#[derive(Debug, Clone)]
pub struct SourceTables {
    pub cantaloupe: RawTable,
    pub kiosoft_card: RawTable,
    pub kiosoft_coin: RawTable,
}

impl SourceTables {
    pub fn get(&self, kind: SourceKind) -> &RawTable {
        match kind {
            SourceKind::Cantaloupe => &self.cantaloupe,
            SourceKind::KiosoftCard => &self.kiosoft_card,
            SourceKind::KiosoftCoin => &self.kiosoft_coin,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub ledger: Ledger,
    pub csv: String,
    pub report: RunReport,
}

/// Run the whole pipeline over uploaded bytes.
///
/// Fails before parsing anything if an input is missing, and before
/// normalizing anything if an input is not tabular.
pub fn run(inputs: &PipelineInputs<'_>, config: &PipelineConfig) -> Result<PipelineOutput> {
    for kind in SourceKind::ALL {
        if inputs.get(kind).is_none() {
            return Err(LedgerError::MissingRequiredInput(kind));
        }
    }

    let parse = |kind: SourceKind| -> Result<RawTable> {
        let bytes = inputs
            .get(kind)
            .ok_or(LedgerError::MissingRequiredInput(kind))?;
        RawTable::from_bytes(kind, bytes)
    };

    let tables = SourceTables {
        cantaloupe: parse(SourceKind::Cantaloupe)?,
        kiosoft_card: parse(SourceKind::KiosoftCard)?,
        kiosoft_coin: parse(SourceKind::KiosoftCoin)?,
    };

    run_tables(tables, config)
}

/// Run the pipeline over already-parsed tables. Tables are consumed.
pub fn run_tables(tables: SourceTables, config: &PipelineConfig) -> Result<PipelineOutput> {
    let variant = config.variant;
    info!(variant = variant.name(), "starting ledger run");

    let aligner = SchemaAligner::new(variant);

    let mut batches = Vec::with_capacity(SourceKind::ALL.len());
    let mut summaries = Vec::with_capacity(SourceKind::ALL.len());
    let mut discards = Vec::new();

    for kind in SourceKind::ALL {
        let normalizer = get_normalizer(kind, config.decimal_for(kind));
        let normalized = normalizer.normalize(tables.get(kind), variant);

        summaries.push(SourceSummary {
            source: kind,
            normalizer_version: normalizer.version().to_string(),
            rows_read: normalized.rows_read,
            rows_kept: normalized.records.len(),
            rows_dropped: normalized.discards.len(),
        });
        discards.extend(normalized.discards);
        batches.push(aligner.align(normalized.records));
    }
    drop(tables);

    let ledger = UnionMerger::new(variant).merge(batches);
    let csv = export::to_csv(&ledger)?;
    let report = RunReport::new(variant, summaries, discards, ledger.len(), &csv);

    info!(run_id = %report.run_id, "{}", report.summary());

    Ok(PipelineOutput {
        ledger,
        csv,
        report,
    })
}

// ============================================================================
// TESTS
// ============================================================================
