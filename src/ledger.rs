// 📚 Ledger - Union of the three aligned sources
//
// Concatenation order is fixed: Cantaloupe, then Kiosoft card, then
// Kiosoft coin, each in its original row order. No deduplication: identical
// rows from different sources are distinct sales.

use crate::normalizer::SourceKind;
use crate::schema::{CanonicalRecord, SchemaVariant};
use serde::Serialize;
use tracing::{info, warn};

/// A ledger row plus where it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub origin: SourceKind,
    pub line_number: usize,
    pub record: CanonicalRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    variant: SchemaVariant,
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn variant(&self) -> SchemaVariant {
        self.variant
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn records(&self) -> impl Iterator<Item = &CanonicalRecord> {
        self.entries.iter().map(|entry| &entry.record)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_from(&self, origin: SourceKind) -> usize {
        self.entries.iter().filter(|e| e.origin == origin).count()
    }

    pub fn total_amount(&self) -> f64 {
        self.records().map(|r| r.amount).sum()
    }
}

// ============================================================================
// UNION MERGER
// ============================================================================

pub struct UnionMerger {
    variant: SchemaVariant,
}

impl UnionMerger {
    pub fn new(variant: SchemaVariant) -> Self {
        UnionMerger { variant }
    }

    /// Concatenate aligned record sets in source order.
    ///
    /// Batches are placed by their `origin`, whatever order they are passed
    /// in. The ledger invariant is applied once more after concatenation.
    pub fn merge(&self, batches: Vec<Vec<LedgerEntry>>) -> Ledger {
        let total: usize = batches.iter().map(Vec::len).sum();
        let mut entries = Vec::with_capacity(total);

        for batch in batches {
            entries.extend(batch);
        }

        // stable sort: rows from one source keep their relative order
        entries.sort_by_key(|entry| entry.origin);

        let before = entries.len();
        entries.retain(|entry| entry.record.is_complete());
        if entries.len() != before {
            warn!(
                removed = before - entries.len(),
                "incomplete records reached the merger"
            );
        }

        info!(rows = entries.len(), variant = self.variant.name(), "merged ledger");

        Ledger {
            variant: self.variant,
            entries,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
