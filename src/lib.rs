// Sales Ledger - Core Library
// Reconciles three point-of-sale exports into one flat sales ledger.
// Exposes all modules for use in the CLI, API server, and tests

pub mod coerce;
pub mod columns;
pub mod config;
pub mod error;
pub mod export;
pub mod ledger;
pub mod logging;
pub mod normalizer;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod table;

// Re-export commonly used types
pub use coerce::DecimalSeparator;
pub use columns::{resolve, ColumnRule, ResolvedColumn};
pub use config::{AmountFormatConfig, PipelineConfig, VARIANT_ENV};
pub use error::{LedgerError, Result};
pub use export::{parse_export, to_csv, EXPORT_FILE_NAME};
pub use ledger::{Ledger, LedgerEntry, UnionMerger};
pub use normalizer::{
    get_normalizer, CantaloupeNormalizer, CardTypeExtractor, Discard, DropReason,
    KiosoftCardNormalizer, KiosoftCoinNormalizer, Normalized, NormalizedRecord, SourceKind,
    SourceNormalizer,
};
pub use pipeline::{run, run_tables, PipelineInputs, PipelineOutput, SourceTables};
pub use report::{RunReport, SourceSummary};
pub use schema::{CanonicalRecord, Field, FieldSpec, SchemaAligner, SchemaVariant};
pub use table::{RawRow, RawTable};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
