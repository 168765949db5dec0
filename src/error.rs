use crate::normalizer::SourceKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    /// Fewer than three exports were supplied; nothing is processed.
    #[error("missing required input: {0} export was not provided")]
    MissingRequiredInput(SourceKind),

    /// The export could not be read as tabular data at all.
    #[error("{kind} export is not readable as CSV: {reason}")]
    UnreadableInput { kind: SourceKind, reason: String },

    /// A ledger export that does not match the expected layout
    #[error("invalid ledger export: {0}")]
    InvalidExport(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
