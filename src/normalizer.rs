// 🏗️ Source Normalizers
// One normalizer per point-of-sale export, all producing the same record shape

use crate::coerce::{parse_currency_amount, parse_day, parse_plain_amount, DecimalSeparator};
use crate::columns::{resolve, ColumnRule, ResolvedColumn};
use crate::schema::{Field, SchemaVariant, UNKNOWN};
use crate::table::{RawRow, RawTable};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

// ============================================================================
// CORE TYPES
// ============================================================================

/// SourceKind - Which point-of-sale platform an export came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Cantaloupe,
    KiosoftCard,
    KiosoftCoin,
}

impl SourceKind {
    /// Ledger concatenation order
    pub const ALL: [SourceKind; 3] = [
        SourceKind::Cantaloupe,
        SourceKind::KiosoftCard,
        SourceKind::KiosoftCoin,
    ];

    /// Human-readable name for display
    pub fn name(&self) -> &str {
        match self {
            SourceKind::Cantaloupe => "Cantaloupe",
            SourceKind::KiosoftCard => "Kiosoft Card",
            SourceKind::KiosoftCoin => "Kiosoft Coin",
        }
    }

    /// Short code for config keys and logs
    pub fn code(&self) -> &str {
        match self {
            SourceKind::Cantaloupe => "cantaloupe",
            SourceKind::KiosoftCard => "kiosoft_card",
            SourceKind::KiosoftCoin => "kiosoft_coin",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// NormalizedRecord - A row that survived coercion, in the source's terms
///
/// `date`, `amount` and `source` are always present. Optional fields are
/// `None` when this source does not provide them; the aligner decides
/// what they become.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub origin: SourceKind,
    pub line_number: usize,
    pub date: NaiveDate,
    pub amount: f64,
    pub source: String,
    pub transaction_type: Option<String>,
    pub response_code: Option<String>,
    pub card_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// No column could be resolved for the field
    MissingColumn,
    /// The cell was empty or a missing-value marker
    NullValue,
    /// The cell had text that did not coerce
    Unparsable,
}

/// A dropped row, kept for the run report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discard {
    pub origin: SourceKind,
    pub line_number: usize,
    pub field: Field,
    pub reason: DropReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Output of one normalizer run
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub origin: SourceKind,
    pub rows_read: usize,
    pub records: Vec<NormalizedRecord>,
    pub discards: Vec<Discard>,
}

// ============================================================================
// COMPOSABLE TRAITS
// ============================================================================

/// SourceNormalizer - Core trait, one implementation per export format
pub trait SourceNormalizer: Send + Sync {
    /// Turn a raw export into records, dropping rows without a usable
    /// day, amount or source. Never fails: bad rows become discards.
    fn normalize(&self, table: &RawTable, variant: SchemaVariant) -> Normalized;

    /// Get the source kind this normalizer handles
    fn source_kind(&self) -> SourceKind;

    /// Get normalizer version (for the run report)
    fn version(&self) -> &str {
        "1.0.0"
    }
}

/// CardTypeExtractor - Optional capability: brand from a masked card number
pub trait CardTypeExtractor {
    fn extract_card_type(&self, card_number: &str) -> Option<String>;
}

// ============================================================================
// FACTORY
// ============================================================================

/// Get the normalizer for a source kind
pub fn get_normalizer(kind: SourceKind, decimal: DecimalSeparator) -> Box<dyn SourceNormalizer> {
    match kind {
        SourceKind::Cantaloupe => Box::new(CantaloupeNormalizer::with_decimal(decimal)),
        SourceKind::KiosoftCard => Box::new(KiosoftCardNormalizer::new()),
        SourceKind::KiosoftCoin => Box::new(KiosoftCoinNormalizer::with_decimal(decimal)),
    }
}

// ============================================================================
// SHARED ROW HANDLING
// ============================================================================

pub const UNKNOWN_MACHINE: &str = "Unknown Machine";

fn resolve_logged(
    kind: SourceKind,
    field: Field,
    rules: &[ColumnRule],
    headers: &[String],
) -> Option<ResolvedColumn> {
    let resolved = resolve(rules, headers);
    match &resolved {
        Some(col) => debug!(
            source = kind.code(),
            field = %field,
            column = %col.name,
            rule = ?col.rule,
            "resolved column"
        ),
        None => warn!(
            source = kind.code(),
            field = %field,
            "no column matched; rows cannot supply this field"
        ),
    }
    resolved
}

/// Coerce one required cell, or describe why the row is dropped
fn required<T>(
    kind: SourceKind,
    row: &RawRow,
    field: Field,
    column: Option<&ResolvedColumn>,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<T, Discard> {
    let discard = |reason, value: Option<&str>| Discard {
        origin: kind,
        line_number: row.line_number,
        field,
        reason,
        value: value.map(str::to_string),
    };

    let Some(column) = column else {
        return Err(discard(DropReason::MissingColumn, None));
    };
    let Some(text) = row.get(column.index) else {
        return Err(discard(DropReason::NullValue, None));
    };

    parse(text).ok_or_else(|| discard(DropReason::Unparsable, Some(text)))
}

/// Optional text cell, trimmed
fn optional_text(row: &RawRow, column: Option<&ResolvedColumn>) -> Option<String> {
    column
        .and_then(|col| row.get(col.index))
        .map(|text| text.trim().to_string())
}

fn machine_source(row: &RawRow, machine_col: Option<&ResolvedColumn>) -> String {
    match optional_text(row, machine_col) {
        Some(id) => format!("Machine ID {}", id),
        None => UNKNOWN_MACHINE.to_string(),
    }
}

/// Run a row function over every row, splitting kept records from discards
fn collect_rows(
    kind: SourceKind,
    table: &RawTable,
    mut normalize_row: impl FnMut(&RawRow) -> Result<NormalizedRecord, Discard>,
) -> Normalized {
    let mut records = Vec::with_capacity(table.len());
    let mut discards = Vec::new();

    for row in table.rows() {
        match normalize_row(row) {
            Ok(record) => records.push(record),
            Err(discard) => {
                debug!(
                    source = kind.code(),
                    line = discard.line_number,
                    field = %discard.field,
                    reason = ?discard.reason,
                    "dropped row"
                );
                discards.push(discard);
            }
        }
    }

    info!(
        source = kind.code(),
        read = table.len(),
        kept = records.len(),
        dropped = discards.len(),
        "normalized export"
    );
    if records.is_empty() && !table.is_empty() {
        warn!(source = kind.code(), "every row was dropped");
    }

    Normalized {
        origin: kind,
        rows_read: table.len(),
        records,
        discards,
    }
}

// ============================================================================
// CANTALOUPE (vending-payment gateway)
// ============================================================================

/// Cantaloupe Parser
///
/// The export leaves the amount column's header blank, so it is found by
/// position (eighth column) unless a later export names it.
pub struct CantaloupeNormalizer {
    decimal: DecimalSeparator,
}

impl CantaloupeNormalizer {
    const DAY: &'static [ColumnRule] = &[ColumnRule::Exact("Day"), ColumnRule::Position(0)];
    const AMOUNT: &'static [ColumnRule] =
        &[ColumnRule::Exact("Amount ($)"), ColumnRule::Position(7)];
    const LOCATION: &'static [ColumnRule] = &[ColumnRule::Exact("Location")];
    const TRANSACTION_TYPE: &'static [ColumnRule] = &[ColumnRule::Exact("Transaction Type")];

    pub fn new() -> Self {
        Self::with_decimal(DecimalSeparator::Point)
    }

    pub fn with_decimal(decimal: DecimalSeparator) -> Self {
        CantaloupeNormalizer { decimal }
    }
}

impl Default for CantaloupeNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceNormalizer for CantaloupeNormalizer {
    fn normalize(&self, table: &RawTable, variant: SchemaVariant) -> Normalized {
        let kind = self.source_kind();
        let headers = table.headers();

        let day_col = resolve_logged(kind, Field::Day, Self::DAY, headers);
        let amount_col = resolve_logged(kind, Field::Amount, Self::AMOUNT, headers);
        let location_col = resolve(Self::LOCATION, headers);
        let type_col = resolve(Self::TRANSACTION_TYPE, headers);

        collect_rows(kind, table, |row| {
            let date = required(kind, row, Field::Day, day_col.as_ref(), parse_day)?;
            let amount = required(kind, row, Field::Amount, amount_col.as_ref(), |text| {
                parse_currency_amount(text, self.decimal)
            })?;

            // no Location column at all: "Unknown"; a blank Location drops the row
            let source = match &location_col {
                Some(_) => required(kind, row, Field::Source, location_col.as_ref(), |text| {
                    Some(text.trim().to_string())
                })?,
                None => UNKNOWN.to_string(),
            };

            let transaction_type = match variant {
                SchemaVariant::Enhanced => optional_text(row, type_col.as_ref()),
                SchemaVariant::Basic => None,
            };

            Ok(NormalizedRecord {
                origin: kind,
                line_number: row.line_number,
                date,
                amount,
                source,
                transaction_type,
                response_code: None,
                card_type: None,
            })
        })
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Cantaloupe
    }
}

// ============================================================================
// KIOSOFT CARD
// ============================================================================

/// Kiosoft card-transaction export
pub struct KiosoftCardNormalizer;

impl KiosoftCardNormalizer {
    const DATE_TIME: &'static [ColumnRule] =
        &[ColumnRule::Exact("Date Time"), ColumnRule::Position(0)];
    const AMOUNT_BASIC: &'static [ColumnRule] = &[ColumnRule::Exact("Total Amount ($)")];
    // export versions rename the amount column; any "...Amount..." header will do
    const AMOUNT_ENHANCED: &'static [ColumnRule] = &[ColumnRule::Contains("Amount")];
    const MACHINE_ID: &'static [ColumnRule] = &[ColumnRule::Exact("Machine ID")];
    const RESPONSE_CODE: &'static [ColumnRule] = &[ColumnRule::Exact("Response Code")];
    const TRANSACTION_TYPE: &'static [ColumnRule] = &[ColumnRule::Exact("Transaction Type")];
    const CARD_NUMBER: &'static [ColumnRule] = &[
        ColumnRule::Exact("Card Number"),
        ColumnRule::Contains("Card Number"),
        ColumnRule::Contains("Card No"),
    ];

    pub fn new() -> Self {
        KiosoftCardNormalizer
    }

    fn amount_rules(variant: SchemaVariant) -> &'static [ColumnRule] {
        match variant {
            SchemaVariant::Basic => Self::AMOUNT_BASIC,
            SchemaVariant::Enhanced => Self::AMOUNT_ENHANCED,
        }
    }
}

impl Default for KiosoftCardNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceNormalizer for KiosoftCardNormalizer {
    fn normalize(&self, table: &RawTable, variant: SchemaVariant) -> Normalized {
        let kind = self.source_kind();
        let headers = table.headers();

        let date_col = resolve_logged(kind, Field::Day, Self::DATE_TIME, headers);
        let amount_col = resolve_logged(kind, Field::Amount, Self::amount_rules(variant), headers);
        let machine_col = resolve(Self::MACHINE_ID, headers);
        let response_col = resolve(Self::RESPONSE_CODE, headers);
        let type_col = resolve(Self::TRANSACTION_TYPE, headers);
        let card_col = resolve(Self::CARD_NUMBER, headers);

        collect_rows(kind, table, |row| {
            let date = required(kind, row, Field::Day, date_col.as_ref(), parse_day)?;
            // card amounts arrive as bare numbers
            let amount =
                required(kind, row, Field::Amount, amount_col.as_ref(), parse_plain_amount)?;
            let source = machine_source(row, machine_col.as_ref());

            let mut record = NormalizedRecord {
                origin: kind,
                line_number: row.line_number,
                date,
                amount,
                source,
                transaction_type: None,
                response_code: None,
                card_type: None,
            };

            if variant == SchemaVariant::Enhanced {
                record.response_code = optional_text(row, response_col.as_ref());
                record.transaction_type = optional_text(row, type_col.as_ref());
                record.card_type = optional_text(row, card_col.as_ref())
                    .and_then(|number| self.extract_card_type(&number));
            }

            Ok(record)
        })
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::KiosoftCard
    }
}

fn card_suffix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // alphabetic brand right after a digit or mask character: "****1234VISA"
    PATTERN.get_or_init(|| {
        Regex::new(r"[0-9*#]\s*([A-Za-z]+)\s*$").expect("card suffix pattern is valid")
    })
}

impl CardTypeExtractor for KiosoftCardNormalizer {
    fn extract_card_type(&self, card_number: &str) -> Option<String> {
        card_suffix_pattern()
            .captures(card_number)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

// ============================================================================
// KIOSOFT COIN
// ============================================================================

/// Kiosoft coin-transaction export
///
/// Same layout family as the card export, but amounts carry currency
/// formatting and there is never a response code.
pub struct KiosoftCoinNormalizer {
    decimal: DecimalSeparator,
}

impl KiosoftCoinNormalizer {
    const DATE_TIME: &'static [ColumnRule] =
        &[ColumnRule::Exact("Date/Time"), ColumnRule::Position(0)];
    const AMOUNT_BASIC: &'static [ColumnRule] = &[ColumnRule::Exact("Amount ($)")];
    const AMOUNT_ENHANCED: &'static [ColumnRule] = &[ColumnRule::Contains("Amount")];
    const MACHINE_ID: &'static [ColumnRule] = &[ColumnRule::Exact("Machine ID")];

    pub const RESPONSE_CODE: &'static str = "N/A";
    pub const TRANSACTION_TYPE: &'static str = "Coin";

    pub fn new() -> Self {
        Self::with_decimal(DecimalSeparator::Point)
    }

    pub fn with_decimal(decimal: DecimalSeparator) -> Self {
        KiosoftCoinNormalizer { decimal }
    }

    fn amount_rules(variant: SchemaVariant) -> &'static [ColumnRule] {
        match variant {
            SchemaVariant::Basic => Self::AMOUNT_BASIC,
            SchemaVariant::Enhanced => Self::AMOUNT_ENHANCED,
        }
    }
}

impl Default for KiosoftCoinNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceNormalizer for KiosoftCoinNormalizer {
    fn normalize(&self, table: &RawTable, variant: SchemaVariant) -> Normalized {
        let kind = self.source_kind();
        let headers = table.headers();

        let date_col = resolve_logged(kind, Field::Day, Self::DATE_TIME, headers);
        let amount_col = resolve_logged(kind, Field::Amount, Self::amount_rules(variant), headers);
        let machine_col = resolve(Self::MACHINE_ID, headers);

        collect_rows(kind, table, |row| {
            let date = required(kind, row, Field::Day, date_col.as_ref(), parse_day)?;
            let amount = required(kind, row, Field::Amount, amount_col.as_ref(), |text| {
                parse_currency_amount(text, self.decimal)
            })?;
            let source = machine_source(row, machine_col.as_ref());

            let (transaction_type, response_code) = match variant {
                SchemaVariant::Enhanced => (
                    Some(Self::TRANSACTION_TYPE.to_string()),
                    Some(Self::RESPONSE_CODE.to_string()),
                ),
                SchemaVariant::Basic => (None, None),
            };

            Ok(NormalizedRecord {
                origin: kind,
                line_number: row.line_number,
                date,
                amount,
                source,
                transaction_type,
                response_code,
                card_type: None,
            })
        })
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::KiosoftCoin
    }
}

// ============================================================================
// TESTS
// ============================================================================
