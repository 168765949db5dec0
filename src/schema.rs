// 📐 Shape Layer - Schema variants and alignment
// Projects every source onto the same ordered field list before union

use crate::ledger::LedgerEntry;
use crate::normalizer::NormalizedRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// SCHEMA VARIANTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVariant {
    /// Day, Amount, Source
    #[default]
    Basic,
    /// Basic plus Transaction Type, Response Code, Card Type
    Enhanced,
}

impl SchemaVariant {
    pub fn name(&self) -> &str {
        match self {
            SchemaVariant::Basic => "basic",
            SchemaVariant::Enhanced => "enhanced",
        }
    }

    /// Ordered output fields with their default policy
    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            SchemaVariant::Basic => BASIC_FIELDS,
            SchemaVariant::Enhanced => ENHANCED_FIELDS,
        }
    }

    pub fn headers(&self) -> Vec<&'static str> {
        self.fields().iter().map(|spec| spec.field.header()).collect()
    }

    pub fn includes(&self, field: Field) -> bool {
        self.fields().iter().any(|spec| spec.field == field)
    }

    pub fn default_for(&self, field: Field) -> Option<&'static str> {
        self.fields()
            .iter()
            .find(|spec| spec.field == field)
            .and_then(|spec| spec.default)
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SchemaVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(SchemaVariant::Basic),
            "enhanced" => Ok(SchemaVariant::Enhanced),
            other => Err(format!(
                "unknown schema variant '{}' (expected 'basic' or 'enhanced')",
                other
            )),
        }
    }
}

// ============================================================================
// FIELDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Day,
    Amount,
    Source,
    TransactionType,
    ResponseCode,
    CardType,
}

impl Field {
    /// Column header in the exported CSV
    pub fn header(&self) -> &'static str {
        match self {
            Field::Day => "Day",
            Field::Amount => "Amount ($)",
            Field::Source => "Source",
            Field::TransactionType => "Transaction Type",
            Field::ResponseCode => "Response Code",
            Field::CardType => "Card Type",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header())
    }
}

/// A field in a schema variant. Required fields have no default; rows
/// without them never make it past normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: Field,
    pub default: Option<&'static str>,
}

impl FieldSpec {
    const fn required(field: Field) -> Self {
        FieldSpec { field, default: None }
    }

    const fn optional(field: Field, default: &'static str) -> Self {
        FieldSpec {
            field,
            default: Some(default),
        }
    }
}

pub const UNKNOWN: &str = "Unknown";

const BASIC_FIELDS: &[FieldSpec] = &[
    FieldSpec::required(Field::Day),
    FieldSpec::required(Field::Amount),
    FieldSpec::required(Field::Source),
];

const ENHANCED_FIELDS: &[FieldSpec] = &[
    FieldSpec::required(Field::Day),
    FieldSpec::required(Field::Amount),
    FieldSpec::required(Field::Source),
    FieldSpec::optional(Field::TransactionType, UNKNOWN),
    FieldSpec::optional(Field::ResponseCode, UNKNOWN),
    FieldSpec::optional(Field::CardType, UNKNOWN),
];

// ============================================================================
// CANONICAL RECORD
// ============================================================================

/// One row of the output ledger. Enhanced-only fields are `None` under the
/// basic variant and always `Some` under the enhanced one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub day: NaiveDate,
    pub amount: f64,
    pub source: String,
    pub transaction_type: Option<String>,
    pub response_code: Option<String>,
    pub card_type: Option<String>,
}

impl CanonicalRecord {
    pub fn new(day: NaiveDate, amount: f64, source: String) -> Self {
        CanonicalRecord {
            day,
            amount,
            source,
            transaction_type: None,
            response_code: None,
            card_type: None,
        }
    }

    /// Ledger invariant: day, amount and source all usable
    pub fn is_complete(&self) -> bool {
        self.amount.is_finite() && !self.source.trim().is_empty()
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::Source => Some(&self.source),
            Field::TransactionType => self.transaction_type.as_deref(),
            Field::ResponseCode => self.response_code.as_deref(),
            Field::CardType => self.card_type.as_deref(),
            Field::Day | Field::Amount => None,
        }
    }
}

// ============================================================================
// SCHEMA ALIGNER
// ============================================================================

pub struct SchemaAligner {
    variant: SchemaVariant,
}

impl SchemaAligner {
    pub fn new(variant: SchemaVariant) -> Self {
        SchemaAligner { variant }
    }

    /// Project normalized records onto the variant's field list.
    ///
    /// The source's date becomes `day`. Optional fields the source did not
    /// produce get the variant default; fields outside the variant are dropped.
    pub fn align(&self, records: Vec<NormalizedRecord>) -> Vec<LedgerEntry> {
        records
            .into_iter()
            .map(|rec| {
                let record = CanonicalRecord {
                    day: rec.date,
                    amount: rec.amount,
                    source: rec.source,
                    transaction_type: self.fill(Field::TransactionType, rec.transaction_type),
                    response_code: self.fill(Field::ResponseCode, rec.response_code),
                    card_type: self.fill(Field::CardType, rec.card_type),
                };

                LedgerEntry {
                    origin: rec.origin,
                    line_number: rec.line_number,
                    record,
                }
            })
            .collect()
    }

    fn fill(&self, field: Field, value: Option<String>) -> Option<String> {
        if !self.variant.includes(field) {
            return None;
        }

        value.or_else(|| self.variant.default_for(field).map(str::to_string))
    }
}

// ============================================================================
// TESTS
// ============================================================================
