// ⚙️ Deployment configuration
//
// Example ledger.toml:
//
//   variant = "enhanced"
//
//   [amount_format]
//   cantaloupe = "point"
//   kiosoft_coin = "comma"

use crate::coerce::DecimalSeparator;
use crate::error::{LedgerError, Result};
use crate::normalizer::SourceKind;
use crate::schema::SchemaVariant;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Environment variable that overrides the configured schema variant
pub const VARIANT_ENV: &str = "LEDGER_VARIANT";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub variant: SchemaVariant,
    pub amount_format: AmountFormatConfig,
}

/// Decimal convention for the sources whose amounts carry currency formatting
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AmountFormatConfig {
    pub cantaloupe: DecimalSeparator,
    pub kiosoft_coin: DecimalSeparator,
}

impl PipelineConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn with_variant(mut self, variant: SchemaVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Apply `LEDGER_VARIANT` if it is set
    pub fn apply_env(self) -> Result<Self> {
        match env::var(VARIANT_ENV) {
            Ok(value) => self.apply_variant_override(Some(&value)),
            Err(env::VarError::NotPresent) => Ok(self),
            Err(e) => Err(LedgerError::Config(format!("{}: {}", VARIANT_ENV, e))),
        }
    }

    pub fn apply_variant_override(self, value: Option<&str>) -> Result<Self> {
        match value {
            Some(text) => {
                let variant = text.parse::<SchemaVariant>().map_err(LedgerError::Config)?;
                Ok(self.with_variant(variant))
            }
            None => Ok(self),
        }
    }

    /// Decimal convention used when stripping currency amounts for a source
    pub fn decimal_for(&self, kind: SourceKind) -> DecimalSeparator {
        match kind {
            SourceKind::Cantaloupe => self.amount_format.cantaloupe,
            SourceKind::KiosoftCoin => self.amount_format.kiosoft_coin,
            // card amounts are bare numbers; the convention is never consulted
            SourceKind::KiosoftCard => DecimalSeparator::Point,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();

        assert_eq!(config.variant, SchemaVariant::Basic);
        assert_eq!(config.decimal_for(SourceKind::Cantaloupe), DecimalSeparator::Point);
        assert_eq!(config.decimal_for(SourceKind::KiosoftCoin), DecimalSeparator::Point);
    }

    #[test]
    fn test_from_toml() {
        let config = PipelineConfig::from_toml(
            r#"
variant = "enhanced"

[amount_format]
kiosoft_coin = "comma"
"#,
        )
        .unwrap();

        assert_eq!(config.variant, SchemaVariant::Enhanced);
        assert_eq!(config.decimal_for(SourceKind::Cantaloupe), DecimalSeparator::Point);
        assert_eq!(config.decimal_for(SourceKind::KiosoftCoin), DecimalSeparator::Comma);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(PipelineConfig::from_toml("").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(matches!(
            PipelineConfig::from_toml("varient = \"basic\""),
            Err(LedgerError::Toml(_))
        ));
        assert!(PipelineConfig::from_toml("variant = \"pivot\"").is_err());
    }

    #[test]
    fn test_variant_override() {
        let config = PipelineConfig::default()
            .apply_variant_override(Some("enhanced"))
            .unwrap();
        assert_eq!(config.variant, SchemaVariant::Enhanced);

        let unchanged = config.clone().apply_variant_override(None).unwrap();
        assert_eq!(unchanged, config);

        assert!(matches!(
            PipelineConfig::default().apply_variant_override(Some("fancy")),
            Err(LedgerError::Config(_))
        ));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "variant = \"enhanced\"").unwrap();

        let config = PipelineConfig::from_path(file.path()).unwrap();
        assert_eq!(config.variant, SchemaVariant::Enhanced);
    }

    #[test]
    fn test_from_missing_path() {
        let result = PipelineConfig::from_path(Path::new("/nonexistent/ledger.toml"));
        assert!(matches!(result, Err(LedgerError::Io(_))));
    }
}
