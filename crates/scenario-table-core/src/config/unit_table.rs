//! Extra unit conversions loaded from YAML.
//!
//! ```yaml
//! conversions:
//!   - { from: "Mt C/yr", to: "Mt CO2/yr", factor: 3.6666666667 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::{
    config::{ConfigError, ConversionSnafu, INLINE, parse_yaml, read_yaml},
    units::UnitRegistry,
};

/// One `value_in_to = value_in_from * factor` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionSpec {
    /// Source unit.
    pub from: String,
    /// Target unit.
    pub to: String,
    /// Scale factor.
    pub factor: f64,
}

/// A list of conversions plus where it came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitTable {
    /// Conversion entries in document order.
    #[serde(default)]
    pub conversions: Vec<ConversionSpec>,
    #[serde(skip)]
    origin: String,
}

impl UnitTable {
    /// Parse a unit table document.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let mut table: UnitTable = parse_yaml(text, INLINE)?;
        table.origin = INLINE.to_string();
        Ok(table)
    }

    /// Load a unit table from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut table: UnitTable = read_yaml(path)?;
        table.origin = path.display().to_string();
        Ok(table)
    }

    /// Register every entry into `registry`, stopping at the first invalid one.
    pub fn apply(&self, registry: &mut UnitRegistry) -> Result<(), ConfigError> {
        for c in &self.conversions {
            registry
                .register(c.from.as_str(), c.to.as_str(), c.factor)
                .context(ConversionSnafu {
                    origin: self.origin.as_str(),
                })?;
        }
        Ok(())
    }

    /// The built-in registry extended with this table.
    pub fn to_registry(&self) -> Result<UnitRegistry, ConfigError> {
        let mut registry = UnitRegistry::builtin();
        self.apply(&mut registry)?;
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_conversions_on_top_of_builtins() -> Result<(), Box<dyn std::error::Error>> {
        let table = UnitTable::from_yaml_str(
            "conversions:\n  - { from: \"Mt C/yr\", to: \"Mt CO2/yr\", factor: 3.6666666667 }\n",
        )?;
        let registry = table.to_registry()?;
        assert!(registry.contains("Mt CO2/yr", "Gt CO2/yr"));
        assert!((registry.factor("Mt C/yr", "Mt CO2/yr")? - 3.6666666667).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn zero_factor_is_rejected_with_origin() -> Result<(), ConfigError> {
        let table = UnitTable::from_yaml_str("conversions:\n  - { from: a, to: b, factor: 0 }\n")?;
        let err = table.to_registry().expect_err("zero factor");
        assert!(matches!(err, ConfigError::Conversion { ref origin, .. } if origin == INLINE));
        Ok(())
    }

    #[test]
    fn empty_document_has_no_conversions() -> Result<(), ConfigError> {
        let table = UnitTable::from_yaml_str("{}")?;
        assert!(table.conversions.is_empty());
        Ok(())
    }
}
