//! Unit normalization for laboratory measurements.
//!
//! Converts recognized `(test, value, unit)` triples into each test's
//! canonical unit using the catalog's per-family conversion matrices, with
//! test-specific rounding precision. A conversion that has no known factor
//! fails explicitly: the value is retained in its original unit, never
//! silently coerced.

use serde::{Deserialize, Serialize};

use crate::catalog::{ConversionFamily, ReferenceCatalog, catalog};
use crate::types::LabValue;

/// Why a conversion could not be performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionGap {
    /// The test is not in the catalog
    UnknownTest(String),
    /// The test has no conversion family
    NoFamily(String),
    /// The family has no factor for this unit pair
    NoFactor { from: String, to: String },
}

impl std::fmt::Display for ConversionGap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversionGap::UnknownTest(test) => write!(f, "no standard unit defined for test '{}'", test),
            ConversionGap::NoFamily(test) => write!(f, "no conversion family for test '{}'", test),
            ConversionGap::NoFactor { from, to } => {
                write!(f, "no conversion factor from '{}' to '{}'", from, to)
            }
        }
    }
}

impl std::error::Error for ConversionGap {}

/// Outcome of a successful conversion (or identity pass-through).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversion {
    /// Value in the target unit, rounded to the test's precision
    pub value: f64,
    /// Target unit, canonical spelling
    pub unit: String,
    /// False when the input was already in the target unit
    pub converted: bool,
    /// Input value as given
    pub original_value: f64,
    /// Input unit as given
    pub original_unit: String,
    /// Factor applied (absent for identity pass-through)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factor: Option<f64>,
}

/// Per-item outcome of a batch conversion.
#[derive(Debug, Clone)]
pub struct BatchConversionItem {
    /// The lab value, updated in place when conversion succeeded
    pub lab_value: LabValue,
    /// Conversion failure, when the value was retained unconverted
    pub error: Option<String>,
}

/// Converts lab values into canonical units.
pub struct UnitNormalizer {
    catalog: &'static ReferenceCatalog,
}

impl UnitNormalizer {
    pub fn new() -> Self {
        Self { catalog: catalog() }
    }

    /// Convert a reading to the canonical unit for its test.
    ///
    /// Returns the conversion outcome, or a [`ConversionGap`] when the
    /// catalog has no applicable factor. Callers keep the original value on
    /// a gap; the pipeline never drops a reading over units.
    pub fn convert_to_canonical(&self, test_name: &str, value: f64, unit: &str) -> Result<Conversion, ConversionGap> {
        let definition = self
            .catalog
            .get(test_name)
            .ok_or_else(|| ConversionGap::UnknownTest(test_name.to_string()))?;

        let from = self.catalog.normalize_unit(unit);
        let to = self.catalog.normalize_unit(definition.canonical_unit);

        if from == to {
            return Ok(Conversion {
                value,
                unit: definition.canonical_unit.to_string(),
                converted: false,
                original_value: value,
                original_unit: unit.to_string(),
                factor: None,
            });
        }

        let family = definition
            .family
            .ok_or_else(|| ConversionGap::NoFamily(test_name.to_string()))?;

        let factor = self
            .catalog
            .factor(family, &from, &to)
            .ok_or_else(|| ConversionGap::NoFactor {
                from: from.clone(),
                to: to.clone(),
            })?;

        let converted = round_to_precision(value * factor, definition.precision);

        tracing::debug!(
            test = test_name,
            %from,
            %to,
            factor,
            "converted {} {} to {} {}",
            value,
            unit,
            converted,
            definition.canonical_unit
        );

        Ok(Conversion {
            value: converted,
            unit: definition.canonical_unit.to_string(),
            converted: true,
            original_value: value,
            original_unit: unit.to_string(),
            factor: Some(factor),
        })
    }

    /// Convert between any two units within a conversion family.
    pub fn convert_between(
        &self,
        family: ConversionFamily,
        value: f64,
        from_unit: &str,
        to_unit: &str,
    ) -> Result<Conversion, ConversionGap> {
        let from = self.catalog.normalize_unit(from_unit);
        let to = self.catalog.normalize_unit(to_unit);

        if from == to {
            return Ok(Conversion {
                value,
                unit: to_unit.to_string(),
                converted: false,
                original_value: value,
                original_unit: from_unit.to_string(),
                factor: None,
            });
        }

        let factor = self.catalog.factor(family, &from, &to).ok_or(ConversionGap::NoFactor {
            from: from.clone(),
            to: to.clone(),
        })?;

        Ok(Conversion {
            value: value * factor,
            unit: to_unit.to_string(),
            converted: true,
            original_value: value,
            original_unit: from_unit.to_string(),
            factor: Some(factor),
        })
    }

    /// Validate whether a unit is usable for a test.
    pub fn validate_unit(&self, test_name: &str, unit: &str) -> UnitValidation {
        let Some(definition) = self.catalog.get(test_name) else {
            return UnitValidation {
                valid: false,
                is_standard: false,
                convertible: false,
                standard_unit: None,
                suggestions: Vec::new(),
            };
        };

        let normalized = self.catalog.normalize_unit(unit);
        let standard = self.catalog.normalize_unit(definition.canonical_unit);

        if normalized == standard {
            return UnitValidation {
                valid: true,
                is_standard: true,
                convertible: true,
                standard_unit: Some(definition.canonical_unit.to_string()),
                suggestions: Vec::new(),
            };
        }

        let convertible = definition
            .family
            .and_then(|family| self.catalog.factor(family, &normalized, &standard))
            .is_some();

        let suggestions = if convertible {
            Vec::new()
        } else {
            definition
                .family
                .map(|family| self.catalog.family_units(family).iter().map(|u| u.to_string()).collect())
                .unwrap_or_default()
        };

        UnitValidation {
            valid: convertible,
            is_standard: false,
            convertible,
            standard_unit: Some(definition.canonical_unit.to_string()),
            suggestions,
        }
    }

    /// Canonical unit for a test, if the catalog knows it.
    pub fn standard_unit(&self, test_name: &str) -> Option<&'static str> {
        self.catalog.get(test_name).map(|t| t.canonical_unit)
    }

    /// Convert a whole result set to canonical units.
    ///
    /// Per-item failures are collected; they never abort the batch.
    pub fn batch_convert(&self, values: Vec<LabValue>) -> Vec<BatchConversionItem> {
        values
            .into_iter()
            .map(|mut lab_value| {
                match self.convert_to_canonical(&lab_value.test_name, lab_value.value, &lab_value.unit) {
                    Ok(conversion) => {
                        lab_value.value = conversion.value;
                        lab_value.unit = conversion.unit.clone();
                        lab_value.converted = conversion.converted;
                        BatchConversionItem {
                            lab_value,
                            error: None,
                        }
                    }
                    Err(gap) => BatchConversionItem {
                        lab_value,
                        error: Some(gap.to_string()),
                    },
                }
            })
            .collect()
    }
}

impl Default for UnitNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of validating a unit against a test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitValidation {
    pub valid: bool,
    pub is_standard: bool,
    pub convertible: bool,
    pub standard_unit: Option<String>,
    pub suggestions: Vec<String>,
}

fn round_to_precision(value: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision as i32);
    (value * scale).round() / scale
}
