//! Reference catalog of recognized laboratory tests.
//!
//! The catalog is pure data: canonical test names, their name-matching
//! patterns (aliases, abbreviations, typographic variants), clinical
//! reference ranges, canonical units, per-test rounding precision, and the
//! multiplicative conversion factors between unit families. It is constructed
//! once at process start behind a [`Lazy`] and passed by reference into every
//! pipeline component; nothing mutates it afterwards, so concurrent
//! extractions share it without locking.

use ahash::AHashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

mod data;

/// Unit conversion family.
///
/// Tests sharing a family share a conversion matrix (e.g. both glucose tests
/// convert mg/dL ↔ mmol/L with the same factors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionFamily {
    Glucose,
    Cholesterol,
    Triglycerides,
    Creatinine,
    Urea,
    Bilirubin,
    Protein,
    Hemoglobin,
    Thyroid,
    VitaminD,
    B12,
}

/// Clinically normal interval for a test, with optional critical bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub critical_low: Option<f64>,
    pub critical_high: Option<f64>,
}

impl ReferenceRange {
    /// Whether `value` falls outside the normal interval.
    ///
    /// Returns `None` when the range has no bounds at all.
    pub fn is_abnormal(&self, value: f64) -> Option<bool> {
        if self.min.is_none() && self.max.is_none() {
            return None;
        }
        if let Some(min) = self.min
            && value < min
        {
            return Some(true);
        }
        if let Some(max) = self.max
            && value > max
        {
            return Some(true);
        }
        Some(false)
    }

    /// Human-readable range string, e.g. `70-100 mg/dL`, `<200 mg/dL`.
    pub fn display_with_unit(&self, unit: &str) -> String {
        let text = match (self.min, self.max) {
            (Some(min), Some(max)) => format!("{}-{} {}", trim_float(min), trim_float(max), unit),
            (None, Some(max)) => format!("<{} {}", trim_float(max), unit),
            (Some(min), None) => format!(">{} {}", trim_float(min), unit),
            (None, None) => String::new(),
        };
        text.trim().to_string()
    }
}

fn trim_float(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// One name-matching pattern for a test.
///
/// The raw pattern string is kept because confidence scoring inspects it
/// (qualifier words, canonical-name tokens).
#[derive(Debug)]
pub struct TestPattern {
    pub raw: &'static str,
    pub regex: Regex,
}

/// Definition of one recognized laboratory test.
#[derive(Debug)]
pub struct TestDefinition {
    /// Canonical identifier, e.g. `glucose_fasting`
    pub name: &'static str,
    /// Pattern variants matched against free text
    pub patterns: Vec<TestPattern>,
    /// Clinical reference range (in the canonical unit)
    pub range: ReferenceRange,
    /// Canonical unit for downstream comparisons
    pub canonical_unit: &'static str,
    /// Decimal places kept after unit conversion
    pub precision: u32,
    /// Conversion family, when unit conversion is supported
    pub family: Option<ConversionFamily>,
}

/// Immutable tables driving recognition, normalization, and range checks.
pub struct ReferenceCatalog {
    tests: Vec<TestDefinition>,
    index: AHashMap<&'static str, usize>,
    direct_aliases: AHashMap<&'static str, &'static str>,
    abbreviations: Vec<(Regex, &'static str)>,
    unit_detectors: Vec<(&'static str, Vec<Regex>)>,
    unit_spellings: AHashMap<&'static str, &'static str>,
    factors: Vec<(ConversionFamily, &'static str, &'static str, f64)>,
}

impl ReferenceCatalog {
    fn load() -> Self {
        let tests: Vec<TestDefinition> = data::TEST_SPECS
            .iter()
            .map(|spec| TestDefinition {
                name: spec.name,
                patterns: spec
                    .patterns
                    .iter()
                    .copied()
                    .map(|raw| TestPattern {
                        raw,
                        regex: Regex::new(&format!("(?i){}", raw))
                            .unwrap_or_else(|e| panic!("invalid catalog pattern '{}': {}", raw, e)),
                    })
                    .collect(),
                range: ReferenceRange {
                    min: spec.min,
                    max: spec.max,
                    critical_low: spec.critical_low,
                    critical_high: spec.critical_high,
                },
                canonical_unit: spec.unit,
                precision: spec.precision,
                family: spec.family,
            })
            .collect();

        let index = tests.iter().enumerate().map(|(i, t)| (t.name, i)).collect();

        let abbreviations = data::ABBREVIATIONS
            .iter()
            .map(|(pattern, replacement)| {
                (
                    Regex::new(&format!("(?i){}", pattern))
                        .unwrap_or_else(|e| panic!("invalid abbreviation pattern '{}': {}", pattern, e)),
                    *replacement,
                )
            })
            .collect();

        let unit_detectors = data::UNIT_DETECTORS
            .iter()
            .map(|(unit, patterns)| {
                let regexes = patterns
                    .iter()
                    .map(|raw| {
                        Regex::new(&format!("(?i){}", raw))
                            .unwrap_or_else(|e| panic!("invalid unit pattern '{}': {}", raw, e))
                    })
                    .collect();
                (*unit, regexes)
            })
            .collect();

        let mut factors: Vec<(ConversionFamily, &'static str, &'static str, f64)> =
            data::FACTORS.iter().copied().collect();

        // Identity conversions for every unit a family mentions
        let units: Vec<(ConversionFamily, &'static str)> = data::FACTORS
            .iter()
            .flat_map(|(family, from, to, _)| [(*family, *from), (*family, *to)])
            .collect();
        for (family, unit) in units {
            if !factors.iter().any(|(f, a, b, _)| *f == family && *a == unit && *b == unit) {
                factors.push((family, unit, unit, 1.0));
            }
        }

        Self {
            tests,
            index,
            direct_aliases: data::DIRECT_ALIASES.iter().copied().collect(),
            abbreviations,
            unit_detectors,
            unit_spellings: data::UNIT_SPELLINGS.iter().copied().collect(),
            factors,
        }
    }

    /// All test definitions, in catalog order.
    pub fn tests(&self) -> &[TestDefinition] {
        &self.tests
    }

    /// Look up a test by canonical name.
    pub fn get(&self, name: &str) -> Option<&TestDefinition> {
        self.index.get(name).map(|&i| &self.tests[i])
    }

    /// Canonical names of all recognized tests.
    pub fn test_names(&self) -> Vec<&'static str> {
        self.tests.iter().map(|t| t.name).collect()
    }

    /// Direct alias lookup (input must already be lowercased and trimmed).
    pub fn direct_alias(&self, name: &str) -> Option<&'static str> {
        self.direct_aliases.get(name).copied()
    }

    /// Expand common medical abbreviations (`FBS` → `fasting glucose`, ...).
    pub fn expand_abbreviations(&self, text: &str) -> String {
        let mut expanded = text.to_string();
        for (regex, replacement) in &self.abbreviations {
            expanded = regex.replace_all(&expanded, *replacement).into_owned();
        }
        expanded
    }

    /// Detect a unit mentioned in a context window.
    ///
    /// Detectors run in catalog order so that more specific spellings win.
    pub fn detect_unit(&self, context: &str) -> Option<&'static str> {
        for (unit, regexes) in &self.unit_detectors {
            if regexes.iter().any(|r| r.is_match(context)) {
                return Some(unit);
            }
        }
        None
    }

    /// Whether any known unit token appears in `text`.
    pub fn mentions_unit(&self, text: &str) -> bool {
        self.detect_unit(text).is_some()
    }

    /// Normalize a unit spelling to its canonical form.
    ///
    /// Case-folds, strips spaces, and maps known variants (`mg/dl`, `mgdl`,
    /// `mg%` all become `mg/dL`). Unknown spellings are returned case-folded
    /// and space-stripped rather than rejected.
    pub fn normalize_unit(&self, unit: &str) -> String {
        if unit.is_empty() {
            return String::new();
        }
        let folded: String = unit.to_lowercase().replace(' ', "");
        match self.unit_spellings.get(folded.as_str()) {
            Some(canonical) => (*canonical).to_string(),
            None => folded,
        }
    }

    /// Multiplicative factor from `from` to `to` within a family.
    ///
    /// Units must be canonical spellings (see [`Self::normalize_unit`]).
    /// The table is small enough that a linear scan beats hashing.
    pub fn factor(&self, family: ConversionFamily, from: &str, to: &str) -> Option<f64> {
        self.factors
            .iter()
            .find(|(f, a, b, _)| *f == family && *a == from && *b == to)
            .map(|(_, _, _, factor)| *factor)
    }

    /// Units a family can convert from.
    pub fn family_units(&self, family: ConversionFamily) -> Vec<&'static str> {
        let mut units: Vec<&'static str> = self
            .factors
            .iter()
            .filter(|(f, _, _, _)| *f == family)
            .map(|(_, from, _, _)| *from)
            .collect();
        units.sort_unstable();
        units.dedup();
        units
    }

    /// Canonical unit for a test, empty string when unknown.
    pub fn default_unit(&self, test_name: &str) -> &'static str {
        self.get(test_name).map(|t| t.canonical_unit).unwrap_or("")
    }

    /// Human-readable reference range for a test, empty when unknown.
    pub fn reference_range_text(&self, test_name: &str) -> String {
        self.get(test_name)
            .map(|t| t.range.display_with_unit(t.canonical_unit))
            .unwrap_or_default()
    }
}

static CATALOG: Lazy<ReferenceCatalog> = Lazy::new(ReferenceCatalog::load);

/// The process-wide reference catalog.
///
/// Loaded once on first use; read-only for the lifetime of the process.
pub fn catalog() -> &'static ReferenceCatalog {
    &CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads_all_tests() {
        let cat = catalog();
        assert_eq!(cat.tests().len(), 20);
        assert!(cat.get("glucose_fasting").is_some());
        assert!(cat.get("albumin").is_some());
        assert!(cat.get("unknown_test").is_none());
    }

    #[test]
    fn test_every_test_has_canonical_unit_and_patterns() {
        for test in catalog().tests() {
            assert!(!test.canonical_unit.is_empty(), "{} has no unit", test.name);
            assert!(!test.patterns.is_empty(), "{} has no patterns", test.name);
        }
    }

    #[test]
    fn test_every_family_factor_has_inverse() {
        let cat = catalog();
        for (family, from, to, _) in cat.factors.iter().copied() {
            assert!(
                cat.factor(family, to, from).is_some(),
                "missing inverse for {:?} {} -> {}",
                family,
                from,
                to
            );
        }
    }

    #[test]
    fn test_reference_range_text() {
        let cat = catalog();
        assert_eq!(cat.reference_range_text("glucose_fasting"), "70-100 mg/dL");
        assert_eq!(cat.reference_range_text("hba1c"), "4-5.6 %");
        assert_eq!(cat.reference_range_text("nonexistent"), "");
    }

    #[test]
    fn test_range_abnormal() {
        let range = ReferenceRange {
            min: Some(70.0),
            max: Some(100.0),
            ..Default::default()
        };
        assert_eq!(range.is_abnormal(85.0), Some(false));
        assert_eq!(range.is_abnormal(145.0), Some(true));
        assert_eq!(range.is_abnormal(50.0), Some(true));

        let empty = ReferenceRange::default();
        assert_eq!(empty.is_abnormal(42.0), None);
    }

    #[test]
    fn test_normalize_unit_spellings() {
        let cat = catalog();
        assert_eq!(cat.normalize_unit("mg/dl"), "mg/dL");
        assert_eq!(cat.normalize_unit("MG / DL"), "mg/dL");
        assert_eq!(cat.normalize_unit("mgdl"), "mg/dL");
        assert_eq!(cat.normalize_unit("mg%"), "mg/dL");
        assert_eq!(cat.normalize_unit("mcg/dl"), "μg/dL");
        assert_eq!(cat.normalize_unit("percent"), "%");
        assert_eq!(cat.normalize_unit(""), "");
        // Unknown spellings fold but survive
        assert_eq!(cat.normalize_unit("Furlongs / Fortnight"), "furlongs/fortnight");
    }

    #[test]
    fn test_detect_unit_prefers_specific_spelling() {
        let cat = catalog();
        // "mg/dl" must not be swallowed by the "g/dl" detector
        assert_eq!(cat.detect_unit("glucose 95 mg/dL fasting"), Some("mg/dL"));
        assert_eq!(cat.detect_unit("hemoglobin 14 g/dL"), Some("g/dL"));
        assert_eq!(cat.detect_unit("wbc 7.5 K/uL"), Some("K/μL"));
        assert_eq!(cat.detect_unit("no units here"), None);
    }

    #[test]
    fn test_expand_abbreviations() {
        let cat = catalog();
        let text = cat.expand_abbreviations("FBS: 110, TC: 210, scr: 1.1");
        assert!(text.contains("fasting glucose: 110"));
        assert!(text.contains("total cholesterol: 210"));
        assert!(text.contains("serum creatinine: 1.1"));
    }

    #[test]
    fn test_direct_alias() {
        let cat = catalog();
        assert_eq!(cat.direct_alias("fbs"), Some("glucose_fasting"));
        assert_eq!(cat.direct_alias("hdl-c"), Some("cholesterol_hdl"));
        assert_eq!(cat.direct_alias("not a test"), None);
    }

    #[test]
    fn test_glucose_factor_roundtrip() {
        let cat = catalog();
        let forward = cat.factor(ConversionFamily::Glucose, "mg/dL", "mmol/L").unwrap();
        let back = cat.factor(ConversionFamily::Glucose, "mmol/L", "mg/dL").unwrap();
        let roundtrip = 100.0 * forward * back;
        assert!((roundtrip - 100.0).abs() < 0.1, "roundtrip drifted: {}", roundtrip);
    }

    #[test]
    fn test_family_units() {
        let cat = catalog();
        let units = cat.family_units(ConversionFamily::Hemoglobin);
        assert!(units.contains(&"g/dL"));
        assert!(units.contains(&"g/L"));
        assert!(units.contains(&"mmol/L"));
    }

    #[test]
    fn test_identity_factor_present() {
        let cat = catalog();
        assert_eq!(cat.factor(ConversionFamily::Glucose, "mg/dL", "mg/dL"), Some(1.0));
    }
}
