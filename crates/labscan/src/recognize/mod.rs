//! Lab value recognition from free text and table rows.
//!
//! The recognizer pattern-matches catalog tests out of either a flat text
//! stream or detected table grids, producing confidence-scored
//! [`LabValue`] candidates. Text-path confidence follows a fixed additive
//! formula over pattern specificity and context evidence; table-path
//! confidence derives from the table-detection accuracy figure, since
//! tabular recognition is structurally more reliable than free-text
//! matching.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::catalog::{ReferenceCatalog, catalog};
use crate::merge::ResultMerger;
use crate::types::{LabValue, Stage, TableRecord};

pub mod columns;

/// Words in a context window that suggest reference-range language.
const RANGE_LANGUAGE: &[&str] = &["normal", "abnormal", "high", "low", "range"];

/// Cells that mark a header row rather than a reading.
const HEADER_CELLS: &[&str] = &["test", "parameter", "name"];

/// Bytes of context captured on each side of a text match for unit and
/// range-language detection.
const CONTEXT_WINDOW: usize = 50;

static NUMERIC_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("invalid numeric pattern"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("invalid whitespace pattern"));

/// Tunable thresholds for the recognizer.
///
/// The implausibility bounds and the table confidence cap are heuristic
/// constants inherited from the originating system; they are parameters
/// rather than invariants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RecognizerThresholds {
    /// A value below `range.min * implausible_low` is penalized
    pub implausible_low: f64,
    /// A value above `range.max * implausible_high` is penalized
    pub implausible_high: f64,
    /// Ceiling for table-derived confidence
    pub table_confidence_cap: f64,
}

impl Default for RecognizerThresholds {
    fn default() -> Self {
        Self {
            implausible_low: 0.1,
            implausible_high: 10.0,
            table_confidence_cap: 0.9,
        }
    }
}

/// Extracts lab value candidates from text and tables.
pub struct LabValueRecognizer {
    catalog: &'static ReferenceCatalog,
    thresholds: RecognizerThresholds,
}

impl LabValueRecognizer {
    pub fn new() -> Self {
        Self::with_thresholds(RecognizerThresholds::default())
    }

    pub fn with_thresholds(thresholds: RecognizerThresholds) -> Self {
        Self {
            catalog: catalog(),
            thresholds,
        }
    }

    /// Extract lab values from a flat text stream.
    ///
    /// For each catalog test, every pattern variant is searched
    /// case-insensitively over the normalized text. Each numeric match takes
    /// a ±50-character context window for unit detection and range-language
    /// evidence. `confidence_modifier` scales the final score (OCR-sourced
    /// text passes a value below 1.0); `stage` tags provenance.
    pub fn extract_from_text(&self, text: &str, confidence_modifier: f64, stage: Stage) -> Vec<LabValue> {
        let normalized = self.normalize_text(text);

        let mut merger = ResultMerger::new();

        for test in self.catalog.tests() {
            for pattern in &test.patterns {
                for captures in pattern.regex.captures_iter(&normalized) {
                    let Some(value_match) = captures.get(1) else {
                        continue;
                    };
                    let Ok(value) = value_match.as_str().parse::<f64>() else {
                        continue;
                    };

                    let full = captures.get(0).map(|m| (m.start(), m.end())).unwrap_or_default();
                    let context = context_window(&normalized, full.0, full.1);

                    let unit = self
                        .catalog
                        .detect_unit(context)
                        .unwrap_or(test.canonical_unit)
                        .to_string();

                    let confidence = self.score_text_match(test.name, pattern.raw, context, value) * confidence_modifier;

                    merger.merge(vec![LabValue {
                        test_name: test.name.to_string(),
                        value,
                        unit,
                        reference_range: test.range.display_with_unit(test.canonical_unit),
                        confidence,
                        is_abnormal: test.range.is_abnormal(value),
                        source: Some(format!("{}@{}", stage, full.0)),
                        converted: false,
                    }]);
                }
            }
        }

        let values = merger.into_values();
        tracing::debug!(stage = %stage, count = values.len(), "extracted lab values from text");
        values
    }

    /// Extract lab values from detected table grids.
    ///
    /// The first row is treated as the header row for column-role
    /// identification; tables whose name/value columns cannot be identified
    /// are skipped, and malformed rows are skipped individually.
    pub fn extract_from_tables(&self, tables: &[TableRecord]) -> Vec<LabValue> {
        let mut merger = ResultMerger::new();

        for (table_idx, table) in tables.iter().enumerate() {
            if table.cells.len() < 2 {
                continue;
            }

            let headers = &table.cells[0];
            let data = &table.cells[1..];

            let roles = columns::identify_columns(headers, data, self.catalog);
            let (Some(name_col), Some(value_col)) = (roles.name, roles.value) else {
                tracing::warn!(table = table_idx, "could not identify test/value columns, skipping table");
                continue;
            };

            let confidence = table.accuracy.min(self.thresholds.table_confidence_cap);

            for (row_idx, row) in data.iter().enumerate() {
                if row.len() <= name_col.max(value_col) {
                    continue;
                }

                let raw_name = row[name_col].trim();
                let raw_value = row[value_col].trim();

                if raw_name.is_empty() || raw_value.is_empty() || HEADER_CELLS.contains(&raw_name.to_lowercase().as_str())
                {
                    continue;
                }

                let Some(test_name) = normalize_test_name(self.catalog, raw_name) else {
                    continue;
                };
                let Some(value) = extract_numeric(raw_value) else {
                    continue;
                };

                let unit = roles
                    .unit
                    .and_then(|col| row.get(col))
                    .map(|cell| cell.trim().to_string())
                    .filter(|cell| !cell.is_empty())
                    .or_else(|| self.catalog.detect_unit(raw_value).map(str::to_string))
                    .unwrap_or_else(|| self.catalog.default_unit(test_name).to_string());

                merger.merge(vec![LabValue {
                    test_name: test_name.to_string(),
                    value,
                    unit,
                    reference_range: self.catalog.reference_range_text(test_name),
                    confidence,
                    is_abnormal: self.is_value_abnormal(test_name, value),
                    source: Some(format!("table_{}_row_{}", table_idx, row_idx)),
                    converted: false,
                }]);
            }
        }

        let values = merger.into_values();
        tracing::debug!(tables = tables.len(), count = values.len(), "extracted lab values from tables");
        values
    }

    /// Whether a (canonical-unit) reading falls outside the catalog range.
    pub fn is_value_abnormal(&self, test_name: &str, value: f64) -> Option<bool> {
        self.catalog.get(test_name).and_then(|t| t.range.is_abnormal(value))
    }

    /// Human-readable reference range for a test.
    pub fn reference_range(&self, test_name: &str) -> String {
        self.catalog.reference_range_text(test_name)
    }

    /// Canonical names of all recognizable tests.
    pub fn supported_tests(&self) -> Vec<&'static str> {
        self.catalog.test_names()
    }

    /// Quality metrics over an extracted result set.
    pub fn validate_results(&self, values: &[LabValue]) -> QualityReport {
        if values.is_empty() {
            return QualityReport {
                total: 0,
                high_confidence: 0,
                low_confidence: 0,
                abnormal: 0,
                warnings: vec!["No lab values extracted".to_string()],
                quality: ExtractionQuality::NeedsReview,
            };
        }

        let high_confidence = values.iter().filter(|v| v.confidence >= 0.8).count();
        let low_confidence = values.iter().filter(|v| v.confidence < 0.5).count();
        let abnormal = values.iter().filter(|v| v.is_abnormal == Some(true)).count();

        let mut warnings = Vec::new();
        if low_confidence > 0 {
            warnings.push(format!("{} values have low confidence (<0.5)", low_confidence));
        }

        for value in values {
            if let Some(test) = self.catalog.get(&value.test_name) {
                let min_realistic = test.range.min.unwrap_or(0.0) * self.thresholds.implausible_low;
                let max_realistic = test.range.max.unwrap_or(f64::MAX) * 5.0;
                if value.value < min_realistic || value.value > max_realistic {
                    warnings.push(format!(
                        "Potentially unrealistic value for {}: {}",
                        value.test_name, value.value
                    ));
                }
            }
        }

        let quality = if high_confidence as f64 / values.len() as f64 > 0.7 {
            ExtractionQuality::Good
        } else {
            ExtractionQuality::NeedsReview
        };

        QualityReport {
            total: values.len(),
            high_confidence,
            low_confidence,
            abnormal,
            warnings,
            quality,
        }
    }

    /// Collapse whitespace and expand common abbreviations.
    fn normalize_text(&self, text: &str) -> String {
        let collapsed = WHITESPACE_RUN.replace_all(text, " ");
        self.catalog.expand_abbreviations(&collapsed)
    }

    /// Additive confidence formula for a text match, clipped to [0.1, 1.0].
    fn score_text_match(&self, test_name: &str, raw_pattern: &str, context: &str, value: f64) -> f64 {
        let mut confidence: f64 = 0.5;

        let pattern_lower = raw_pattern.to_lowercase();
        if pattern_lower.contains("fasting") {
            confidence += 0.2;
        }
        if pattern_lower.contains(test_name) {
            confidence += 0.2;
        }

        let context_lower = context.to_lowercase();
        if self.catalog.mentions_unit(&context_lower) {
            confidence += 0.1;
        }
        if RANGE_LANGUAGE.iter().any(|word| context_lower.contains(word)) {
            confidence += 0.1;
        }

        // Implausible magnitudes are usually mis-parsed page numbers or dates
        if let Some(test) = self.catalog.get(test_name) {
            let too_low = test
                .range
                .min
                .is_some_and(|min| value < min * self.thresholds.implausible_low);
            let too_high = test
                .range
                .max
                .is_some_and(|max| value > max * self.thresholds.implausible_high);
            if too_low || too_high {
                confidence -= 0.3;
            }
        }

        confidence.clamp(0.1, 1.0)
    }
}

impl Default for LabValueRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Overall quality verdict for a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionQuality {
    Good,
    NeedsReview,
}

/// Quality metrics for an extracted result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub total: usize,
    pub high_confidence: usize,
    pub low_confidence: usize,
    pub abnormal: usize,
    pub warnings: Vec<String>,
    pub quality: ExtractionQuality,
}

/// Normalize a raw test-name cell to a canonical catalog name.
///
/// Direct aliases are checked first; otherwise the canonical names are tried
/// as substrings with underscores and spaces interchanged.
pub(crate) fn normalize_test_name(catalog: &ReferenceCatalog, raw: &str) -> Option<&'static str> {
    let name = raw.to_lowercase();
    let name = name.trim();

    if let Some(canonical) = catalog.direct_alias(name) {
        return Some(canonical);
    }

    let squashed = name.replace(' ', "");
    for test in catalog.tests() {
        let spaced = test.name.replace('_', " ");
        let joined = test.name.replace('_', "");
        if name.contains(&spaced) || squashed.contains(&joined) {
            return Some(test.name);
        }
    }

    None
}

/// First numeric token of a value cell, tolerating surrounding symbols.
fn extract_numeric(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    NUMERIC_VALUE
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Context slice around a match, clamped to char boundaries.
fn context_window(text: &str, start: usize, end: usize) -> &str {
    let mut window_start = start.saturating_sub(CONTEXT_WINDOW);
    while window_start > 0 && !text.is_char_boundary(window_start) {
        window_start -= 1;
    }
    let mut window_end = (end + CONTEXT_WINDOW).min(text.len());
    while window_end < text.len() && !text.is_char_boundary(window_end) {
        window_end += 1;
    }
    &text[window_start..window_end]
}
