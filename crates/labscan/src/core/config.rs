//! Extraction configuration.
//!
//! All pipeline thresholds that are heuristic rather than invariant live
//! here: the manual-review gate, the OCR escalation gate, the OCR
//! confidence modifier, the implausibility bounds, and the table confidence
//! cap. Configuration can be loaded from TOML or built programmatically.

use crate::recognize::RecognizerThresholds;
use crate::{LabScanError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default concurrency limit for batch extraction.
///
/// Deliberately small: table detection and optical recognition are CPU- and
/// memory-heavy, and unbounded concurrency risks resource exhaustion.
pub const DEFAULT_MAX_CONCURRENT_EXTRACTIONS: usize = 3;

/// Extraction mode hint from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Full pipeline: tables, text, conditional OCR, lab value recognition
    #[default]
    Auto,
    /// Same pipeline as `Auto`; the caller only wants the lab values
    LabValues,
    /// Stop after text recovery (escalating to OCR when there is no text
    /// layer) and return the raw content without recognition
    TextOnly,
}

/// Optical recognition configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Tesseract language code(s), `+`-separated (e.g. "eng", "eng+deu")
    #[serde(default = "default_language")]
    pub language: String,

    /// Page Segmentation Mode; 6 assumes a single uniform block of text,
    /// which suits lab report pages
    #[serde(default = "default_psm")]
    pub psm: u8,

    /// Tokens below this confidence (0-1) are reported as low-confidence
    /// regions
    #[serde(default = "default_ocr_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Enable blur/binarization/morphology cleanup before recognition
    #[serde(default = "default_true")]
    pub advanced_cleanup: bool,

    /// Whitelist of allowed characters (empty = all allowed)
    #[serde(default)]
    pub char_whitelist: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            psm: default_psm(),
            confidence_threshold: default_ocr_confidence_threshold(),
            advanced_cleanup: true,
            char_whitelist: String::new(),
        }
    }
}

/// Main extraction configuration.
///
/// # Example
///
/// ```rust
/// use labscan::ExtractionConfig;
///
/// // Create with defaults
/// let config = ExtractionConfig::default();
///
/// // Load from TOML
/// let config = ExtractionConfig::from_toml_str("review_threshold = 0.8").unwrap();
/// assert_eq!(config.review_threshold, 0.8);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Extraction mode hint
    #[serde(default)]
    pub mode: ExtractionMode,

    /// Optical recognition settings
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Results below this overall confidence require manual review
    #[serde(default = "default_review_threshold")]
    pub review_threshold: f64,

    /// OCR runs when the provisional confidence after the text stage is
    /// below this value (or when no values were recovered at all)
    #[serde(default = "default_ocr_escalation_threshold")]
    pub ocr_escalation_threshold: f64,

    /// Confidence multiplier for values recognized out of OCR text
    #[serde(default = "default_ocr_confidence_modifier")]
    pub ocr_confidence_modifier: f64,

    /// A value below `range.min * implausible_low` is penalized as a
    /// probable mis-parse
    #[serde(default = "default_implausible_low")]
    pub implausible_low: f64,

    /// A value above `range.max * implausible_high` is penalized as a
    /// probable mis-parse
    #[serde(default = "default_implausible_high")]
    pub implausible_high: f64,

    /// Ceiling for table-derived per-value confidence
    #[serde(default = "default_table_confidence_cap")]
    pub table_confidence_cap: f64,

    /// Maximum concurrent batch extractions (None = 3)
    #[serde(default)]
    pub max_concurrent_extractions: Option<usize>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            mode: ExtractionMode::default(),
            ocr: OcrConfig::default(),
            review_threshold: default_review_threshold(),
            ocr_escalation_threshold: default_ocr_escalation_threshold(),
            ocr_confidence_modifier: default_ocr_confidence_modifier(),
            implausible_low: default_implausible_low(),
            implausible_high: default_implausible_high(),
            table_confidence_cap: default_table_confidence_cap(),
            max_concurrent_extractions: None,
        }
    }
}

impl ExtractionConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| LabScanError::validation_with_source("invalid configuration", e))
    }

    pub(crate) fn recognizer_thresholds(&self) -> RecognizerThresholds {
        RecognizerThresholds {
            implausible_low: self.implausible_low,
            implausible_high: self.implausible_high,
            table_confidence_cap: self.table_confidence_cap,
        }
    }
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_psm() -> u8 {
    6
}

fn default_ocr_confidence_threshold() -> f64 {
    0.5
}

fn default_true() -> bool {
    true
}

fn default_review_threshold() -> f64 {
    0.7
}

fn default_ocr_escalation_threshold() -> f64 {
    0.5
}

fn default_ocr_confidence_modifier() -> f64 {
    0.8
}

fn default_implausible_low() -> f64 {
    0.1
}

fn default_implausible_high() -> f64 {
    10.0
}

fn default_table_confidence_cap() -> f64 {
    0.9
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExtractionConfig::default();
        assert_eq!(config.mode, ExtractionMode::Auto);
        assert_eq!(config.review_threshold, 0.7);
        assert_eq!(config.ocr_escalation_threshold, 0.5);
        assert_eq!(config.ocr_confidence_modifier, 0.8);
        assert_eq!(config.implausible_low, 0.1);
        assert_eq!(config.implausible_high, 10.0);
        assert_eq!(config.table_confidence_cap, 0.9);
        assert_eq!(config.max_concurrent_extractions, None);
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(config.ocr.psm, 6);
        assert!(config.ocr.advanced_cleanup);
    }

    #[test]
    fn test_from_toml_str_partial() {
        let config = ExtractionConfig::from_toml_str(
            r#"
            mode = "text_only"
            review_threshold = 0.8

            [ocr]
            language = "eng+deu"
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, ExtractionMode::TextOnly);
        assert_eq!(config.review_threshold, 0.8);
        assert_eq!(config.ocr.language, "eng+deu");
        // Untouched fields keep their defaults
        assert_eq!(config.ocr_escalation_threshold, 0.5);
        assert_eq!(config.ocr.psm, 6);
    }

    #[test]
    fn test_from_toml_str_empty() {
        let config = ExtractionConfig::from_toml_str("").unwrap();
        assert_eq!(config.review_threshold, 0.7);
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let result = ExtractionConfig::from_toml_str("review_threshold = \"not a number\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_mode_serialization() {
        assert_eq!(serde_json::to_string(&ExtractionMode::LabValues).unwrap(), "\"lab_values\"");
        assert_eq!(serde_json::to_string(&ExtractionMode::TextOnly).unwrap(), "\"text_only\"");
    }

    #[test]
    fn test_config_roundtrip() {
        let config = ExtractionConfig {
            max_concurrent_extractions: Some(2),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: ExtractionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.max_concurrent_extractions, Some(2));
    }
}
