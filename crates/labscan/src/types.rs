use serde::{Deserialize, Serialize};

/// One extraction stage of the pipeline.
///
/// Stages run in order with conditional escalation: structured table
/// detection, then linear text extraction, then optical recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Tables,
    Text,
    Ocr,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Tables => "tables",
            Stage::Text => "text",
            Stage::Ocr => "ocr",
        };
        write!(f, "{}", s)
    }
}

/// Which stage(s) ultimately contributed data to an extraction result.
///
/// `Mixed` marks results where more than one stage contributed values.
/// `Failed` marks results produced by the total-failure short circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Tables,
    Text,
    Ocr,
    Mixed,
    Failed,
    #[default]
    Unknown,
}

impl From<Stage> for ExtractionMethod {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Tables => ExtractionMethod::Tables,
            Stage::Text => ExtractionMethod::Text,
            Stage::Ocr => ExtractionMethod::Ocr,
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExtractionMethod::Tables => "tables",
            ExtractionMethod::Text => "text",
            ExtractionMethod::Ocr => "ocr",
            ExtractionMethod::Mixed => "mixed",
            ExtractionMethod::Failed => "failed",
            ExtractionMethod::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// One recognized laboratory test reading.
///
/// `test_name` is a canonical identifier drawn from the reference catalog
/// (e.g. `glucose_fasting`). `value` is the numeric reading in `unit`; after
/// the normalization pass both are in the test's canonical unit whenever a
/// conversion factor exists, with `converted` recording whether a conversion
/// was applied. `confidence` is a heuristic [0, 1] estimate of extraction
/// correctness, not a calibrated probability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabValue {
    /// Canonical test identifier from the reference catalog
    pub test_name: String,

    /// Numeric reading
    pub value: f64,

    /// Unit of the reading, normalized spelling (e.g. `mg/dL`)
    pub unit: String,

    /// Human-readable reference range for this test (e.g. `70-100 mg/dL`)
    pub reference_range: String,

    /// Per-value extraction confidence in [0, 1]
    pub confidence: f64,

    /// Whether the reading falls outside the reference range.
    ///
    /// `None` when the catalog has no range for this test.
    pub is_abnormal: Option<bool>,

    /// Provenance tag (stage/table/row that produced the value).
    ///
    /// Informational only, never authoritative.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Whether unit normalization converted the value
    #[serde(default)]
    pub converted: bool,
}

/// Aggregate extraction output for one document.
///
/// Created fresh per extraction call and immutable once returned. The
/// pipeline never persists results; retention is the caller's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Recognized lab values, ordered, unique by `test_name`
    pub lab_values: Vec<LabValue>,

    /// Stage(s) that contributed the surviving values
    pub method: ExtractionMethod,

    /// Stages that were actually run, in order
    pub stages_attempted: Vec<Stage>,

    /// Aggregate confidence over the surviving values
    pub overall_confidence: f64,

    /// Whether a human should review this extraction
    pub requires_manual_review: bool,

    /// Non-fatal errors collected along the way
    pub errors: Vec<String>,

    /// Raw document text (text-only extraction mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ExtractionResult {
    /// The failed-result shape used by the total-failure short circuit:
    /// empty values, zero confidence, manual review required, causing
    /// error recorded.
    pub fn failed<S: Into<String>>(error: S) -> Self {
        Self {
            lab_values: Vec::new(),
            method: ExtractionMethod::Failed,
            stages_attempted: Vec::new(),
            overall_confidence: 0.0,
            requires_manual_review: true,
            errors: vec![error.into()],
            content: None,
        }
    }
}

/// Table detection flavor.
///
/// Lattice detection targets bordered tables with exact column alignment;
/// stream detection is the looser fallback for borderless tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableFlavor {
    Lattice,
    Stream,
}

/// One grid-structured table recovered from a document page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRecord {
    /// Table cells as a 2D vector (rows × columns)
    pub cells: Vec<Vec<String>>,

    /// Page number where the table was found (1-indexed)
    pub page_number: usize,

    /// Detection accuracy figure in [0, 1], derived from grid coherence
    pub accuracy: f64,

    /// Which detection pass produced the table
    pub flavor: TableFlavor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_result_shape() {
        let result = ExtractionResult::failed("file not found");

        assert!(result.lab_values.is_empty());
        assert_eq!(result.method, ExtractionMethod::Failed);
        assert_eq!(result.overall_confidence, 0.0);
        assert!(result.requires_manual_review);
        assert_eq!(result.errors, vec!["file not found".to_string()]);
    }

    #[test]
    fn test_stage_serialization() {
        assert_eq!(serde_json::to_string(&Stage::Tables).unwrap(), "\"tables\"");
        assert_eq!(serde_json::to_string(&Stage::Ocr).unwrap(), "\"ocr\"");
    }

    #[test]
    fn test_method_serialization() {
        assert_eq!(serde_json::to_string(&ExtractionMethod::Mixed).unwrap(), "\"mixed\"");
        assert_eq!(serde_json::to_string(&ExtractionMethod::Failed).unwrap(), "\"failed\"");
    }

    #[test]
    fn test_method_from_stage() {
        assert_eq!(ExtractionMethod::from(Stage::Text), ExtractionMethod::Text);
        assert_eq!(ExtractionMethod::from(Stage::Tables), ExtractionMethod::Tables);
    }

    #[test]
    fn test_lab_value_serialization_skips_source() {
        let value = LabValue {
            test_name: "hba1c".to_string(),
            value: 5.4,
            unit: "%".to_string(),
            reference_range: "4-5.6 %".to_string(),
            confidence: 0.9,
            is_abnormal: Some(false),
            source: None,
            converted: false,
        };

        let json = serde_json::to_value(&value).unwrap();
        assert!(json.get("source").is_none());
        assert_eq!(json.get("test_name").unwrap(), "hba1c");
        assert_eq!(json.get("is_abnormal").unwrap(), false);
    }

    #[test]
    fn test_extraction_result_roundtrip() {
        let result = ExtractionResult {
            lab_values: vec![],
            method: ExtractionMethod::Text,
            stages_attempted: vec![Stage::Tables, Stage::Text],
            overall_confidence: 0.75,
            requires_manual_review: false,
            errors: vec![],
            content: None,
        };

        let json = serde_json::to_string(&result).unwrap();
        let back: ExtractionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.method, ExtractionMethod::Text);
        assert_eq!(back.stages_attempted, vec![Stage::Tables, Stage::Text]);
        assert!(!json.contains("content"));
    }
}
