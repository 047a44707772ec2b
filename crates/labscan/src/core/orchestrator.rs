//! Pipeline orchestration: the public extraction entry points.
//!
//! One document runs through a strictly sequential state machine:
//!
//! ```text
//! NotStarted → TablesAttempted → TextAttempted → (OpticalAttempted) → Normalized → Done
//! ```
//!
//! Table detection runs first; text extraction always runs (to fill gaps
//! even when tables succeeded); optical recognition runs only when the
//! result set is still empty or the provisional confidence is below the
//! escalation threshold. Raster images enter at the optical stage directly.
//! Stage-local failures are folded into the result's `errors` and the
//! pipeline continues with whatever partial output exists; only an
//! unreadable or unsupported input short-circuits to the failed-result
//! shape.

use once_cell::sync::Lazy;
use std::path::Path;

use crate::core::config::{ExtractionConfig, ExtractionMode};
use crate::core::formats::{self, MediaKind};
use crate::core::io;
use crate::merge::ResultMerger;
use crate::recognize::LabValueRecognizer;
use crate::types::{ExtractionMethod, ExtractionResult, Stage};
use crate::units::UnitNormalizer;

/// Global Tokio runtime for the synchronous wrappers.
///
/// Lazily initialized on first use and shared across all sync calls;
/// creating a runtime per call would dominate extraction time for small
/// documents.
pub(crate) static GLOBAL_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create global Tokio runtime - system may be out of resources")
});

/// Confidence attributed to a native text layer in text-only mode.
///
/// Native extraction carries no recognition uncertainty; 0.95 leaves room
/// for malformed text layers without claiming certainty.
const NATIVE_TEXT_CONFIDENCE: f64 = 0.95;

/// Boost applied to the overall confidence when three or more values
/// corroborate each other.
const CORROBORATION_BOOST: f64 = 1.1;
const CORROBORATION_MIN_VALUES: usize = 3;

/// Extract lab values from a document file.
///
/// `media_type` optionally overrides detection (`pdf`, `image/png`, ...).
/// All failures (unreadable file, unsupported format, total pipeline
/// failure) are reported through the returned [`ExtractionResult`], never
/// raised: the `errors` list and `requires_manual_review` flag communicate
/// degradation to the caller.
pub async fn extract_file(
    path: impl AsRef<Path>,
    media_type: Option<&str>,
    config: &ExtractionConfig,
) -> ExtractionResult {
    let path = path.as_ref();
    tracing::info!(path = %path.display(), "starting document extraction");

    if let Err(e) = io::validate_file_exists(path) {
        tracing::error!(path = %path.display(), error = %e, "document extraction failed");
        return ExtractionResult::failed(e.to_string());
    }

    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "document extraction failed");
            return ExtractionResult::failed(format!("failed to read {}: {}", path.display(), e));
        }
    };

    let kind = match formats::detect_media_kind(Some(path), media_type, Some(&bytes)) {
        Ok(kind) => kind,
        Err(e) => return ExtractionResult::failed(e.to_string()),
    };

    Pipeline::new(config).run(&bytes, kind)
}

/// Extract lab values from in-memory document bytes.
pub async fn extract_bytes(content: &[u8], media_type: &str, config: &ExtractionConfig) -> ExtractionResult {
    let kind = match formats::detect_media_kind(None, Some(media_type), Some(content)) {
        Ok(kind) => kind,
        Err(e) => return ExtractionResult::failed(e.to_string()),
    };

    Pipeline::new(config).run(content, kind)
}

/// Synchronous wrapper for [`extract_file`].
pub fn extract_file_sync(path: impl AsRef<Path>, media_type: Option<&str>, config: &ExtractionConfig) -> ExtractionResult {
    GLOBAL_RUNTIME.block_on(extract_file(path, media_type, config))
}

/// Synchronous wrapper for [`extract_bytes`].
pub fn extract_bytes_sync(content: &[u8], media_type: &str, config: &ExtractionConfig) -> ExtractionResult {
    GLOBAL_RUNTIME.block_on(extract_bytes(content, media_type, config))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    NotStarted,
    TablesAttempted,
    TextAttempted,
    OpticalAttempted,
    Normalized,
    Done,
}

struct Pipeline<'a> {
    config: &'a ExtractionConfig,
    recognizer: LabValueRecognizer,
    normalizer: UnitNormalizer,
    merger: ResultMerger,
    stages_attempted: Vec<Stage>,
    contributed: Vec<Stage>,
    errors: Vec<String>,
    state: PipelineState,
}

impl<'a> Pipeline<'a> {
    fn new(config: &'a ExtractionConfig) -> Self {
        Self {
            config,
            recognizer: LabValueRecognizer::with_thresholds(config.recognizer_thresholds()),
            normalizer: UnitNormalizer::new(),
            merger: ResultMerger::new(),
            stages_attempted: Vec::new(),
            contributed: Vec::new(),
            errors: Vec::new(),
            state: PipelineState::NotStarted,
        }
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::debug!(from = ?self.state, to = ?next, "pipeline transition");
        self.state = next;
    }

    fn run(self, bytes: &[u8], kind: MediaKind) -> ExtractionResult {
        if self.config.mode == ExtractionMode::TextOnly {
            return match kind {
                MediaKind::Pdf => self.run_text_only_pdf(bytes),
                MediaKind::Image => self.run_text_only_image(bytes),
            };
        }

        match kind {
            MediaKind::Pdf => self.run_pdf(bytes),
            MediaKind::Image => self.run_image(bytes),
        }
    }

    /// Aggregate confidence over the current best set, using the final
    /// aggregation formula, for the OCR escalation decision.
    fn provisional_confidence(&self) -> f64 {
        let confidences: Vec<f64> = self.merger.values().map(|v| v.confidence).collect();
        aggregate_confidence(&confidences)
    }

    fn method(&self) -> ExtractionMethod {
        match self.contributed.as_slice() {
            [] => ExtractionMethod::Unknown,
            [stage] => (*stage).into(),
            _ => ExtractionMethod::Mixed,
        }
    }

    /// Normalization pass plus final assembly.
    fn finalize(mut self) -> ExtractionResult {
        self.transition(PipelineState::Normalized);

        let merger = std::mem::take(&mut self.merger);
        let mut values = merger.into_values();

        for value in &mut values {
            match self
                .normalizer
                .convert_to_canonical(&value.test_name, value.value, &value.unit)
            {
                Ok(conversion) => {
                    value.value = conversion.value;
                    value.unit = conversion.unit;
                    value.converted = conversion.converted;
                    // Value and unit are canonical now; recheck the range
                    value.is_abnormal = self.recognizer.is_value_abnormal(&value.test_name, value.value);
                }
                Err(gap) => {
                    tracing::debug!(test = %value.test_name, %gap, "unit conversion gap, value retained unconverted");
                }
            }

            if value.reference_range.is_empty() {
                value.reference_range = self.recognizer.reference_range(&value.test_name);
            }
        }

        self.transition(PipelineState::Done);

        let confidences: Vec<f64> = values.iter().map(|v| v.confidence).collect();
        let overall_confidence = aggregate_confidence(&confidences);
        let requires_manual_review = overall_confidence < self.config.review_threshold || !self.errors.is_empty();

        tracing::info!(
            values = values.len(),
            confidence = overall_confidence,
            requires_manual_review,
            "extraction completed"
        );

        ExtractionResult {
            lab_values: values,
            method: self.method(),
            stages_attempted: self.stages_attempted,
            overall_confidence,
            requires_manual_review,
            errors: self.errors,
            content: None,
        }
    }

    fn finish_text_only(mut self, text: String, confidence: f64, method: ExtractionMethod) -> ExtractionResult {
        self.transition(PipelineState::Done);

        let empty = text.trim().is_empty();
        if empty && self.errors.is_empty() {
            self.errors.push("no text recovered from document".to_string());
        }

        let overall_confidence = round3(confidence);
        let requires_manual_review =
            empty || overall_confidence < self.config.review_threshold || !self.errors.is_empty();

        ExtractionResult {
            lab_values: Vec::new(),
            method: if empty { ExtractionMethod::Unknown } else { method },
            stages_attempted: self.stages_attempted,
            overall_confidence,
            requires_manual_review,
            errors: self.errors,
            content: Some(text),
        }
    }
}

// ---------------------------------------------------------------------------
// PDF pipeline
// ---------------------------------------------------------------------------

#[cfg(feature = "pdf")]
impl Pipeline<'_> {
    fn run_pdf(mut self, bytes: &[u8]) -> ExtractionResult {
        self.transition(PipelineState::TablesAttempted);
        self.stage_tables(bytes);

        // Text always runs, even when tables succeeded, to fill gaps
        self.transition(PipelineState::TextAttempted);
        self.stage_text(bytes);

        let provisional = self.provisional_confidence();
        if self.merger.is_empty() || provisional < self.config.ocr_escalation_threshold {
            tracing::info!(provisional, "escalating to optical recognition");
            self.transition(PipelineState::OpticalAttempted);
            self.stage_ocr_pdf(bytes);
        }

        self.finalize()
    }

    fn run_text_only_pdf(mut self, bytes: &[u8]) -> ExtractionResult {
        use crate::pdf::TextExtractor;

        self.transition(PipelineState::TextAttempted);
        self.stages_attempted.push(Stage::Text);

        match TextExtractor::new().and_then(|extractor| extractor.extract(bytes)) {
            Ok(extraction) if !extraction.is_empty() => {
                return self.finish_text_only(extraction.text, NATIVE_TEXT_CONFIDENCE, ExtractionMethod::Text);
            }
            Ok(_) => tracing::info!("no usable native text layer, escalating to optical recognition"),
            Err(e) => self.errors.push(format!("text extraction error: {}", e)),
        }

        self.transition(PipelineState::OpticalAttempted);
        self.stages_attempted.push(Stage::Ocr);
        let (transcript, confidence) = self.ocr_pdf_transcript(bytes);
        self.finish_text_only(transcript, confidence, ExtractionMethod::Ocr)
    }

    fn stage_tables(&mut self, bytes: &[u8]) {
        use crate::pdf::TableExtractor;

        self.stages_attempted.push(Stage::Tables);

        let tables = match TableExtractor::new().and_then(|extractor| extractor.extract_tables(bytes)) {
            Ok(tables) => tables,
            Err(e) => {
                tracing::warn!(error = %e, "table stage failed");
                self.errors.push(format!("table extraction error: {}", e));
                return;
            }
        };

        if tables.is_empty() {
            return;
        }

        let candidates = self.recognizer.extract_from_tables(&tables);
        tracing::info!(tables = tables.len(), values = candidates.len(), "table stage completed");

        if !candidates.is_empty() {
            self.contributed.push(Stage::Tables);
        }
        self.merger.merge(candidates);
    }

    fn stage_text(&mut self, bytes: &[u8]) {
        use crate::pdf::TextExtractor;

        self.stages_attempted.push(Stage::Text);

        match TextExtractor::new().and_then(|extractor| extractor.extract(bytes)) {
            Ok(extraction) => {
                if extraction.is_empty() {
                    tracing::info!("no usable native text layer");
                    return;
                }

                let candidates = self.recognizer.extract_from_text(&extraction.text, 1.0, Stage::Text);
                if !candidates.is_empty() {
                    self.contributed.push(Stage::Text);
                }
                self.merger.merge(candidates);
            }
            Err(e) => {
                tracing::warn!(error = %e, "text stage failed");
                self.errors.push(format!("text extraction error: {}", e));
            }
        }
    }

    fn stage_ocr_pdf(&mut self, bytes: &[u8]) {
        self.stages_attempted.push(Stage::Ocr);
        let (transcript, _confidence) = self.ocr_pdf_transcript(bytes);
        self.merge_ocr_transcript(&transcript);
    }

    /// Rasterize every page and recognize it, concatenating per-page
    /// transcripts with page markers. Returns the transcript and the mean
    /// page confidence.
    #[cfg(feature = "ocr")]
    fn ocr_pdf_transcript(&mut self, bytes: &[u8]) -> (String, f64) {
        use crate::ocr::OpticalRecognizer;
        use crate::pdf::{PageRenderOptions, PdfRenderer};

        let renderer = match PdfRenderer::new() {
            Ok(renderer) => renderer,
            Err(e) => {
                self.errors.push(format!("OCR error: {}", e));
                return (String::new(), 0.0);
            }
        };

        let page_count = match renderer.page_count(bytes) {
            Ok(count) => count,
            Err(e) => {
                self.errors.push(format!("OCR error: {}", e));
                return (String::new(), 0.0);
            }
        };

        let options = PageRenderOptions::default();
        let recognizer = OpticalRecognizer::new();
        let mut transcript = String::new();
        let mut confidences = Vec::new();

        for page_index in 0..page_count {
            let page_number = page_index + 1;

            let image = match renderer.render_page_to_image(bytes, page_index, &options) {
                Ok(image) => image,
                Err(e) => {
                    tracing::warn!(page = page_number, error = %e, "page render failed, skipping");
                    self.errors.push(format!("page render error on page {}: {}", page_number, e));
                    continue;
                }
            };

            match recognizer.recognize_image(&image, &self.config.ocr) {
                Ok(outcome) if !outcome.available => {
                    self.errors.push(format!(
                        "optical recognition unavailable: {}",
                        outcome.unavailable_reason.unwrap_or_default()
                    ));
                    break;
                }
                Ok(outcome) => {
                    if !outcome.is_empty() {
                        transcript.push_str(&format!("\n--- Page {} ---\n", page_number));
                        transcript.push_str(&outcome.text);
                        transcript.push('\n');
                        confidences.push(outcome.confidence);
                    }
                }
                Err(e) => {
                    tracing::warn!(page = page_number, error = %e, "page OCR failed, skipping");
                    self.errors.push(format!("OCR error on page {}: {}", page_number, e));
                }
            }
        }

        let confidence = if confidences.is_empty() {
            0.0
        } else {
            confidences.iter().sum::<f64>() / confidences.len() as f64
        };

        (transcript, confidence)
    }

    #[cfg(not(feature = "ocr"))]
    fn ocr_pdf_transcript(&mut self, _bytes: &[u8]) -> (String, f64) {
        self.errors
            .push("optical recognition support is not compiled into this build".to_string());
        (String::new(), 0.0)
    }
}

#[cfg(not(feature = "pdf"))]
impl Pipeline<'_> {
    fn run_pdf(self, _bytes: &[u8]) -> ExtractionResult {
        ExtractionResult::failed("PDF support is not compiled into this build")
    }

    fn run_text_only_pdf(self, _bytes: &[u8]) -> ExtractionResult {
        ExtractionResult::failed("PDF support is not compiled into this build")
    }
}

// ---------------------------------------------------------------------------
// Image pipeline
// ---------------------------------------------------------------------------

#[cfg(feature = "ocr")]
impl Pipeline<'_> {
    fn run_image(mut self, bytes: &[u8]) -> ExtractionResult {
        use crate::ocr::OpticalRecognizer;

        self.transition(PipelineState::OpticalAttempted);
        self.stages_attempted.push(Stage::Ocr);

        match OpticalRecognizer::new().recognize_image_bytes(bytes, &self.config.ocr) {
            Ok(outcome) if !outcome.available => {
                self.errors.push(format!(
                    "optical recognition unavailable: {}",
                    outcome.unavailable_reason.unwrap_or_default()
                ));
            }
            Ok(outcome) => self.merge_ocr_transcript(&outcome.text),
            Err(e) => self.errors.push(format!("OCR error: {}", e)),
        }

        self.finalize()
    }

    fn run_text_only_image(mut self, bytes: &[u8]) -> ExtractionResult {
        use crate::ocr::OpticalRecognizer;

        self.transition(PipelineState::OpticalAttempted);
        self.stages_attempted.push(Stage::Ocr);

        match OpticalRecognizer::new().recognize_image_bytes(bytes, &self.config.ocr) {
            Ok(outcome) if !outcome.available => {
                self.errors.push(format!(
                    "optical recognition unavailable: {}",
                    outcome.unavailable_reason.clone().unwrap_or_default()
                ));
                self.finish_text_only(String::new(), 0.0, ExtractionMethod::Ocr)
            }
            Ok(outcome) => {
                let confidence = outcome.confidence;
                self.finish_text_only(outcome.text, confidence, ExtractionMethod::Ocr)
            }
            Err(e) => {
                self.errors.push(format!("OCR error: {}", e));
                self.finish_text_only(String::new(), 0.0, ExtractionMethod::Ocr)
            }
        }
    }

    /// Recognize lab values out of an OCR transcript and merge them in.
    fn merge_ocr_transcript(&mut self, transcript: &str) {
        if transcript.trim().is_empty() {
            self.errors.push("OCR failed to extract readable text".to_string());
            return;
        }

        let candidates = self
            .recognizer
            .extract_from_text(transcript, self.config.ocr_confidence_modifier, Stage::Ocr);
        if !candidates.is_empty() {
            self.contributed.push(Stage::Ocr);
        }
        self.merger.merge(candidates);
    }
}

#[cfg(not(feature = "ocr"))]
impl Pipeline<'_> {
    fn run_image(self, _bytes: &[u8]) -> ExtractionResult {
        ExtractionResult::failed("optical recognition support is not compiled into this build")
    }

    fn run_text_only_image(self, _bytes: &[u8]) -> ExtractionResult {
        ExtractionResult::failed("optical recognition support is not compiled into this build")
    }

    /// No-op: `ocr_pdf_transcript` already recorded the missing-feature
    /// error and produced an empty transcript.
    #[cfg(feature = "pdf")]
    fn merge_ocr_transcript(&mut self, _transcript: &str) {}
}

/// Mean per-value confidence, boosted by ×1.1 (capped at 1.0) when three or
/// more values corroborate each other, rounded to 3 decimals.
fn aggregate_confidence(confidences: &[f64]) -> f64 {
    if confidences.is_empty() {
        return 0.0;
    }

    let mean = confidences.iter().sum::<f64>() / confidences.len() as f64;
    let boosted = if confidences.len() >= CORROBORATION_MIN_VALUES {
        (mean * CORROBORATION_BOOST).min(1.0)
    } else {
        mean
    };

    round3(boosted)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LabValue;

    fn candidate(test: &str, confidence: f64) -> LabValue {
        LabValue {
            test_name: test.to_string(),
            value: 1.0,
            unit: "mg/dL".to_string(),
            reference_range: String::new(),
            confidence,
            is_abnormal: None,
            source: None,
            converted: false,
        }
    }

    #[test]
    fn test_aggregate_confidence_empty() {
        assert_eq!(aggregate_confidence(&[]), 0.0);
    }

    #[test]
    fn test_aggregate_confidence_mean() {
        assert_eq!(aggregate_confidence(&[0.6, 0.8]), 0.7);
    }

    #[test]
    fn test_aggregate_confidence_boost_at_three_values() {
        // 0.6 mean boosted by 1.1
        assert_eq!(aggregate_confidence(&[0.6, 0.6, 0.6]), 0.66);
    }

    #[test]
    fn test_aggregate_confidence_boost_capped() {
        assert_eq!(aggregate_confidence(&[0.95, 0.95, 0.95]), 1.0);
    }

    #[test]
    fn test_aggregate_confidence_rounds_three_decimals() {
        let aggregated = aggregate_confidence(&[0.333333, 0.333333]);
        assert_eq!(aggregated, 0.333);
    }

    #[test]
    fn test_method_from_contributions() {
        let config = ExtractionConfig::default();

        let pipeline = Pipeline::new(&config);
        assert_eq!(pipeline.method(), ExtractionMethod::Unknown);

        let mut pipeline = Pipeline::new(&config);
        pipeline.contributed.push(Stage::Tables);
        assert_eq!(pipeline.method(), ExtractionMethod::Tables);

        let mut pipeline = Pipeline::new(&config);
        pipeline.contributed.push(Stage::Tables);
        pipeline.contributed.push(Stage::Ocr);
        assert_eq!(pipeline.method(), ExtractionMethod::Mixed);
    }

    #[test]
    fn test_provisional_confidence_uses_current_set() {
        let config = ExtractionConfig::default();
        let mut pipeline = Pipeline::new(&config);
        assert_eq!(pipeline.provisional_confidence(), 0.0);

        pipeline.merger.merge(vec![candidate("tsh", 0.4)]);
        assert_eq!(pipeline.provisional_confidence(), 0.4);
    }

    #[test]
    fn test_finalize_fills_reference_range_and_normalizes() {
        let config = ExtractionConfig::default();
        let mut pipeline = Pipeline::new(&config);

        // 5.5 mmol/L fasting glucose: canonical is 99 mg/dL, abnormal=false
        pipeline.merger.merge(vec![LabValue {
            test_name: "glucose_fasting".to_string(),
            value: 5.5,
            unit: "mmol/L".to_string(),
            reference_range: String::new(),
            confidence: 0.8,
            is_abnormal: None,
            source: None,
            converted: false,
        }]);
        pipeline.contributed.push(Stage::Text);

        let result = pipeline.finalize();

        assert_eq!(result.lab_values.len(), 1);
        let value = &result.lab_values[0];
        assert_eq!(value.unit, "mg/dL");
        assert_eq!(value.value, 99.0);
        assert!(value.converted);
        assert_eq!(value.is_abnormal, Some(false));
        assert_eq!(value.reference_range, "70-100 mg/dL");
        assert_eq!(result.method, ExtractionMethod::Text);
    }

    #[test]
    fn test_finalize_review_gate() {
        let config = ExtractionConfig::default();

        // High confidence, no errors: no review
        let mut pipeline = Pipeline::new(&config);
        pipeline.merger.merge(vec![candidate("tsh", 0.9)]);
        let result = pipeline.finalize();
        assert!(!result.requires_manual_review);

        // Low confidence forces review
        let mut pipeline = Pipeline::new(&config);
        pipeline.merger.merge(vec![candidate("tsh", 0.4)]);
        let result = pipeline.finalize();
        assert!(result.requires_manual_review);

        // Errors force review even at high confidence
        let mut pipeline = Pipeline::new(&config);
        pipeline.merger.merge(vec![candidate("tsh", 0.9)]);
        pipeline.errors.push("a page was skipped".to_string());
        let result = pipeline.finalize();
        assert!(result.requires_manual_review);
    }

    #[test]
    fn test_conversion_gap_retains_original_unit() {
        let config = ExtractionConfig::default();
        let mut pipeline = Pipeline::new(&config);

        let mut value = candidate("hba1c", 0.8);
        value.unit = "mmol/mol".to_string();
        value.value = 38.0;
        pipeline.merger.merge(vec![value]);

        let result = pipeline.finalize();
        let value = &result.lab_values[0];
        assert_eq!(value.unit, "mmol/mol");
        assert_eq!(value.value, 38.0);
        assert!(!value.converted);
        // Range text is still filled from the catalog
        assert_eq!(value.reference_range, "4-5.6 %");
    }

    #[tokio::test]
    async fn test_extract_file_missing_path_short_circuits() {
        let config = ExtractionConfig::default();
        let result = extract_file("/nonexistent/report.pdf", None, &config).await;

        assert_eq!(result.method, ExtractionMethod::Failed);
        assert!(result.lab_values.is_empty());
        assert_eq!(result.overall_confidence, 0.0);
        assert!(result.requires_manual_review);
        assert!(!result.errors.is_empty());
    }

    #[tokio::test]
    async fn test_extract_bytes_unsupported_media_type() {
        let config = ExtractionConfig::default();
        let result = extract_bytes(b"PK\x03\x04", "application/zip", &config).await;

        assert_eq!(result.method, ExtractionMethod::Failed);
        assert!(result.requires_manual_review);
        assert!(result.errors[0].contains("application/zip"));
    }
}
