//! Optical recognition of rasterized pages and uploaded photographs.
//!
//! Produces both a plain transcript and position/confidence-annotated
//! tokens. Tokens are grouped into text blocks by block index; tokens below
//! the caller's confidence threshold are returned separately as
//! low-confidence regions with their bounding boxes rather than silently
//! discarded, so the orchestrator can flag them for manual review.
//!
//! When the Tesseract engine or its language data is unavailable, every
//! entry point returns an empty outcome with an explicit unavailable marker
//! instead of raising.

use std::env;
use std::path::Path;

use image::DynamicImage;
use kreuzberg_tesseract::{TessPageSegMode, TesseractAPI};
use serde::{Deserialize, Serialize};

use super::error::OcrError;
use super::preprocess::{PreprocessOptions, preprocess};
use super::tsv::{OcrToken, parse_tokens};
use crate::core::config::OcrConfig;

/// Candidate tessdata locations probed when TESSDATA_PREFIX is unset.
const TESSDATA_FALLBACK_PATHS: &[&str] = &[
    "/opt/homebrew/share/tessdata",
    "/opt/homebrew/opt/tesseract/share/tessdata",
    "/usr/local/opt/tesseract/share/tessdata",
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    r#"C:\Program Files\Tesseract-OCR\tessdata"#,
    r#"C:\ProgramData\Tesseract-OCR\tessdata"#,
];

/// Axis-aligned box in image coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    fn from_token(token: &OcrToken) -> Self {
        Self {
            left: token.left,
            top: token.top,
            width: token.width,
            height: token.height,
        }
    }

    fn expand(&mut self, token: &OcrToken) {
        let right = (self.left + self.width).max(token.left + token.width);
        let bottom = (self.top + self.height).max(token.top + token.height);
        self.left = self.left.min(token.left);
        self.top = self.top.min(token.top);
        self.width = right - self.left;
        self.height = bottom - self.top;
    }
}

/// Tokens grouped by Tesseract block index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBlock {
    pub block: u32,
    pub text: String,
    /// Mean of the block's token confidences, scaled to [0, 1]
    pub confidence: f64,
    pub bbox: BoundingBox,
    pub word_count: usize,
    pub high_confidence: bool,
}

/// A token below the confidence threshold, kept for manual review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowConfidenceRegion {
    pub text: String,
    /// Token confidence scaled to [0, 1]
    pub confidence: f64,
    pub bbox: BoundingBox,
}

/// Full outcome of one optical recognition pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrOutcome {
    /// Plain text transcript
    pub text: String,
    /// Global average confidence over nonzero-confidence tokens, in [0, 1]
    pub confidence: f64,
    pub blocks: Vec<TextBlock>,
    pub low_confidence_regions: Vec<LowConfidenceRegion>,
    pub word_count: usize,
    pub character_count: usize,
    /// False when the engine could not run at all
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable_reason: Option<String>,
}

impl OcrOutcome {
    /// Empty outcome with an explicit unavailable marker.
    pub fn unavailable<S: Into<String>>(reason: S) -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            blocks: Vec::new(),
            low_confidence_regions: Vec::new(),
            word_count: 0,
            character_count: 0,
            available: false,
            unavailable_reason: Some(reason.into()),
        }
    }

    /// Whether the pass recovered any text at all.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Per-file outcome of a batch recognition run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrBatchItem {
    pub file_path: String,
    pub success: bool,
    pub outcome: Option<OcrOutcome>,
    pub error: Option<String>,
}

/// Locate the tessdata directory: TESSDATA_PREFIX first, then well-known
/// install locations.
fn resolve_tessdata() -> Option<String> {
    if let Ok(path) = env::var("TESSDATA_PREFIX")
        && !path.trim().is_empty()
    {
        return Some(path);
    }

    TESSDATA_FALLBACK_PATHS
        .iter()
        .find(|p| Path::new(p).exists())
        .map(|p| (*p).to_string())
}

/// Whether the optical-recognition backend can run at all.
///
/// Pure query, no side effects: checks that a tessdata directory exists.
pub fn backend_available() -> bool {
    resolve_tessdata().is_some()
}

pub struct OpticalRecognizer;

impl OpticalRecognizer {
    pub fn new() -> Self {
        Self
    }

    /// Recognize text in encoded image bytes.
    pub fn recognize_image_bytes(&self, image_bytes: &[u8], config: &OcrConfig) -> Result<OcrOutcome, OcrError> {
        let img = image::load_from_memory(image_bytes)
            .map_err(|e| OcrError::ImageProcessingFailed(format!("Failed to decode image: {}", e)))?;
        self.recognize_image(&img, config)
    }

    /// Recognize text in a decoded image.
    ///
    /// Engine unavailability (no tessdata, missing language files, failed
    /// initialization) yields an `Ok` outcome with the unavailable marker;
    /// failures after a successful initialization are real errors.
    pub fn recognize_image(&self, image: &DynamicImage, config: &OcrConfig) -> Result<OcrOutcome, OcrError> {
        if config.language.trim().is_empty() {
            return Err(OcrError::InvalidConfiguration(
                "Language cannot be empty. Please specify a valid language code (e.g., 'eng')".to_string(),
            ));
        }

        let Some(tessdata_path) = resolve_tessdata() else {
            tracing::warn!("tessdata directory not found, optical recognition unavailable");
            return Ok(OcrOutcome::unavailable("tesseract language data not found"));
        };

        // Validate language files before initializing; tesseract can crash on
        // missing traineddata instead of returning an error
        for lang in config.language.split('+') {
            let lang = lang.trim();
            if lang.is_empty() {
                continue;
            }
            let traineddata = Path::new(&tessdata_path).join(format!("{}.traineddata", lang));
            if !traineddata.exists() {
                tracing::warn!(language = lang, "traineddata missing, optical recognition unavailable");
                return Ok(OcrOutcome::unavailable(format!(
                    "language '{}' not found in {}",
                    lang, tessdata_path
                )));
            }
        }

        let options = PreprocessOptions {
            advanced_cleanup: config.advanced_cleanup,
            ..Default::default()
        };
        let gray = preprocess(image, &options);
        let (width, height) = gray.dimensions();

        let api = TesseractAPI::new();

        if let Err(e) = api.init(&tessdata_path, &config.language) {
            tracing::warn!(error = %e, "tesseract initialization failed, optical recognition unavailable");
            return Ok(OcrOutcome::unavailable(format!(
                "failed to initialize language '{}': {}",
                config.language, e
            )));
        }

        let psm_mode = TessPageSegMode::from_int(config.psm as i32);
        api.set_page_seg_mode(psm_mode)
            .map_err(|e| OcrError::InvalidConfiguration(format!("Failed to set PSM mode: {}", e)))?;

        if !config.char_whitelist.is_empty() {
            api.set_variable("tessedit_char_whitelist", &config.char_whitelist)
                .map_err(|e| OcrError::InvalidConfiguration(format!("Failed to set tessedit_char_whitelist: {}", e)))?;
        }

        // Grayscale: one byte per pixel, rows are exactly `width` bytes
        api.set_image(gray.as_raw(), width as i32, height as i32, 1, width as i32)
            .map_err(|e| OcrError::ProcessingFailed(format!("Failed to set image: {}", e)))?;

        api.recognize()
            .map_err(|e| OcrError::ProcessingFailed(format!("Failed to recognize text: {}", e)))?;

        let text = api
            .get_utf8_text()
            .map_err(|e| OcrError::ProcessingFailed(format!("Failed to extract text: {}", e)))?;

        let tsv = api
            .get_tsv_text(0)
            .map_err(|e| OcrError::ProcessingFailed(format!("Failed to extract TSV: {}", e)))?;

        let tokens = parse_tokens(&tsv)?;
        let summary = summarize_tokens(&tokens, config.confidence_threshold);

        let text = text.trim().to_string();
        let word_count = text.split_whitespace().count();
        let character_count = text.chars().count();

        tracing::debug!(
            characters = character_count,
            confidence = summary.confidence,
            blocks = summary.blocks.len(),
            low_confidence = summary.low_confidence_regions.len(),
            "optical recognition completed"
        );

        Ok(OcrOutcome {
            text,
            confidence: summary.confidence,
            blocks: summary.blocks,
            low_confidence_regions: summary.low_confidence_regions,
            word_count,
            character_count,
            available: true,
            unavailable_reason: None,
        })
    }

    /// Recognize text in an image file.
    pub fn recognize_file(&self, file_path: &str, config: &OcrConfig) -> Result<OcrOutcome, OcrError> {
        let image_bytes = std::fs::read(file_path)
            .map_err(|e| OcrError::IOError(format!("Failed to read file '{}': {}", file_path, e)))?;
        self.recognize_image_bytes(&image_bytes, config)
    }

    /// Recognize multiple image files in parallel.
    ///
    /// Results come back in input order; per-file failures become failed
    /// items rather than aborting the batch.
    pub fn recognize_files_batch(&self, file_paths: Vec<String>, config: &OcrConfig) -> Vec<OcrBatchItem> {
        use rayon::prelude::*;

        file_paths
            .par_iter()
            .map(|path| match self.recognize_file(path, config) {
                Ok(outcome) => OcrBatchItem {
                    file_path: path.clone(),
                    success: true,
                    outcome: Some(outcome),
                    error: None,
                },
                Err(e) => OcrBatchItem {
                    file_path: path.clone(),
                    success: false,
                    outcome: None,
                    error: Some(e.to_string()),
                },
            })
            .collect()
    }
}

impl Default for OpticalRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

struct TokenSummary {
    confidence: f64,
    blocks: Vec<TextBlock>,
    low_confidence_regions: Vec<LowConfidenceRegion>,
}

/// Aggregate tokens into the global confidence, text blocks, and
/// low-confidence regions.
fn summarize_tokens(tokens: &[OcrToken], threshold: f64) -> TokenSummary {
    let positive: Vec<f64> = tokens.iter().map(|t| t.confidence).filter(|c| *c > 0.0).collect();
    let confidence = if positive.is_empty() {
        0.0
    } else {
        positive.iter().sum::<f64>() / positive.len() as f64 / 100.0
    };

    let low_confidence_regions = tokens
        .iter()
        .filter(|t| t.confidence / 100.0 < threshold)
        .map(|t| LowConfidenceRegion {
            text: t.text.clone(),
            confidence: t.confidence / 100.0,
            bbox: BoundingBox::from_token(t),
        })
        .collect();

    let mut blocks: Vec<TextBlock> = Vec::new();
    let mut members: Vec<f64> = Vec::new();

    for token in tokens {
        let same_block = blocks.last().is_some_and(|block| block.block == token.block);
        if same_block && let Some(block) = blocks.last_mut() {
            block.text.push(' ');
            block.text.push_str(&token.text);
            block.bbox.expand(token);
            block.word_count += 1;
            members.push(token.confidence);
        } else {
            if let Some(block) = blocks.last_mut() {
                finalize_block(block, &members, threshold);
            }
            members = vec![token.confidence];
            blocks.push(TextBlock {
                block: token.block,
                text: token.text.clone(),
                confidence: 0.0,
                bbox: BoundingBox::from_token(token),
                word_count: 1,
                high_confidence: false,
            });
        }
    }
    if let Some(block) = blocks.last_mut() {
        finalize_block(block, &members, threshold);
    }

    TokenSummary {
        confidence,
        blocks,
        low_confidence_regions,
    }
}

fn finalize_block(block: &mut TextBlock, member_confidences: &[f64], threshold: f64) {
    if member_confidences.is_empty() {
        return;
    }
    block.confidence = member_confidences.iter().sum::<f64>() / member_confidences.len() as f64 / 100.0;
    block.high_confidence = block.confidence >= threshold;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(text: &str, confidence: f64, block: u32, left: u32, top: u32) -> OcrToken {
        OcrToken {
            text: text.to_string(),
            left,
            top,
            width: 40,
            height: 12,
            confidence,
            block,
        }
    }

    #[test]
    fn test_summarize_global_confidence_ignores_nonpositive() {
        let tokens = vec![
            token("Glucose", 90.0, 0, 10, 10),
            token("145", 80.0, 0, 60, 10),
            token("~", -1.0, 0, 110, 10),
        ];

        let summary = summarize_tokens(&tokens, 0.5);
        assert!((summary.confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_empty_tokens() {
        let summary = summarize_tokens(&[], 0.5);
        assert_eq!(summary.confidence, 0.0);
        assert!(summary.blocks.is_empty());
        assert!(summary.low_confidence_regions.is_empty());
    }

    #[test]
    fn test_blocks_grouped_by_index() {
        let tokens = vec![
            token("Fasting", 90.0, 1, 10, 10),
            token("Glucose", 94.0, 1, 60, 10),
            token("Notes", 70.0, 2, 10, 100),
        ];

        let summary = summarize_tokens(&tokens, 0.5);
        assert_eq!(summary.blocks.len(), 2);

        let first = &summary.blocks[0];
        assert_eq!(first.text, "Fasting Glucose");
        assert_eq!(first.word_count, 2);
        assert!((first.confidence - 0.92).abs() < 1e-9);
        assert!(first.high_confidence);

        let second = &summary.blocks[1];
        assert_eq!(second.text, "Notes");
        assert!((second.confidence - 0.70).abs() < 1e-9);
    }

    #[test]
    fn test_block_bbox_expands() {
        let tokens = vec![token("a", 90.0, 0, 10, 10), token("b", 90.0, 0, 100, 30)];

        let summary = summarize_tokens(&tokens, 0.5);
        let bbox = summary.blocks[0].bbox;
        assert_eq!(bbox.left, 10);
        assert_eq!(bbox.top, 10);
        assert_eq!(bbox.width, 130); // 100 + 40 - 10
        assert_eq!(bbox.height, 32); // 30 + 12 - 10
    }

    #[test]
    fn test_low_confidence_regions_kept_not_discarded() {
        let tokens = vec![token("Glucose", 90.0, 0, 10, 10), token("smudge", 30.0, 0, 60, 10)];

        let summary = summarize_tokens(&tokens, 0.5);
        assert_eq!(summary.low_confidence_regions.len(), 1);

        let region = &summary.low_confidence_regions[0];
        assert_eq!(region.text, "smudge");
        assert!((region.confidence - 0.30).abs() < 1e-9);
        assert_eq!(region.bbox.left, 60);
    }

    #[test]
    fn test_unavailable_outcome_shape() {
        let outcome = OcrOutcome::unavailable("no tessdata");
        assert!(!outcome.available);
        assert!(outcome.is_empty());
        assert_eq!(outcome.confidence, 0.0);
        assert_eq!(outcome.unavailable_reason.as_deref(), Some("no tessdata"));
    }

    #[test]
    fn test_empty_language_rejected() {
        let recognizer = OpticalRecognizer::new();
        let config = OcrConfig {
            language: "  ".to_string(),
            ..Default::default()
        };
        let img = DynamicImage::new_rgb8(10, 10);
        let result = recognizer.recognize_image(&img, &config);
        assert!(matches!(result, Err(OcrError::InvalidConfiguration(_))));
    }
}
