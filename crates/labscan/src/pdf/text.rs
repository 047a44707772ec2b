//! PDF text extraction.
//!
//! Recovers the native text layer page by page, concatenated with page
//! boundary markers and per-page character counts. A scanned PDF with no
//! embedded text yields an empty string, which tells the orchestrator to
//! escalate to optical recognition. Page-level failures are skipped; they
//! never abort extraction of the remaining pages.

use super::bindings::bind_pdfium;
use super::error::{PdfError, Result};
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};

/// Text content indicators suggesting a results table is present.
const TABLE_INDICATORS: &[&str] = &["test", "result", "value", "normal", "abnormal", "range", "units"];

/// Text content indicators suggesting an intake/form document.
const FORM_INDICATORS: &[&str] = &["name:", "date:", "id:", "patient", "dob:"];

/// Per-page extraction stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageText {
    /// Page number (1-indexed)
    pub page_number: usize,
    /// Characters recovered from this page
    pub char_count: usize,
}

/// Result of extracting the native text layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfTextExtraction {
    /// Full text with `--- Page N ---` boundary markers
    pub text: String,
    /// Pages that yielded text, in order
    pub pages: Vec<PageText>,
}

impl PdfTextExtraction {
    /// Whether the text layer was usable at all.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Entry stage recommendation from document profiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedStage {
    Tables,
    Text,
    Ocr,
    Hybrid,
}

/// Structural profile of a document, used to pick an extraction strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentProfile {
    pub page_count: usize,
    pub total_text_length: usize,
    /// Pages whose text mentions table vocabulary
    pub table_indicators: usize,
    /// Pages whose text mentions form vocabulary
    pub form_indicators: usize,
    pub has_tables: bool,
    pub has_forms: bool,
    pub text_heavy: bool,
    pub recommended: RecommendedStage,
    pub confidence: f64,
}

pub struct TextExtractor {
    pdfium: Pdfium,
}

impl TextExtractor {
    pub fn new() -> Result<Self> {
        let binding = bind_pdfium(PdfError::TextExtractionFailed, "text extraction")?;
        Ok(Self {
            pdfium: Pdfium::new(binding),
        })
    }

    /// Extract the native text layer of every page.
    pub fn extract(&self, pdf_bytes: &[u8]) -> Result<PdfTextExtraction> {
        let document = self.load(pdf_bytes)?;

        let mut text = String::new();
        let mut pages = Vec::new();

        for (page_idx, page) in document.pages().iter().enumerate() {
            let page_number = page_idx + 1;

            let page_text = match page.text() {
                Ok(t) => t.all(),
                Err(e) => {
                    tracing::warn!(page = page_number, error = %e, "page text extraction failed, skipping page");
                    continue;
                }
            };

            if page_text.trim().is_empty() {
                continue;
            }

            text.push_str(&format!("\n--- Page {} ---\n", page_number));
            text.push_str(&page_text);
            text.push('\n');

            pages.push(PageText {
                page_number,
                char_count: page_text.len(),
            });
        }

        tracing::debug!(
            pages = pages.len(),
            characters = text.len(),
            "extracted native text layer"
        );

        Ok(PdfTextExtraction { text, pages })
    }

    /// Number of pages in the document.
    pub fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize> {
        let document = self.load(pdf_bytes)?;
        Ok(document.pages().len() as usize)
    }

    /// Profile the document structure to pick an extraction strategy.
    pub fn analyze(&self, pdf_bytes: &[u8]) -> Result<DocumentProfile> {
        let document = self.load(pdf_bytes)?;

        let page_count = document.pages().len() as usize;
        let mut total_text_length = 0usize;
        let mut table_indicators = 0usize;
        let mut form_indicators = 0usize;

        for page in document.pages().iter() {
            let page_text = match page.text() {
                Ok(t) => t.all().to_lowercase(),
                Err(_) => continue,
            };

            total_text_length += page_text.len();

            if TABLE_INDICATORS.iter().any(|word| page_text.contains(word)) {
                table_indicators += 1;
            }
            if FORM_INDICATORS.iter().any(|word| page_text.contains(word)) {
                form_indicators += 1;
            }
        }

        let (recommended, confidence) = if table_indicators as f64 > page_count as f64 * 0.5 {
            (RecommendedStage::Tables, 0.8)
        } else if total_text_length > 500 {
            (RecommendedStage::Text, 0.7)
        } else if total_text_length == 0 {
            (RecommendedStage::Ocr, 0.6)
        } else {
            (RecommendedStage::Hybrid, 0.5)
        };

        Ok(DocumentProfile {
            page_count,
            total_text_length,
            table_indicators,
            form_indicators,
            has_tables: table_indicators > 0,
            has_forms: form_indicators > 0,
            text_heavy: total_text_length > 1000,
            recommended,
            confidence,
        })
    }

    fn load<'a>(&'a self, pdf_bytes: &'a [u8]) -> Result<PdfDocument<'a>> {
        self.pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(|e| PdfError::InvalidPdf(e.to_string()))
    }
}
