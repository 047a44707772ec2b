//! labscan - Lab-Report Intelligence Library
//!
//! labscan ingests unstructured medical documents (scanned or digitally
//! generated lab reports, as PDFs or raster images) and produces a
//! structured, unit-normalized, confidence-scored set of laboratory test
//! results.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use labscan::{ExtractionConfig, extract_file_sync};
//!
//! let config = ExtractionConfig::default();
//! let result = extract_file_sync("report.pdf", None, &config);
//! for value in &result.lab_values {
//!     println!("{}: {} {}", value.test_name, value.value, value.unit);
//! }
//! ```
//!
//! # Architecture
//!
//! Three extraction stages run in sequence with conditional escalation:
//! structured table detection (`pdf::table`), linear text extraction
//! (`pdf::text`), and optical character recognition (`ocr`). The
//! recognizer (`recognize`) pattern-matches catalog tests out of each
//! stage's output, the merger (`merge`) reconciles conflicting readings of
//! the same test, and the normalizer (`units`) converts heterogeneous
//! measurement units into each test's canonical representation. The
//! orchestrator (`core`) sequences the stages, aggregates confidence, and
//! decides whether manual review is required.
//!
//! All recognition data (test names, aliases, reference ranges,
//! conversion factors) lives in the immutable [`catalog`], constructed
//! once per process and shared by concurrent extractions without locking.

#![deny(unsafe_code)]

pub mod catalog;
pub mod core;
pub mod error;
pub mod merge;
pub mod recognize;
pub mod types;
pub mod units;

#[cfg(feature = "ocr")]
pub mod ocr;

#[cfg(feature = "pdf")]
pub mod pdf;

pub use error::{LabScanError, Result};
pub use types::*;

pub use core::batch::{
    ExtractionStatistics, batch_extract_bytes, batch_extract_bytes_sync, batch_extract_file, batch_extract_file_sync,
    extraction_statistics,
};
pub use core::config::{DEFAULT_MAX_CONCURRENT_EXTRACTIONS, ExtractionConfig, ExtractionMode, OcrConfig};
pub use core::formats::{MediaKind, SUPPORTED_EXTENSIONS, is_supported_format, is_supported_media_type};
pub use core::orchestrator::{extract_bytes, extract_bytes_sync, extract_file, extract_file_sync};

pub use catalog::{ConversionFamily, ReferenceCatalog, catalog};
pub use merge::ResultMerger;
pub use recognize::{ExtractionQuality, LabValueRecognizer, QualityReport, RecognizerThresholds};
pub use units::{Conversion, ConversionGap, UnitNormalizer, UnitValidation};

#[cfg(feature = "ocr")]
pub use ocr::recognizer::backend_available as ocr_backend_available;
