//! Optical recognition subsystem.
//!
//! The third extraction stage: rasterized pages and uploaded photographs go
//! through a preprocessing pipeline ([`preprocess`]), Tesseract recognition,
//! and TSV token parsing ([`tsv`]) into a transcript with per-token
//! positions and confidences ([`recognizer`]).
//!
//! Optical recognition produces lower base confidence than native
//! extraction; the orchestrator only escalates to it when the earlier
//! stages yield insufficient signal, and applies a confidence modifier to
//! values recognized out of OCR text.
//!
//! This module requires the `ocr` feature (on by default).

pub mod error;
pub mod preprocess;
pub mod recognizer;
pub mod tsv;

pub use error::OcrError;
pub use preprocess::{PreprocessOptions, preprocess};
pub use recognizer::{
    BoundingBox, LowConfidenceRegion, OcrBatchItem, OcrOutcome, OpticalRecognizer, TextBlock, backend_available,
};
pub use tsv::{OcrToken, parse_tokens};
