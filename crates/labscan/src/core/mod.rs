//! Core orchestration: configuration, format probes, the pipeline state
//! machine, and bounded batch extraction.

pub mod batch;
pub mod config;
pub mod formats;
pub mod io;
pub mod orchestrator;

pub use batch::{
    ExtractionStatistics, batch_extract_bytes, batch_extract_bytes_sync, batch_extract_file, batch_extract_file_sync,
    extraction_statistics,
};
pub use config::{DEFAULT_MAX_CONCURRENT_EXTRACTIONS, ExtractionConfig, ExtractionMode, OcrConfig};
pub use formats::{MediaKind, SUPPORTED_EXTENSIONS, is_supported_format, is_supported_media_type};
pub use orchestrator::{extract_bytes, extract_bytes_sync, extract_file, extract_file_sync};
