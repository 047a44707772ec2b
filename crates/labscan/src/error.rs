//! Error types for labscan.
//!
//! All fallible operations in the library return [`Result`], built on the
//! crate-level [`LabScanError`] enum.
//!
//! # Error Handling Philosophy
//!
//! **System errors MUST always bubble up unchanged:**
//! - `LabScanError::Io` (from `std::io::Error`) - file system errors, permission errors
//! - These indicate real system problems that users need to know about
//!
//! **Application errors are wrapped with context:**
//! - `Parsing` - document format errors, corrupt files
//! - `Validation` - invalid configuration or parameters
//! - `Ocr` - optical recognition failures
//! - `MissingDependency` - missing optional system dependencies
//!
//! Note that the extraction pipeline itself recovers from almost everything:
//! stage-local failures are folded into `ExtractionResult::errors` rather than
//! surfaced here. `LabScanError` is what the non-pipeline API (configuration
//! loading, probes, lower-level extractors) speaks.
use thiserror::Error;

/// Result type alias using `LabScanError`.
pub type Result<T> = std::result::Result<T, LabScanError>;

/// Main error type for all labscan operations.
///
/// # Variants
///
/// - `Io` - file system and I/O errors (always bubble up)
/// - `Parsing` - document parsing errors (corrupt files, unsupported features)
/// - `Ocr` - optical recognition errors
/// - `Validation` - input validation errors (invalid paths, config, parameters)
/// - `ImageProcessing` - image manipulation errors
/// - `Serialization` - JSON/TOML serialization errors
/// - `MissingDependency` - missing optional dependencies (tesseract data, pdfium)
/// - `UnsupportedFormat` - unsupported MIME type or file format
/// - `Other` - catch-all for uncommon errors
#[derive(Debug, Error)]
pub enum LabScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parsing error: {message}")]
    Parsing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("OCR error: {message}")]
    Ocr {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Image processing error: {message}")]
    ImageProcessing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for LabScanError {
    fn from(err: serde_json::Error) -> Self {
        LabScanError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(feature = "pdf")]
impl From<crate::pdf::error::PdfError> for LabScanError {
    fn from(err: crate::pdf::error::PdfError) -> Self {
        LabScanError::Parsing {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(feature = "ocr")]
impl From<crate::ocr::error::OcrError> for LabScanError {
    fn from(err: crate::ocr::error::OcrError) -> Self {
        LabScanError::Ocr {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl LabScanError {
    error_constructor!(parsing, Parsing);
    error_constructor!(ocr, Ocr);
    error_constructor!(validation, Validation);
    error_constructor!(image_processing, ImageProcessing);
    error_constructor!(serialization, Serialization);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LabScanError = io_err.into();
        assert!(matches!(err, LabScanError::Io(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_parsing_error() {
        let err = LabScanError::parsing("invalid format");
        assert_eq!(err.to_string(), "Parsing error: invalid format");
    }

    #[test]
    fn test_parsing_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad data");
        let err = LabScanError::parsing_with_source("invalid format", source);
        assert_eq!(err.to_string(), "Parsing error: invalid format");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_ocr_error() {
        let err = LabScanError::ocr("recognition failed");
        assert_eq!(err.to_string(), "OCR error: recognition failed");
    }

    #[test]
    fn test_validation_error() {
        let err = LabScanError::validation("invalid input");
        assert_eq!(err.to_string(), "Validation error: invalid input");
    }

    #[test]
    fn test_missing_dependency_error() {
        let err = LabScanError::MissingDependency("tesseract data not found".to_string());
        assert_eq!(err.to_string(), "Missing dependency: tesseract data not found");
    }

    #[test]
    fn test_unsupported_format_error() {
        let err = LabScanError::UnsupportedFormat("application/zip".to_string());
        assert_eq!(err.to_string(), "Unsupported format: application/zip");
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: LabScanError = json_err.into();
        assert!(matches!(err, LabScanError::Serialization { .. }));
    }

    #[test]
    fn test_io_error_bubbles_unchanged() {
        fn read_file() -> Result<String> {
            let content = std::fs::read_to_string("/nonexistent/file.txt")?;
            Ok(content)
        }

        let result = read_file();
        assert!(matches!(result.unwrap_err(), LabScanError::Io(_)));
    }

    #[test]
    fn test_error_debug() {
        let err = LabScanError::validation("test");
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Validation"));
    }
}
