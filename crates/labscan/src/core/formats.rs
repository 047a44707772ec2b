//! Supported-format detection and capability probes.
//!
//! Pure queries with no side effects: whether a file/media type is
//! supported, and which pipeline entry (paged document vs raster image) a
//! document takes. Detection trusts the caller's declared media type first,
//! then magic bytes, then the file extension.

use crate::{LabScanError, Result};
use std::path::Path;

/// File extensions the pipeline accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg", "tiff", "tif", "bmp", "webp"];

const IMAGE_HINTS: &[&str] = &["png", "jpeg", "jpg", "tiff", "tif", "bmp", "webp"];

/// Which pipeline entry a document takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Paged document: tables → text → conditional OCR
    Pdf,
    /// Raster image: straight to OCR
    Image,
}

/// Whether this file format is supported, judged by extension.
pub fn is_supported_format(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Whether this declared media type is supported.
pub fn is_supported_media_type(media_type: &str) -> bool {
    media_kind_for_hint(media_type).is_some()
}

/// Map a declared media type (or loose hint like `pdf`/`jpeg`) to a kind.
pub(crate) fn media_kind_for_hint(hint: &str) -> Option<MediaKind> {
    let hint = hint.trim().to_lowercase();
    if hint.is_empty() {
        return None;
    }
    if hint.contains("pdf") {
        return Some(MediaKind::Pdf);
    }
    if hint.starts_with("image/") || IMAGE_HINTS.iter().any(|img| hint.contains(img)) {
        return Some(MediaKind::Image);
    }
    None
}

/// Determine the pipeline entry for a document.
///
/// Precedence: the declared media type, then content magic bytes, then the
/// file extension. Fails with `UnsupportedFormat` when nothing matches.
pub(crate) fn detect_media_kind(
    path: Option<&Path>,
    declared: Option<&str>,
    bytes: Option<&[u8]>,
) -> Result<MediaKind> {
    if let Some(declared) = declared {
        if let Some(kind) = media_kind_for_hint(declared) {
            return Ok(kind);
        }
        return Err(LabScanError::UnsupportedFormat(declared.to_string()));
    }

    if let Some(bytes) = bytes
        && let Some(inferred) = infer::get(bytes)
        && let Some(kind) = media_kind_for_hint(inferred.mime_type())
    {
        return Ok(kind);
    }

    if let Some(path) = path
        && let Some(mime) = mime_guess::from_path(path).first_raw()
        && let Some(kind) = media_kind_for_hint(mime)
    {
        return Ok(kind);
    }

    Err(LabScanError::UnsupportedFormat(
        path.map(|p| p.display().to_string())
            .unwrap_or_else(|| "unknown media type".to_string()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported_format() {
        assert!(is_supported_format("report.pdf"));
        assert!(is_supported_format("scan.PNG"));
        assert!(is_supported_format("photo.jpeg"));
        assert!(!is_supported_format("sheet.xlsx"));
        assert!(!is_supported_format("noextension"));
    }

    #[test]
    fn test_is_supported_media_type() {
        assert!(is_supported_media_type("application/pdf"));
        assert!(is_supported_media_type("pdf"));
        assert!(is_supported_media_type("image/png"));
        assert!(is_supported_media_type("jpeg"));
        assert!(!is_supported_media_type("application/zip"));
        assert!(!is_supported_media_type(""));
    }

    #[test]
    fn test_declared_type_takes_precedence() {
        // Declared says image even though the extension says pdf
        let kind = detect_media_kind(Some(Path::new("scan.pdf")), Some("image/png"), None).unwrap();
        assert_eq!(kind, MediaKind::Image);
    }

    #[test]
    fn test_unsupported_declared_type_rejected() {
        let result = detect_media_kind(Some(Path::new("doc.pdf")), Some("application/zip"), None);
        assert!(matches!(result.unwrap_err(), LabScanError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_magic_bytes_detection() {
        let png_header: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        let kind = detect_media_kind(None, None, Some(png_header)).unwrap();
        assert_eq!(kind, MediaKind::Image);

        let pdf_header: &[u8] = b"%PDF-1.7\n";
        let kind = detect_media_kind(None, None, Some(pdf_header)).unwrap();
        assert_eq!(kind, MediaKind::Pdf);
    }

    #[test]
    fn test_extension_fallback() {
        let kind = detect_media_kind(Some(Path::new("report.pdf")), None, Some(b"garbage")).unwrap();
        assert_eq!(kind, MediaKind::Pdf);
    }

    #[test]
    fn test_nothing_matches() {
        let result = detect_media_kind(Some(Path::new("data.bin")), None, Some(b"garbage"));
        assert!(matches!(result.unwrap_err(), LabScanError::UnsupportedFormat(_)));
    }
}
