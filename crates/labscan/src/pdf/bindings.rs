use super::error::PdfError;
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use std::sync::Mutex;

/// Cached state for lazy PDFium initialization.
enum InitializationState {
    /// Not yet initialized
    Uninitialized,
    /// Initialization succeeded; bindings can be created quickly
    Initialized,
    /// Initialization failed with this error message
    Failed(String),
}

/// Lazily initialized PDFium state.
///
/// PDFium is only bound once, on first use; subsequent calls create fresh
/// bindings from the cached state. A failed initialization is cached too, so
/// non-PDF workloads and degraded environments do not retry the slow bind on
/// every document.
///
/// # Thread Safety
///
/// Initialization is protected by a `Mutex` so only one thread performs the
/// bind while others wait. Once initialized the state is effectively
/// immutable.
static PDFIUM_STATE: Lazy<Mutex<InitializationState>> = Lazy::new(|| Mutex::new(InitializationState::Uninitialized));

/// Get PDFium bindings with lazy initialization.
///
/// # Arguments
///
/// * `map_err` - Function mapping error strings to `PdfError` variants
/// * `context` - Context string for error reporting
pub(crate) fn bind_pdfium(
    map_err: fn(String) -> PdfError,
    context: &'static str,
) -> Result<Box<dyn PdfiumLibraryBindings>, PdfError> {
    let mut state = PDFIUM_STATE
        .lock()
        .map_err(|e| map_err(format!("Failed to acquire lock on PDFium state ({}): {}", context, e)))?;

    if let InitializationState::Failed(err) = &*state {
        return Err(map_err(format!(
            "PDFium initialization previously failed ({}): {}",
            context, err
        )));
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => {
            *state = InitializationState::Initialized;
            Ok(bindings)
        }
        Err(e) => {
            let message = e.to_string();
            if matches!(&*state, InitializationState::Uninitialized) {
                *state = InitializationState::Failed(message.clone());
            }
            Err(map_err(format!("Failed to initialize PDFium ({}): {}", context, message)))
        }
    }
}

/// Whether the PDFium system library can be bound.
///
/// Pure capability probe: triggers (cached) initialization but has no other
/// side effects.
pub fn pdfium_available() -> bool {
    bind_pdfium(PdfError::TextExtractionFailed, "availability probe").is_ok()
}
