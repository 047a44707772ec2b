//! PDF processing subsystem.
//!
//! Three concerns, matching the first two pipeline stages plus the OCR
//! escalation path:
//!
//! - **Table recovery** ([`table`]): positioned words clustered into cell
//!   grids, lattice pass first with a stream fallback.
//! - **Text extraction** ([`text`]): the native text layer with page
//!   markers; empty output signals the orchestrator to escalate.
//! - **Rendering** ([`rendering`]): page rasterization for the optical
//!   recognizer.
//!
//! PDFium is bound lazily and exactly once ([`bindings`]); when the system
//! library is missing, every entry point degrades to a subsystem error that
//! the orchestrator folds into the result rather than a crash.

pub mod bindings;
pub mod error;
pub mod rendering;
pub mod table;
pub mod text;

pub use bindings::pdfium_available;
pub use error::PdfError;
pub use rendering::{PageRenderOptions, PdfRenderer};
pub use table::TableExtractor;
pub use text::{DocumentProfile, PdfTextExtraction, RecommendedStage, TextExtractor};
