//! OCR and text extraction.
//!
//! Extracts text from documents using:
//! - structural paragraph reading for docx
//! - pdftoppm (Poppler) rasterization + OCR for PDFs
//! - Tesseract OCR for raster pages (default)
//! - OCRS for pure-Rust neural OCR (feature: ocr-ocrs)
//!
//! Raster pages go through [`preprocess`] (denoise, CLAHE, deskew, Otsu
//! binarization) before the primary engine sees them. When the neural
//! backend is enabled it reads the original page and its result wins only
//! when strictly longer.

mod engine;
mod extractor;
pub mod preprocess;
mod tesseract;

#[cfg(feature = "ocr-ocrs")]
mod ocrs_backend;

pub use engine::{check_binary, OcrEngine, OcrError, OcrRunner};
pub use extractor::{extract_docx, ExtractionError, TextExtractor};
pub use tesseract::{TesseractBackend, TesseractConfig};

#[cfg(feature = "ocr-ocrs")]
pub use ocrs_backend::OcrsBackend;

use std::time::Duration;

/// Build the OCR runner from settings: tesseract primary, ocrs secondary
/// when the feature and the setting are both on.
pub fn build_runner(language: &str, timeout: Duration, neural_fallback: bool) -> OcrRunner {
    let config = TesseractConfig {
        language: language.to_string(),
        timeout,
        ..TesseractConfig::default()
    };
    let primary = Box::new(TesseractBackend::with_config(config));

    #[cfg(feature = "ocr-ocrs")]
    let secondary: Option<Box<dyn OcrEngine + Send + Sync>> = if neural_fallback {
        Some(Box::new(OcrsBackend::new()))
    } else {
        None
    };
    #[cfg(not(feature = "ocr-ocrs"))]
    let secondary: Option<Box<dyn OcrEngine + Send + Sync>> = {
        if neural_fallback {
            tracing::debug!("neural OCR requested but the ocr-ocrs feature is not compiled in");
        }
        None
    };

    OcrRunner::new(primary, secondary)
}
