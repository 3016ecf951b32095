//! Text extraction from documents.
//!
//! Dispatches on the declared format:
//! - docx: structural paragraph extraction from the zip container
//! - pdf: pdftoppm rasterization at 300 DPI, then per-page OCR
//! - image: direct OCR
//!
//! Extraction failures never abort the pipeline; they degrade to empty
//! text so the document still reaches the filing engine.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;
use tempfile::TempDir;
use thiserror::Error;

use crate::models::{Document, DocumentFormat};

use super::engine::OcrRunner;
use super::preprocess;

/// Rasterization resolution for PDF pages.
const PDF_DPI: u32 = 300;

/// Errors internal to the extraction stage. Callers of
/// [`TextExtractor::extract`] never see these; they are logged and
/// converted into empty text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Converts a source document into raw text, running OCR for raster
/// formats.
pub struct TextExtractor {
    ocr: OcrRunner,
}

impl TextExtractor {
    pub fn new(ocr: OcrRunner) -> Self {
        Self { ocr }
    }

    /// Extract text from a document.
    ///
    /// Any I/O or decoding failure degrades to an empty result: an empty
    /// string is a valid outcome that still produces a filing decision.
    pub fn extract(&self, doc: &Document) -> String {
        let result = match doc.format {
            DocumentFormat::Docx => extract_docx(&doc.path),
            DocumentFormat::Pdf => self.extract_pdf(&doc.path),
            DocumentFormat::Image => self.extract_image(&doc.path),
        };

        match result {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    "Extraction failed for {} ({}): {}",
                    doc.original_name,
                    doc.format.as_str(),
                    e
                );
                String::new()
            }
        }
    }

    /// Rasterize every PDF page at 300 DPI and OCR them in page order.
    fn extract_pdf(&self, path: &Path) -> Result<String, ExtractionError> {
        // The temp dir is cleaned up on every exit path, including OCR
        // failures further down.
        let temp_dir = TempDir::new()?;
        let pages = rasterize_pdf(path, temp_dir.path())?;

        let mut page_texts = Vec::with_capacity(pages.len());
        for page_path in &pages {
            page_texts.push(self.ocr_page(page_path)?);
        }
        Ok(page_texts.join("\n"))
    }

    fn extract_image(&self, path: &Path) -> Result<String, ExtractionError> {
        self.ocr_page(path)
    }

    /// Decode one raster page, preprocess it, and run the OCR engines.
    fn ocr_page(&self, path: &Path) -> Result<String, ExtractionError> {
        let decoded = image::open(path)
            .map_err(|e| ExtractionError::ExtractionFailed(format!("image decode: {}", e)))?;
        let original = decoded.to_luma8();
        let preprocessed = preprocess::prepare_page(&decoded);
        Ok(self.ocr.recognize_page(&original, &preprocessed))
    }
}

/// Convert a PDF to per-page PNGs with pdftoppm, returning the page image
/// paths in page order.
fn rasterize_pdf(pdf_path: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let status = Command::new("pdftoppm")
        .args(["-png", "-r", &PDF_DPI.to_string()])
        .arg(pdf_path)
        .arg(output_dir.join("page"))
        .status();

    match status {
        Ok(s) if s.success() => {}
        Ok(_) => {
            return Err(ExtractionError::ExtractionFailed(
                "pdftoppm failed to convert PDF".to_string(),
            ))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ExtractionError::ToolNotFound(
                "pdftoppm (install poppler-utils)".to_string(),
            ))
        }
        Err(e) => return Err(ExtractionError::Io(e)),
    }

    // pdftoppm names pages page-01.png, page-002.png etc. depending on the
    // page count; lexicographic order matches page order at fixed width.
    let mut pages: Vec<PathBuf> = std::fs::read_dir(output_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "png").unwrap_or(false))
        .collect();
    pages.sort();

    if pages.is_empty() {
        return Err(ExtractionError::ExtractionFailed(
            "no images generated from PDF".to_string(),
        ));
    }
    Ok(pages)
}

/// Extract paragraph text from a docx file.
///
/// A docx is a zip container; the document body lives in
/// `word/document.xml`. Non-blank paragraphs are concatenated in document
/// order, separated by newlines.
pub fn extract_docx(path: &Path) -> Result<String, ExtractionError> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| ExtractionError::ExtractionFailed(format!("not a docx container: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractionError::ExtractionFailed(format!("missing document body: {}", e)))?
        .read_to_string(&mut xml)?;

    Ok(docx_paragraphs(&xml).join("\n"))
}

/// Pull the non-blank paragraphs out of a WordprocessingML body.
///
/// Only two constructs matter here: paragraph boundaries (`</w:p>`) and
/// text runs (`<w:t>`), so this targeted scan stands in for a full XML
/// parser.
fn docx_paragraphs(xml: &str) -> Vec<String> {
    static RUN_RE: OnceLock<Regex> = OnceLock::new();
    let run_re =
        RUN_RE.get_or_init(|| Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>").unwrap());

    let mut paragraphs = Vec::new();
    for para in xml.split("</w:p>") {
        let mut text = String::new();
        for cap in run_re.captures_iter(para) {
            text.push_str(&unescape_xml(&cap[1]));
        }
        if !text.trim().is_empty() {
            paragraphs.push(text);
        }
    }
    paragraphs
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
