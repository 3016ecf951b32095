//! OCR engine abstraction and engine arbitration.

use std::process::Command;
use std::time::Duration;

use image::GrayImage;
use thiserror::Error;

/// Errors from a single OCR engine invocation.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("OCR timed out after {0:?}")]
    Timeout(Duration),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single OCR engine.
pub trait OcrEngine {
    /// Engine name for logging.
    fn name(&self) -> &'static str;

    /// Whether the engine can run in this environment.
    fn is_available(&self) -> bool;

    /// Recognize text in a raster page.
    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError>;
}

/// Check if a binary is available in PATH.
pub fn check_binary(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Combines the primary engine with an optional secondary neural engine.
///
/// The primary engine reads the preprocessed page; the secondary engine,
/// when present, reads the original page and its text replaces the
/// primary's only when strictly longer. The longer-wins rule is carried
/// over from the system this replaces and kept for output compatibility.
pub struct OcrRunner {
    primary: Box<dyn OcrEngine + Send + Sync>,
    secondary: Option<Box<dyn OcrEngine + Send + Sync>>,
}

impl OcrRunner {
    pub fn new(
        primary: Box<dyn OcrEngine + Send + Sync>,
        secondary: Option<Box<dyn OcrEngine + Send + Sync>>,
    ) -> Self {
        Self { primary, secondary }
    }

    /// Recognize a page, arbitrating between engines.
    ///
    /// Engine failures are caught independently; if both engines fail the
    /// result is an empty string, never an error.
    pub fn recognize_page(&self, original: &GrayImage, preprocessed: &GrayImage) -> String {
        let primary_text = match self.primary.recognize(preprocessed) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("{} OCR failed: {}", self.primary.name(), e);
                String::new()
            }
        };

        if let Some(secondary) = &self.secondary {
            match secondary.recognize(original) {
                // Character counts, not byte lengths: accented French text
                // would otherwise out-weigh plain ASCII of the same length.
                Ok(text) if text.chars().count() > primary_text.chars().count() => {
                    tracing::debug!(
                        "{} result ({} chars) replaces {} ({} chars)",
                        secondary.name(),
                        text.chars().count(),
                        self.primary.name(),
                        primary_text.chars().count()
                    );
                    return text;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("{} OCR failed: {}", secondary.name(), e);
                }
            }
        }

        primary_text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEngine(Result<&'static str, &'static str>);

    impl OcrEngine for FixedEngine {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn is_available(&self) -> bool {
            true
        }
        fn recognize(&self, _image: &GrayImage) -> Result<String, OcrError> {
            match self.0 {
                Ok(s) => Ok(s.to_string()),
                Err(e) => Err(OcrError::OcrFailed(e.to_string())),
            }
        }
    }

    fn blank() -> GrayImage {
        GrayImage::new(4, 4)
    }

    #[test]
    fn test_longer_secondary_wins() {
        let runner = OcrRunner::new(
            Box::new(FixedEngine(Ok("short"))),
            Some(Box::new(FixedEngine(Ok("much longer text")))),
        );
        assert_eq!(runner.recognize_page(&blank(), &blank()), "much longer text");
    }

    #[test]
    fn test_equal_length_keeps_primary() {
        let runner = OcrRunner::new(
            Box::new(FixedEngine(Ok("abcde"))),
            Some(Box::new(FixedEngine(Ok("vwxyz")))),
        );
        assert_eq!(runner.recognize_page(&blank(), &blank()), "abcde");
    }

    #[test]
    fn test_arbitration_counts_characters_not_bytes() {
        // "téléphoné" is 9 chars but 13 bytes; a 10-char ASCII secondary
        // must still win.
        let runner = OcrRunner::new(
            Box::new(FixedEngine(Ok("téléphoné"))),
            Some(Box::new(FixedEngine(Ok("abcdefghij")))),
        );
        assert_eq!(runner.recognize_page(&blank(), &blank()), "abcdefghij");

        // And an accented primary with more bytes but fewer chars loses
        // nothing it should keep.
        let runner = OcrRunner::new(
            Box::new(FixedEngine(Ok("étés"))),
            Some(Box::new(FixedEngine(Ok("abc")))),
        );
        assert_eq!(runner.recognize_page(&blank(), &blank()), "étés");
    }

    #[test]
    fn test_failed_primary_uses_secondary() {
        let runner = OcrRunner::new(
            Box::new(FixedEngine(Err("boom"))),
            Some(Box::new(FixedEngine(Ok("rescued")))),
        );
        assert_eq!(runner.recognize_page(&blank(), &blank()), "rescued");
    }

    #[test]
    fn test_both_failed_yields_empty() {
        let runner = OcrRunner::new(
            Box::new(FixedEngine(Err("boom"))),
            Some(Box::new(FixedEngine(Err("boom")))),
        );
        assert_eq!(runner.recognize_page(&blank(), &blank()), "");
    }

    #[test]
    fn test_no_secondary_uses_primary() {
        let runner = OcrRunner::new(Box::new(FixedEngine(Ok("alone"))), None);
        assert_eq!(runner.recognize_page(&blank(), &blank()), "alone");
    }
}
