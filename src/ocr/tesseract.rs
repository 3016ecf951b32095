//! Tesseract OCR backend.
//!
//! Drives the `tesseract` binary. The image is written to a temporary PNG
//! and tesseract writes its text to a temporary output base, which avoids
//! pipe-buffer stalls on dense pages.

use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};

use image::GrayImage;
use tempfile::TempDir;

use super::engine::{check_binary, OcrEngine, OcrError};

/// Tesseract invocation settings.
#[derive(Debug, Clone)]
pub struct TesseractConfig {
    /// Language(s), e.g. "fra" or "fra+eng". French is the default.
    pub language: String,
    /// Page segmentation mode; 6 = single uniform block of text.
    pub psm: u8,
    /// OCR engine mode; 3 = default, based on what is available.
    pub oem: u8,
    /// Per-invocation timeout. A timeout counts as an engine failure.
    pub timeout: Duration,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            language: "fra+eng".to_string(),
            psm: 6,
            oem: 3,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Traditional OCR via the tesseract binary.
pub struct TesseractBackend {
    config: TesseractConfig,
}

impl TesseractBackend {
    pub fn new() -> Self {
        Self {
            config: TesseractConfig::default(),
        }
    }

    pub fn with_config(config: TesseractConfig) -> Self {
        Self { config }
    }

    /// Run tesseract on an image file, waiting at most the configured
    /// timeout before killing the process.
    fn run_tesseract(&self, image_path: &Path, output_base: &Path) -> Result<String, OcrError> {
        let spawned = Command::new("tesseract")
            .arg(image_path)
            .arg(output_base)
            .args(["-l", &self.config.language])
            .args(["--oem", &self.config.oem.to_string()])
            .args(["--psm", &self.config.psm.to_string()])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OcrError::BackendNotAvailable(
                    "tesseract not found (install tesseract-ocr)".to_string(),
                ));
            }
            Err(e) => return Err(OcrError::Io(e)),
        };

        let deadline = Instant::now() + self.config.timeout;
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(OcrError::Timeout(self.config.timeout));
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
            }
        };

        if !status.success() {
            return Err(OcrError::OcrFailed(format!(
                "tesseract exited with {}",
                status
            )));
        }

        // Tesseract appends .txt to the output base.
        let text_path = output_base.with_extension("txt");
        Ok(std::fs::read_to_string(&text_path)?)
    }
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for TesseractBackend {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        check_binary("tesseract")
    }

    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError> {
        let temp_dir = TempDir::new()?;
        let image_path = temp_dir.path().join("page.png");
        image
            .save(&image_path)
            .map_err(|e| OcrError::ImageError(format!("failed to write page image: {}", e)))?;

        self.run_tesseract(&image_path, &temp_dir.path().join("out"))
    }
}
