//! OCRS neural OCR backend (feature `ocr-ocrs`).
//!
//! Pure-Rust OCR via the ocrs crate; no external binaries. Models are
//! automatically downloaded on first use from:
//! https://ocrs-models.s3-accelerate.amazonaws.com/
//!
//! Runs on the original page image rather than the preprocessed one: the
//! neural detector handles noise and skew itself and preprocessing
//! artifacts degrade its accuracy.

use std::path::PathBuf;
use std::sync::OnceLock;

use image::GrayImage;

use super::engine::{OcrEngine, OcrError};

/// Global cached OcrEngine instance (initialized once, reused for all OCR
/// calls). ocrs' engine is Send+Sync and its methods take &self.
static OCR_ENGINE: OnceLock<ocrs::OcrEngine> = OnceLock::new();

const DETECTION_MODEL: &str = "text-detection.rten";
const RECOGNITION_MODEL: &str = "text-recognition.rten";

/// Neural OCR over ocrs + rten.
pub struct OcrsBackend {
    /// Explicit model directory; standard locations are searched when None.
    model_dir: Option<PathBuf>,
}

impl OcrsBackend {
    pub fn new() -> Self {
        Self { model_dir: None }
    }

    pub fn with_model_dir(model_dir: PathBuf) -> Self {
        Self {
            model_dir: Some(model_dir),
        }
    }

    /// Find a directory containing both model files.
    fn find_model_dir(&self) -> Option<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(dir) = &self.model_dir {
            candidates.push(dir.clone());
        }
        if let Some(data) = dirs::data_dir() {
            candidates.push(data.join("ocrs").join("models"));
        }
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".ocrs").join("models"));
        }
        candidates.push(PathBuf::from("/usr/share/ocrs/models"));

        candidates.into_iter().find(|dir| {
            dir.join(DETECTION_MODEL).exists() && dir.join(RECOGNITION_MODEL).exists()
        })
    }

    /// Get or initialize the cached OCR engine.
    fn get_or_init_engine(&self) -> Result<&'static ocrs::OcrEngine, OcrError> {
        if let Some(engine) = OCR_ENGINE.get() {
            return Ok(engine);
        }

        let model_dir = self.find_model_dir().ok_or_else(|| {
            OcrError::BackendNotAvailable(
                "ocrs models not found (download text-detection.rten and \
                 text-recognition.rten into the ocrs model directory)"
                    .to_string(),
            )
        })?;

        let detection_model = rten::Model::load_file(model_dir.join(DETECTION_MODEL))
            .map_err(|e| OcrError::OcrFailed(format!("failed to load detection model: {}", e)))?;
        let recognition_model = rten::Model::load_file(model_dir.join(RECOGNITION_MODEL))
            .map_err(|e| OcrError::OcrFailed(format!("failed to load recognition model: {}", e)))?;

        let engine = ocrs::OcrEngine::new(ocrs::OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|e| OcrError::OcrFailed(format!("failed to create OCR engine: {}", e)))?;

        // If another thread beat us to initialization, use the winner.
        let _ = OCR_ENGINE.set(engine);
        OCR_ENGINE
            .get()
            .ok_or_else(|| OcrError::OcrFailed("failed to cache OCR engine".to_string()))
    }
}

impl Default for OcrsBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for OcrsBackend {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn is_available(&self) -> bool {
        self.find_model_dir().is_some()
    }

    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError> {
        let engine = self.get_or_init_engine()?;

        let rgb = image::DynamicImage::ImageLuma8(image.clone()).to_rgb8();
        let (width, height) = rgb.dimensions();
        let source = ocrs::ImageSource::from_bytes(rgb.as_raw(), (width, height))
            .map_err(|e| OcrError::ImageError(format!("failed to convert image: {}", e)))?;

        let input = engine
            .prepare_input(source)
            .map_err(|e| OcrError::OcrFailed(format!("failed to prepare input: {}", e)))?;

        engine
            .get_text(&input)
            .map_err(|e| OcrError::OcrFailed(format!("failed to extract text: {}", e)))
    }
}
