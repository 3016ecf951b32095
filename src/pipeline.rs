//! The document processing pipeline.
//!
//! One entry point consolidates extraction, structured-field scanning,
//! classification and filing. All failures up through classification are
//! absorbed into degraded outcomes (empty text, zero confidence, sentinel
//! category) so that every document reaches the filing engine; only a
//! filing failure is surfaced to the caller.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::classify::{ClassifierModel, ClassifyError};
use crate::fields;
use crate::filing::{FilingEngine, FilingError, FilingMode};
use crate::models::{
    ClassificationResult, Document, DocumentFormat, ProcessingOutcome, ProcessingStatus,
    StructuredFields, EMPTY_DOCUMENT_CATEGORY, UNCLASSIFIED_CATEGORY,
};
use crate::ocr::TextExtractor;

/// Excerpt length carried in outcomes for API responses.
const TEXT_EXCERPT_CHARS: usize = 500;

fn excerpt(text: &str) -> String {
    text.chars().take(TEXT_EXCERPT_CHARS).collect()
}

/// The per-process pipeline. The classifier model is loaded once and
/// shared read-only; the pipeline itself is safe to share across worker
/// threads for batch runs.
pub struct Pipeline {
    extractor: TextExtractor,
    model: Option<Arc<ClassifierModel>>,
    filing: FilingEngine,
}

impl Pipeline {
    pub fn new(
        extractor: TextExtractor,
        model: Option<Arc<ClassifierModel>>,
        filing: FilingEngine,
    ) -> Self {
        Self {
            extractor,
            model,
            filing,
        }
    }

    /// Build a pipeline from settings. A missing model artifact is not
    /// fatal: processing degrades to the unclassified category.
    pub fn from_settings(settings: &crate::config::Settings) -> anyhow::Result<Self> {
        let runner = crate::ocr::build_runner(
            &settings.ocr.language,
            settings.ocr.timeout(),
            settings.ocr.neural_fallback,
        );
        let extractor = TextExtractor::new(runner);

        let model = match ClassifierModel::load(&settings.model_path) {
            Ok(model) => Some(Arc::new(model)),
            Err(crate::classify::ModelError::NotFound(path)) => {
                tracing::warn!("No classifier model at {}, filing as unclassified", path);
                None
            }
            Err(e) => return Err(e.into()),
        };

        let filing = FilingEngine::new(settings.output_dir.clone())?;
        Ok(Self::new(extractor, model, filing))
    }

    /// Whether a classifier model is loaded.
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Known category labels, empty when no model is loaded.
    pub fn classes(&self) -> Vec<String> {
        self.model
            .as_ref()
            .map(|m| m.classes().to_vec())
            .unwrap_or_default()
    }

    pub fn filing(&self) -> &FilingEngine {
        &self.filing
    }

    /// Classify non-empty text against the loaded model.
    pub fn classify(&self, text: &str) -> Result<ClassificationResult, ClassifyError> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| ClassifyError::Unavailable("no model loaded".to_string()))?;
        Ok(model.predict(text))
    }

    /// Process one document from a path.
    ///
    /// Every document receives exactly one filing decision; the only error
    /// this returns is a filing failure, in which case the document ends
    /// its run unfiled and reported.
    pub fn process(&self, path: &Path, mode: FilingMode) -> Result<ProcessingOutcome, FilingError> {
        let started = Instant::now();

        // Unsupported extensions still reach a filing decision: they are
        // routed to the reserved unclassified folder.
        let doc = match Document::from_path(path) {
            Ok(doc) => doc,
            Err(unsupported) => {
                tracing::warn!("{}: {}", path.display(), unsupported);
                return self.file_degraded(
                    path,
                    UNCLASSIFIED_CATEGORY,
                    mode,
                    started,
                    ProcessingStatus::Error,
                    Some(unsupported.to_string()),
                );
            }
        };

        self.process_document(&doc, mode, started)
    }

    fn process_document(
        &self,
        doc: &Document,
        mode: FilingMode,
        started: Instant,
    ) -> Result<ProcessingOutcome, FilingError> {
        let text = self.extractor.extract(doc);
        let fields = fields::extract_fields(&text);

        // Empty text is a valid outcome, not an error: route to the
        // empty-document sentinel with confidence exactly 0.0. The
        // classifier is never invoked on empty text.
        if text.trim().is_empty() {
            tracing::info!("No text detected in {}", doc.original_name);
            let decision = self.filing.file(
                &doc.path,
                &doc.original_name,
                EMPTY_DOCUMENT_CATEGORY,
                0.0,
                mode,
            )?;
            return Ok(ProcessingOutcome {
                filename: doc.original_name.clone(),
                category: EMPTY_DOCUMENT_CATEGORY.to_string(),
                confidence: 0.0,
                probabilities: BTreeMap::new(),
                decision,
                fields,
                text_chars: text.chars().count(),
                text_excerpt: String::new(),
                size_bytes: doc.size_bytes,
                duration: started.elapsed(),
                status: ProcessingStatus::EmptyDocument,
                error: None,
            });
        }

        // Classification; an unavailable model degrades to the
        // unclassified route with confidence 0.0.
        let (category, confidence, probabilities, status, error) = match self.classify(&text) {
            Ok(result) => (
                result.label,
                result.confidence,
                result.probabilities,
                ProcessingStatus::Success,
                None,
            ),
            Err(e) => {
                tracing::warn!("{} for {}", e, doc.original_name);
                (
                    UNCLASSIFIED_CATEGORY.to_string(),
                    0.0,
                    BTreeMap::new(),
                    ProcessingStatus::Error,
                    Some(e.to_string()),
                )
            }
        };

        let decision = self
            .filing
            .file(&doc.path, &doc.original_name, &category, confidence, mode)?;

        Ok(ProcessingOutcome {
            filename: doc.original_name.clone(),
            category,
            confidence,
            probabilities,
            decision,
            fields,
            text_chars: text.chars().count(),
            text_excerpt: excerpt(&text),
            size_bytes: doc.size_bytes,
            duration: started.elapsed(),
            status,
            error,
        })
    }

    /// File a document that never produced usable data.
    fn file_degraded(
        &self,
        path: &Path,
        category: &str,
        mode: FilingMode,
        started: Instant,
        status: ProcessingStatus,
        error: Option<String>,
    ) -> Result<ProcessingOutcome, FilingError> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

        let decision = self.filing.file(path, &filename, category, 0.0, mode)?;

        Ok(ProcessingOutcome {
            filename,
            category: category.to_string(),
            confidence: 0.0,
            probabilities: BTreeMap::new(),
            decision,
            fields: StructuredFields::default(),
            text_chars: 0,
            text_excerpt: String::new(),
            size_bytes,
            duration: started.elapsed(),
            status,
            error,
        })
    }

    /// Whether a path has one of the supported extensions.
    pub fn is_supported(path: &Path) -> bool {
        DocumentFormat::from_path(path).is_ok()
    }
}
