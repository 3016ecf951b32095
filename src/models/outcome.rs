//! Pipeline results: classification, structured fields, filing decisions.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Category a document is filed under when no text was detected.
pub const EMPTY_DOCUMENT_CATEGORY: &str = "document_vide";

/// Reserved category for documents that could not be classified.
pub const UNCLASSIFIED_CATEGORY: &str = "non_classifies";

/// Output of the classifier for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Predicted category label (argmax of the distribution).
    pub label: String,
    /// Probability of the predicted label as a percentage in [0, 100],
    /// rounded to two decimals.
    pub confidence: f64,
    /// Full probability distribution over every known category.
    pub probabilities: BTreeMap<String, f64>,
}

/// Pattern-matched entities found in extracted text.
///
/// A category with no matches is an empty list, never an absent key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredFields {
    pub dates: Vec<String>,
    pub amounts: Vec<String>,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
}

/// What the filing engine did with the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilingAction {
    Moved,
    Copied,
}

/// Where a document ended up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingDecision {
    /// Sanitized category the destination folder is named after.
    pub category: String,
    /// Final path of the filed artifact.
    pub destination: PathBuf,
    /// Whether the source was moved or copied.
    pub action: FilingAction,
}

/// Terminal status of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Text was extracted and classified normally.
    Success,
    /// No text detected; filed under the empty-document category.
    EmptyDocument,
    /// Unsupported format or classification failure; filed under the
    /// unclassified category.
    Error,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::EmptyDocument => "empty_document",
            Self::Error => "error",
        }
    }
}

/// The human-readable record produced for every processed document.
#[derive(Debug, Clone)]
pub struct ProcessingOutcome {
    /// Original filename.
    pub filename: String,
    /// Predicted (or sentinel) category.
    pub category: String,
    /// Confidence percentage; 0.0 for sentinel routes.
    pub confidence: f64,
    /// Full distribution when classification ran, empty otherwise.
    pub probabilities: BTreeMap<String, f64>,
    /// Where the document was filed.
    pub decision: FilingDecision,
    /// Structured fields matched in the extracted text.
    pub fields: StructuredFields,
    /// Number of characters of extracted text.
    pub text_chars: usize,
    /// Leading excerpt of the extracted text, for API responses.
    pub text_excerpt: String,
    /// Source file size in bytes.
    pub size_bytes: u64,
    /// Wall-clock processing time.
    pub duration: Duration,
    /// Terminal status.
    pub status: ProcessingStatus,
    /// Human-readable error detail for degraded runs.
    pub error: Option<String>,
}
