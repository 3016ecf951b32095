//! Core data model for the document pipeline.

mod document;
mod outcome;

pub use document::{Document, DocumentFormat, UnsupportedFormat};
pub use outcome::{
    ClassificationResult, FilingAction, FilingDecision, ProcessingOutcome, ProcessingStatus,
    StructuredFields, EMPTY_DOCUMENT_CATEGORY, UNCLASSIFIED_CATEGORY,
};
