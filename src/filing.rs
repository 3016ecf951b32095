//! Filing engine: destination folders and confidence-annotated filenames.
//!
//! Every category folder lives under one base output directory, plus a
//! reserved folder for documents that could not be classified. Filing
//! always proceeds regardless of confidence; low confidence only changes
//! the filename marker, never the routing.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::models::{FilingAction, FilingDecision, UNCLASSIFIED_CATEGORY};

/// Confidence below this inserts the low-confidence filename marker.
const LOW_CONFIDENCE_THRESHOLD: f64 = 50.0;

/// The only unrecovered per-document failure: a document that cannot be
/// moved or copied ends its run unfiled and must be reported.
#[derive(Debug, Error)]
#[error("Filing failed for {filename}: {source}")]
pub struct FilingError {
    pub filename: String,
    #[source]
    pub source: std::io::Error,
}

/// Replace every character outside [A-Za-z0-9_-] with an underscore so a
/// category label is always a valid path segment.
pub fn sanitize_category(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Build the filed filename for a document.
///
/// `[<conf>%]_<YYYYMMDD_HHMMSS>_<original>`, with the bare percentage
/// replaced by a FAIBLE_CONFIANCE marker below 50%. The format is load
/// bearing: downstream tooling parses it.
pub fn filed_name(original: &str, confidence: f64, at: NaiveDateTime) -> String {
    let timestamp = at.format("%Y%m%d_%H%M%S");
    if confidence < LOW_CONFIDENCE_THRESHOLD {
        format!("[FAIBLE_CONFIANCE_{:.1}%]_{}_{}", confidence, timestamp, original)
    } else {
        format!("[{:.1}%]_{}_{}", confidence, timestamp, original)
    }
}

/// Files processed documents into category folders.
pub struct FilingEngine {
    base_dir: PathBuf,
}

/// Whether the source file is moved into place or copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilingMode {
    Move,
    Copy,
}

impl FilingEngine {
    /// Create the engine and the base layout (base dir plus the reserved
    /// unclassified folder). Idempotent.
    pub fn new(base_dir: PathBuf) -> std::io::Result<Self> {
        std::fs::create_dir_all(&base_dir)?;
        std::fs::create_dir_all(base_dir.join(UNCLASSIFIED_CATEGORY))?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// File a document under its predicted (or sentinel) category.
    pub fn file(
        &self,
        source: &Path,
        original_name: &str,
        category: &str,
        confidence: f64,
        mode: FilingMode,
    ) -> Result<FilingDecision, FilingError> {
        self.file_at(
            source,
            original_name,
            category,
            confidence,
            mode,
            chrono::Local::now().naive_local(),
        )
    }

    /// Filing with an explicit timestamp; separated out for tests.
    pub fn file_at(
        &self,
        source: &Path,
        original_name: &str,
        category: &str,
        confidence: f64,
        mode: FilingMode,
        at: NaiveDateTime,
    ) -> Result<FilingDecision, FilingError> {
        let safe_category = sanitize_category(category);
        let category_dir = self.base_dir.join(&safe_category);

        let io = |source: std::io::Error| FilingError {
            filename: original_name.to_string(),
            source,
        };

        std::fs::create_dir_all(&category_dir).map_err(io)?;

        let name = filed_name(original_name, confidence, at);
        let destination = unique_destination(&category_dir, &name);

        match mode {
            FilingMode::Move => {
                // Rename first; fall back to copy+remove across filesystems.
                if std::fs::rename(source, &destination).is_err() {
                    std::fs::copy(source, &destination).map_err(io)?;
                    std::fs::remove_file(source).map_err(io)?;
                }
            }
            FilingMode::Copy => {
                std::fs::copy(source, &destination).map_err(io)?;
            }
        }

        tracing::debug!(
            "Filed {} under {} as {}",
            original_name,
            safe_category,
            destination.display()
        );

        Ok(FilingDecision {
            category: safe_category,
            destination,
            action: match mode {
                FilingMode::Move => FilingAction::Moved,
                FilingMode::Copy => FilingAction::Copied,
            },
        })
    }
}

/// Avoid silent overwrite when many documents land in the same folder
/// within one second: append a sequence counter to the stem.
fn unique_destination(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (name, None),
    };

    for counter in 1u32.. {
        let disambiguated = match ext {
            Some(ext) => format!("{}_{}.{}", stem, counter, ext),
            None => format!("{}_{}", stem, counter),
        };
        let candidate = dir.join(disambiguated);
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!("sequence counter space exhausted")
}
