//! Input documents and their declared formats.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A file whose extension is not one of the supported formats.
#[derive(Debug, Clone, Error)]
#[error("Unsupported file type: .{extension}")]
pub struct UnsupportedFormat {
    /// The rejected extension, lowercased, without the leading dot.
    pub extension: String,
}

/// Declared format of an input document.
///
/// Closed set: every pipeline stage matches on this exhaustively, so adding
/// a format is a compile-time checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Image,
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Determine the format from a file extension.
    pub fn from_extension(ext: &str) -> Result<Self, UnsupportedFormat> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "tif" | "tiff" | "bmp" => Ok(Self::Image),
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            other => Err(UnsupportedFormat {
                extension: other.to_string(),
            }),
        }
    }

    /// Determine the format from a file path.
    pub fn from_path(path: &Path) -> Result<Self, UnsupportedFormat> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(ext)
    }

    /// Short display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }
}

/// A single input artifact, immutable once read.
#[derive(Debug, Clone)]
pub struct Document {
    /// Location of the source file.
    pub path: PathBuf,
    /// Declared format, derived from the extension.
    pub format: DocumentFormat,
    /// Original filename, used when building the filed name.
    pub original_name: String,
    /// Byte size on disk.
    pub size_bytes: u64,
}

impl Document {
    /// Build a document from a path, reading its size from the filesystem.
    ///
    /// A stat failure degrades to a size of 0 rather than blocking the
    /// pipeline; the file itself is re-read by the extraction stage.
    pub fn from_path(path: &Path) -> Result<Self, UnsupportedFormat> {
        let format = DocumentFormat::from_path(path)?;
        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            path: path.to_path_buf(),
            format,
            original_name,
            size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            DocumentFormat::from_extension("pdf").unwrap(),
            DocumentFormat::Pdf
        );
        assert_eq!(
            DocumentFormat::from_extension("DOCX").unwrap(),
            DocumentFormat::Docx
        );
        assert_eq!(
            DocumentFormat::from_extension("JPeG").unwrap(),
            DocumentFormat::Image
        );
    }

    #[test]
    fn test_format_rejects_unknown_with_extension() {
        let err = DocumentFormat::from_extension("exe").unwrap_err();
        assert_eq!(err.extension, "exe");
        assert!(err.to_string().contains(".exe"));
    }

    #[test]
    fn test_format_from_path_without_extension() {
        let err = DocumentFormat::from_path(Path::new("/tmp/noext")).unwrap_err();
        assert_eq!(err.extension, "");
    }
}
