//! HTTP request handlers for the classification API.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::analytics::ProcessingRecord;
use crate::filing::FilingMode;
use crate::models::{
    FilingDecision, ProcessingOutcome, StructuredFields, EMPTY_DOCUMENT_CATEGORY,
};

/// Upload extensions accepted by /classify/file.
const UPLOAD_EXTENSIONS: &[&str] = &["pdf", "docx", "jpg", "jpeg", "png"];

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Service landing page.
pub async fn index() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "gedsort",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/health", "/classify/text", "/classify/file"],
    }))
}

#[derive(Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub model_loaded: bool,
    pub classes: Vec<String>,
}

/// Liveness and model status.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthBody {
        status: "ok",
        model_loaded: state.pipeline.has_model(),
        classes: state.pipeline.classes(),
    })
}

#[derive(Deserialize)]
pub struct ClassifyTextRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct ClassifyTextResponse {
    pub category: String,
    pub confidence: f64,
    pub probabilities: BTreeMap<String, f64>,
    pub fields: StructuredFields,
    pub processing_time_secs: f64,
    pub timestamp: chrono::DateTime<chrono::Local>,
}

impl ClassifyTextResponse {
    fn new(
        category: String,
        confidence: f64,
        probabilities: BTreeMap<String, f64>,
        fields: StructuredFields,
        started: std::time::Instant,
    ) -> Self {
        Self {
            category,
            confidence,
            probabilities,
            fields,
            processing_time_secs: started.elapsed().as_secs_f64(),
            timestamp: chrono::Local::now(),
        }
    }
}

/// Classify raw text without filing anything.
pub async fn classify_text(
    State(state): State<AppState>,
    Json(req): Json<ClassifyTextRequest>,
) -> Response {
    let started = std::time::Instant::now();
    let fields = crate::fields::extract_fields(&req.text);

    if req.text.trim().is_empty() {
        return Json(ClassifyTextResponse::new(
            EMPTY_DOCUMENT_CATEGORY.to_string(),
            0.0,
            BTreeMap::new(),
            fields,
            started,
        ))
        .into_response();
    }

    match state.pipeline.classify(&req.text) {
        Ok(result) => Json(ClassifyTextResponse::new(
            result.label,
            result.confidence,
            result.probabilities,
            fields,
            started,
        ))
        .into_response(),
        Err(e) => error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    }
}

#[derive(Serialize)]
pub struct ClassifyFileResponse {
    pub filename: String,
    pub mime: String,
    pub category: String,
    pub confidence: f64,
    pub probabilities: BTreeMap<String, f64>,
    pub decision: FilingDecision,
    pub fields: StructuredFields,
    /// Leading excerpt of the extracted text.
    pub text_excerpt: String,
    pub text_chars: usize,
    pub size_bytes: u64,
    pub processing_time_secs: f64,
    pub timestamp: chrono::DateTime<chrono::Local>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClassifyFileResponse {
    fn new(outcome: ProcessingOutcome, mime: String) -> Self {
        Self {
            filename: outcome.filename,
            mime,
            category: outcome.category,
            confidence: outcome.confidence,
            probabilities: outcome.probabilities,
            decision: outcome.decision,
            fields: outcome.fields,
            text_excerpt: outcome.text_excerpt,
            text_chars: outcome.text_chars,
            size_bytes: outcome.size_bytes,
            processing_time_secs: outcome.duration.as_secs_f64(),
            timestamp: chrono::Local::now(),
            status: outcome.status.as_str().to_string(),
            error: outcome.error,
        }
    }
}

/// Accept a document upload, run the full pipeline and file it under the
/// output tree. The upload is copied, never moved, so the caller keeps
/// nothing on our side if filing fails.
pub async fn classify_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let (filename, data) = loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => {
                return error_response(StatusCode::BAD_REQUEST, "missing file field");
            }
            Err(e) => {
                return error_response(StatusCode::BAD_REQUEST, format!("bad multipart: {}", e));
            }
        };
        if field.name() != Some("file") {
            continue;
        }
        let filename = match field.file_name() {
            Some(name) if !name.is_empty() => sanitize_upload_name(name),
            _ => {
                return error_response(StatusCode::BAD_REQUEST, "upload has no filename");
            }
        };
        match field.bytes().await {
            Ok(data) => break (filename, data),
            Err(e) => {
                return error_response(StatusCode::BAD_REQUEST, format!("upload failed: {}", e));
            }
        }
    };

    let extension = PathBuf::from(&filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if !UPLOAD_EXTENSIONS.contains(&extension.as_str()) {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Unsupported file type: .{}", extension),
        );
    }
    let mime = mime_guess::from_path(&filename)
        .first_or_octet_stream()
        .to_string();

    let pipeline = Arc::clone(&state.pipeline);
    let result = tokio::task::spawn_blocking(move || {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(&filename);
        std::fs::write(&path, &data)?;
        let outcome = pipeline.process(&path, FilingMode::Copy)?;
        Ok::<_, anyhow::Error>(outcome)
    })
    .await;

    let outcome = match result {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            tracing::error!("Upload processing failed: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
        Err(e) => {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    state.analytics.log(&ProcessingRecord::from(&outcome));
    Json(ClassifyFileResponse::new(outcome, mime)).into_response()
}

/// Strip any path components a client smuggled into the filename.
fn sanitize_upload_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .trim()
        .to_string();
    if base.is_empty() || base == "." || base == ".." {
        "upload".to_string()
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_upload_name() {
        assert_eq!(sanitize_upload_name("facture.pdf"), "facture.pdf");
        assert_eq!(sanitize_upload_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_upload_name("C:\\docs\\scan.png"), "scan.png");
        assert_eq!(sanitize_upload_name(".."), "upload");
    }

    #[test]
    fn test_upload_extension_allowlist() {
        for ext in ["pdf", "docx", "jpg", "jpeg", "png"] {
            assert!(UPLOAD_EXTENSIONS.contains(&ext));
        }
        assert!(!UPLOAD_EXTENSIONS.contains(&"exe"));
    }
}
