//! HTTP API tests driving the router directly with tower's oneshot.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{self, Body};
use axum::http::{header, Request, StatusCode};
use tempfile::TempDir;
use tower::util::ServiceExt;

use gedsort::analytics::AnalyticsLogger;
use gedsort::classify::{
    Classifier, ClassifierModel, ModelArtifact, MultinomialNb, TfidfVectorizer, ARTIFACT_VERSION,
};
use gedsort::filing::FilingEngine;
use gedsort::ocr::{build_runner, TextExtractor};
use gedsort::pipeline::Pipeline;
use gedsort::server::{create_router, AppState};

const BODY_LIMIT: usize = 64 * 1024;

fn three_class_model() -> ClassifierModel {
    let vocabulary = [("jugement", 0usize), ("contrat", 1), ("facture", 2)]
        .into_iter()
        .map(|(t, i)| (t.to_string(), i))
        .collect();

    let artifact = ModelArtifact {
        version: ARTIFACT_VERSION,
        classes: vec!["jugement".into(), "contrat".into(), "facture".into()],
        vectorizer: TfidfVectorizer {
            vocabulary,
            idf: vec![1.0, 1.0, 1.0],
            ngram_range: (1, 1),
            lowercase: true,
        },
        classifier: Classifier::NaiveBayes(MultinomialNb {
            class_log_prior: vec![(1.0f64 / 3.0).ln(); 3],
            feature_log_prob: vec![
                vec![0.8f64.ln(), 0.1f64.ln(), 0.1f64.ln()],
                vec![0.1f64.ln(), 0.8f64.ln(), 0.1f64.ln()],
                vec![0.1f64.ln(), 0.1f64.ln(), 0.8f64.ln()],
            ],
        }),
    };
    ClassifierModel::from_artifact(artifact).unwrap()
}

/// Router plus the output tree it files into; the TempDirs keep the
/// directories alive for the duration of the test.
fn test_app() -> (axum::Router, TempDir, TempDir) {
    let outbox = TempDir::new().unwrap();
    let dbdir = TempDir::new().unwrap();

    let runner = build_runner("fra+eng", Duration::from_secs(5), false);
    let pipeline = Pipeline::new(
        TextExtractor::new(runner),
        Some(Arc::new(three_class_model())),
        FilingEngine::new(outbox.path().to_path_buf()).unwrap(),
    );
    let analytics = AnalyticsLogger::open(&dbdir.path().join("analytics.db")).unwrap();

    let state = AppState {
        pipeline: Arc::new(pipeline),
        analytics: Arc::new(analytics),
    };
    (create_router(state), outbox, dbdir)
}

async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn multipart_upload(filename: &str, content: &[u8]) -> Request<Body> {
    let boundary = "gedsort-test-boundary";
    let mut body: Vec<u8> = Vec::new();
    write!(
        body,
        "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n",
        boundary, filename
    )
    .unwrap();
    body.extend_from_slice(content);
    write!(body, "\r\n--{}--\r\n", boundary).unwrap();

    Request::post("/classify/file")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

fn docx_bytes(text: &str) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut cursor);
        zip.start_file(
            "word/document.xml",
            zip::write::SimpleFileOptions::default(),
        )
        .unwrap();
        write!(
            zip,
            "<w:document><w:body><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:body></w:document>",
            text
        )
        .unwrap();
        zip.finish().unwrap();
    }
    cursor.into_inner()
}

#[tokio::test]
async fn health_reports_model_and_classes() {
    let (app, _outbox, _db) = test_app();

    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = json_body(resp).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["model_loaded"], true);
    assert_eq!(json["classes"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn classify_text_returns_category_and_fields() {
    let (app, _outbox, _db) = test_app();

    let payload = serde_json::json!({
        "text": "Jugement du 15/03/2024, contact greffe@tribunal.fr"
    });
    let resp = app
        .oneshot(
            Request::post("/classify/text")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = json_body(resp).await;
    assert_eq!(json["category"], "jugement");
    assert_eq!(json["fields"]["dates"][0], "15/03/2024");
    assert_eq!(json["fields"]["emails"][0], "greffe@tribunal.fr");
}

#[tokio::test]
async fn classify_empty_text_is_the_empty_document_category() {
    let (app, _outbox, _db) = test_app();

    let resp = app
        .oneshot(
            Request::post("/classify/text")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"text": "   "}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = json_body(resp).await;
    assert_eq!(json["category"], "document_vide");
    assert_eq!(json["confidence"], 0.0);
}

#[tokio::test]
async fn upload_with_bad_extension_is_rejected() {
    let (app, _outbox, _db) = test_app();

    let resp = app
        .oneshot(multipart_upload("script.exe", b"MZ"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let json = json_body(resp).await;
    let error = json["error"].as_str().unwrap();
    assert!(error.contains(".exe"));
}

#[tokio::test]
async fn upload_docx_is_classified_and_filed() {
    let (app, outbox, _db) = test_app();

    let resp = app
        .oneshot(multipart_upload(
            "contrat.docx",
            &docx_bytes("Contrat de bail signé entre les parties"),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = json_body(resp).await;
    assert_eq!(json["category"], "contrat");
    assert_eq!(json["status"], "success");
    assert!(json["text_excerpt"]
        .as_str()
        .unwrap()
        .contains("Contrat de bail"));
    assert!(json["processing_time_secs"].as_f64().unwrap() >= 0.0);

    let destination = json["decision"]["destination"].as_str().unwrap();
    assert!(destination.starts_with(
        outbox.path().join("contrat").to_string_lossy().as_ref()
    ));
    assert!(std::path::Path::new(destination).exists());
}
