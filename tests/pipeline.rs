//! End-to-end pipeline tests over real files on disk.
//!
//! These drive the docx path only: it needs no external OCR binaries.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use gedsort::classify::{
    Classifier, ClassifierModel, ModelArtifact, MultinomialNb, TfidfVectorizer, ARTIFACT_VERSION,
};
use gedsort::filing::{FilingEngine, FilingMode};
use gedsort::models::{FilingAction, ProcessingStatus, EMPTY_DOCUMENT_CATEGORY};
use gedsort::ocr::{build_runner, TextExtractor};
use gedsort::pipeline::Pipeline;

fn write_docx(path: &Path, paragraphs: &[&str]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file(
        "word/document.xml",
        zip::write::SimpleFileOptions::default(),
    )
    .unwrap();
    write!(zip, "<w:document><w:body>").unwrap();
    for p in paragraphs {
        write!(zip, "<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p).unwrap();
    }
    write!(zip, "</w:body></w:document>").unwrap();
    zip.finish().unwrap();
}

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

fn test_pipeline(output_dir: &Path) -> Pipeline {
    let runner = build_runner("fra+eng", Duration::from_secs(5), false);
    Pipeline::new(
        TextExtractor::new(runner),
        Some(Arc::new(three_class_model())),
        FilingEngine::new(output_dir.to_path_buf()).unwrap(),
    )
}

#[test]
fn docx_is_classified_filed_and_field_scanned() {
    let inbox = TempDir::new().unwrap();
    let outbox = TempDir::new().unwrap();
    let pipeline = test_pipeline(outbox.path());

    let doc = inbox.path().join("dossier.docx");
    write_docx(
        &doc,
        &[
            "Jugement rendu le 15/03/2024 par le tribunal",
            "Montant de la condamnation: 5000€",
            "Contact: greffe@tribunal.fr",
        ],
    );

    let outcome = pipeline.process(&doc, FilingMode::Move).unwrap();

    assert_eq!(outcome.status, ProcessingStatus::Success);
    assert_eq!(outcome.category, "jugement");
    assert!(outcome.confidence > 33.4);
    assert_eq!(outcome.decision.action, FilingAction::Moved);

    // Moved into the category folder, source gone.
    assert!(!doc.exists());
    let dest = &outcome.decision.destination;
    assert!(dest.exists());
    assert!(dest.starts_with(outbox.path().join("jugement")));

    // Renamed with the confidence prefix and the original name kept.
    let name = dest.file_name().unwrap().to_string_lossy();
    assert!(name.starts_with('['));
    assert!(name.ends_with("_dossier.docx"));

    assert_eq!(outcome.fields.dates, vec!["15/03/2024"]);
    assert!(outcome.fields.amounts.iter().any(|a| a.contains("5000")));
    assert_eq!(outcome.fields.emails, vec!["greffe@tribunal.fr"]);
}

#[test]
fn copy_mode_keeps_the_source_file() {
    let inbox = TempDir::new().unwrap();
    let outbox = TempDir::new().unwrap();
    let pipeline = test_pipeline(outbox.path());

    let doc = inbox.path().join("contrat.docx");
    write_docx(&doc, &["Contrat de travail entre les parties"]);

    let outcome = pipeline.process(&doc, FilingMode::Copy).unwrap();

    assert_eq!(outcome.decision.action, FilingAction::Copied);
    assert!(doc.exists());
    assert!(outcome.decision.destination.exists());
    assert_eq!(outcome.category, "contrat");
}

#[test]
fn empty_docx_goes_to_the_empty_document_folder() {
    let inbox = TempDir::new().unwrap();
    let outbox = TempDir::new().unwrap();
    let pipeline = test_pipeline(outbox.path());

    let doc = inbox.path().join("vide.docx");
    write_docx(&doc, &["   "]);

    let outcome = pipeline.process(&doc, FilingMode::Move).unwrap();

    assert_eq!(outcome.status, ProcessingStatus::EmptyDocument);
    assert_eq!(outcome.category, EMPTY_DOCUMENT_CATEGORY);
    assert_eq!(outcome.confidence, 0.0);
    assert!(outcome
        .decision
        .destination
        .starts_with(outbox.path().join(EMPTY_DOCUMENT_CATEGORY)));
}

#[test]
fn duplicate_names_get_a_numeric_suffix() {
    let inbox = TempDir::new().unwrap();
    let outbox = TempDir::new().unwrap();
    let pipeline = test_pipeline(outbox.path());

    let doc = inbox.path().join("facture.docx");
    write_docx(&doc, &["Facture acquittée, montant 120€"]);
    let first = pipeline.process(&doc, FilingMode::Copy).unwrap();
    let second = pipeline.process(&doc, FilingMode::Copy).unwrap();

    assert!(first.decision.destination.exists());
    assert!(second.decision.destination.exists());
    if second.decision.destination == first.decision.destination {
        // Same-second runs must still land in distinct files.
        panic!("destinations collide");
    }
}

#[test]
fn pipeline_without_model_files_as_unclassified() {
    let inbox = TempDir::new().unwrap();
    let outbox = TempDir::new().unwrap();
    let runner = build_runner("fra+eng", Duration::from_secs(5), false);
    let pipeline = Pipeline::new(
        TextExtractor::new(runner),
        None,
        FilingEngine::new(outbox.path().to_path_buf()).unwrap(),
    );

    let doc = inbox.path().join("note.docx");
    write_docx(&doc, &["Texte sans modèle de classification"]);

    let outcome = pipeline.process(&doc, FilingMode::Move).unwrap();
    assert_eq!(outcome.category, gedsort::models::UNCLASSIFIED_CATEGORY);
    assert_eq!(outcome.confidence, 0.0);
    assert_eq!(outcome.status, ProcessingStatus::Error);
}
