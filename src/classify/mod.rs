//! Text classification against a pretrained model artifact.
//!
//! The artifact (JSON) bundles the TF-IDF vectorizer state, the classifier
//! weights and the known category labels. It is loaded once at process
//! start and held as read-only shared state; inference takes `&self` and
//! is safe for concurrent use.

mod model;
mod vectorizer;

pub use model::{
    Classifier, DecisionTree, Ensemble, EnsembleMember, IsotonicCurve, MultinomialNb,
    RandomForest,
};
pub use vectorizer::TfidfVectorizer;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ClassificationResult;

/// Artifact format version this build understands.
pub const ARTIFACT_VERSION: u32 = 1;

/// Model loading failures. `Incompatible` ("loaded but stale") is
/// distinguished from files that fail to parse at all.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model file not found: {0}")]
    NotFound(String),

    #[error("Model file is corrupt: {0}")]
    Corrupt(String),

    #[error("Model artifact version {found} is not supported (expected {expected})")]
    Incompatible { found: u32, expected: u32 },

    #[error("Model is inconsistent: {0}")]
    Inconsistent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Inference failures.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The classifier cannot run (no model loaded for this process).
    #[error("Classification unavailable: {0}")]
    Unavailable(String),
}

/// Serialized model artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Format version; mismatches are rejected as stale.
    pub version: u32,
    /// Known category labels, index-aligned with classifier outputs.
    pub classes: Vec<String>,
    pub vectorizer: TfidfVectorizer,
    pub classifier: Classifier,
}

/// Read-only handle over a loaded model.
#[derive(Debug)]
pub struct ClassifierModel {
    classes: Vec<String>,
    vectorizer: TfidfVectorizer,
    classifier: Classifier,
}

impl ClassifierModel {
    /// Load a model artifact from disk.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ModelError::NotFound(path.display().to_string()))
            }
            Err(e) => return Err(ModelError::Io(e)),
        };

        let artifact: ModelArtifact =
            serde_json::from_str(&data).map_err(|e| ModelError::Corrupt(e.to_string()))?;
        Self::from_artifact(artifact)
    }

    /// Validate and wrap a deserialized artifact.
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ModelError> {
        if artifact.version != ARTIFACT_VERSION {
            return Err(ModelError::Incompatible {
                found: artifact.version,
                expected: ARTIFACT_VERSION,
            });
        }
        if artifact.classes.is_empty() {
            return Err(ModelError::Inconsistent("no classes".to_string()));
        }
        let n_classes = match &artifact.classifier {
            Classifier::NaiveBayes(nb) => nb.class_log_prior.len(),
            Classifier::Ensemble(e) => e
                .members
                .first()
                .map(|m| match m {
                    EnsembleMember::NaiveBayes(nb) => nb.class_log_prior.len(),
                    EnsembleMember::RandomForest(rf) => rf
                        .trees
                        .first()
                        .and_then(|t| t.value.first())
                        .map(|v| v.len())
                        .unwrap_or(0),
                })
                .unwrap_or(0),
        };
        if n_classes != artifact.classes.len() {
            return Err(ModelError::Inconsistent(format!(
                "classifier has {} classes but {} labels",
                n_classes,
                artifact.classes.len()
            )));
        }
        artifact
            .vectorizer
            .check_consistency()
            .map_err(ModelError::Inconsistent)?;
        artifact
            .classifier
            .check_consistency(artifact.vectorizer.n_features(), n_classes)
            .map_err(ModelError::Inconsistent)?;

        Ok(Self {
            classes: artifact.classes,
            vectorizer: artifact.vectorizer,
            classifier: artifact.classifier,
        })
    }

    /// Known category labels.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Classify non-empty extracted text.
    ///
    /// Callers short-circuit empty text to the empty-document route before
    /// reaching this; a vectorizer over empty text is degenerate.
    pub fn predict(&self, text: &str) -> ClassificationResult {
        let features = self.vectorizer.transform(text);
        let proba = self.classifier.predict_proba(&features);

        let (best, _) = proba
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(bi, bp), (i, &p)| {
                if p > bp {
                    (i, p)
                } else {
                    (bi, bp)
                }
            });

        let probabilities: BTreeMap<String, f64> = self
            .classes
            .iter()
            .cloned()
            .zip(proba.iter().copied())
            .collect();

        ClassificationResult {
            label: self.classes[best].clone(),
            // Percentage rounded to two decimals.
            confidence: (proba[best] * 100.0 * 100.0).round() / 100.0,
            probabilities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn tiny_artifact() -> ModelArtifact {
        let vocabulary = [("jugement", 0usize), ("contrat", 1), ("facture", 2)]
            .into_iter()
            .map(|(t, i)| (t.to_string(), i))
            .collect();

        ModelArtifact {
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
        }
    }

    #[test]
    fn test_predict_label_and_distribution() {
        let model = ClassifierModel::from_artifact(tiny_artifact()).unwrap();
        let result = model.predict("le jugement du tribunal concernant le jugement");

        assert_eq!(result.label, "jugement");
        assert!(result.confidence > 33.4 && result.confidence <= 100.0);

        let sum: f64 = result.probabilities.values().sum();
        assert!((sum - 1.0).abs() < 0.01);
        assert_eq!(result.probabilities.len(), 3);
    }

    #[test]
    fn test_predict_unknown_text_falls_back_to_priors() {
        let model = ClassifierModel::from_artifact(tiny_artifact()).unwrap();
        let result = model.predict("texte totalement inconnu du vocabulaire");
        // Uniform priors: confidence is 100/3 rounded to two decimals.
        assert!((result.confidence - 33.33).abs() < 0.01);
    }

    #[test]
    fn test_version_mismatch_is_incompatible() {
        let mut artifact = tiny_artifact();
        artifact.version = 99;
        match ClassifierModel::from_artifact(artifact) {
            Err(ModelError::Incompatible { found: 99, .. }) => {}
            other => panic!("expected Incompatible, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_class_count_mismatch_is_inconsistent() {
        let mut artifact = tiny_artifact();
        artifact.classes.pop();
        assert!(matches!(
            ClassifierModel::from_artifact(artifact),
            Err(ModelError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_vocabulary_index_past_idf_table_is_inconsistent() {
        let mut artifact = tiny_artifact();
        artifact.vectorizer.vocabulary.insert("jugement".into(), 7);
        assert!(matches!(
            ClassifierModel::from_artifact(artifact),
            Err(ModelError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_feature_row_narrower_than_idf_table_is_inconsistent() {
        let mut artifact = tiny_artifact();
        // A fourth idf weight widens the feature space past every NB row.
        artifact.vectorizer.idf.push(1.0);
        assert!(matches!(
            ClassifierModel::from_artifact(artifact),
            Err(ModelError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_tree_child_out_of_range_is_inconsistent() {
        let mut artifact = tiny_artifact();
        artifact.classifier = Classifier::Ensemble(Ensemble {
            members: vec![EnsembleMember::RandomForest(RandomForest {
                trees: vec![DecisionTree {
                    feature: vec![0],
                    threshold: vec![0.5],
                    children_left: vec![5],
                    children_right: vec![-1],
                    value: vec![vec![1.0, 0.0, 0.0]],
                }],
                n_features: 3,
            })],
            calibration: None,
        });
        assert!(matches!(
            ClassifierModel::from_artifact(artifact),
            Err(ModelError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let err = ClassifierModel::load(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, ModelError::NotFound(_)));
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            ClassifierModel::load(&path),
            Err(ModelError::Corrupt(_))
        ));
    }

    #[test]
    fn test_artifact_round_trips_through_json() {
        let json = serde_json::to_string(&tiny_artifact()).unwrap();
        let parsed: ModelArtifact = serde_json::from_str(&json).unwrap();
        let model = ClassifierModel::from_artifact(parsed).unwrap();
        assert_eq!(model.classes().len(), 3);
    }
}
