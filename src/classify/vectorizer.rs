//! TF-IDF vectorization over word n-grams.
//!
//! Inference-only counterpart of the training-side vectorizer: the
//! vocabulary and per-term idf weights are fixed in the model artifact.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Fixed, pretrained feature transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    /// Term (or space-joined n-gram) to feature index.
    pub vocabulary: HashMap<String, usize>,
    /// Inverse-document-frequency weight per feature index.
    pub idf: Vec<f64>,
    /// Inclusive n-gram range over word tokens, e.g. (1, 3).
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    /// Lowercase the input before tokenizing.
    #[serde(default = "default_true")]
    pub lowercase: bool,
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_true() -> bool {
    true
}

/// Word tokens: runs of two or more word characters.
fn tokenize(text: &str) -> Vec<String> {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    let re = TOKEN_RE.get_or_init(|| Regex::new(r"\b\w\w+\b").unwrap());
    re.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

impl TfidfVectorizer {
    /// Number of features this vectorizer produces.
    pub fn n_features(&self) -> usize {
        self.idf.len()
    }

    /// Check that every vocabulary entry maps into the idf table.
    pub fn check_consistency(&self) -> Result<(), String> {
        let n_features = self.n_features();
        for (term, &index) in &self.vocabulary {
            if index >= n_features {
                return Err(format!(
                    "vocabulary entry {:?} has index {} but only {} idf weights",
                    term, index, n_features
                ));
            }
        }
        Ok(())
    }

    /// Transform text into a sparse L2-normalized tf-idf vector of
    /// (feature index, weight) pairs sorted by index.
    pub fn transform(&self, text: &str) -> Vec<(usize, f64)> {
        let lowered;
        let text = if self.lowercase {
            lowered = text.to_lowercase();
            &lowered
        } else {
            text
        };

        let tokens = tokenize(text);
        let (min_n, max_n) = self.ngram_range;

        // Raw term counts over known vocabulary entries.
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for n in min_n..=max_n.max(min_n) {
            if n == 0 || n > tokens.len() {
                continue;
            }
            for window in tokens.windows(n) {
                let gram = window.join(" ");
                if let Some(&index) = self.vocabulary.get(&gram) {
                    *counts.entry(index).or_insert(0.0) += 1.0;
                }
            }
        }

        // tf * idf, then L2 normalization.
        let mut features: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(index, tf)| (index, tf * self.idf[index]))
            .collect();
        features.sort_unstable_by_key(|(index, _)| *index);

        let norm: f64 = features.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in features.iter_mut() {
                *w /= norm;
            }
        }
        features
    }
}
