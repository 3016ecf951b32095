//! Classifier inference: multinomial naive Bayes, random-forest trees, and
//! a soft-voting ensemble with optional isotonic calibration.
//!
//! All types here are inference-only views of pretrained weights; nothing
//! is mutated after deserialization.

use serde::{Deserialize, Serialize};

/// Multinomial naive Bayes weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultinomialNb {
    /// Log prior per class.
    pub class_log_prior: Vec<f64>,
    /// Per-class, per-feature log probabilities, `[n_classes][n_features]`.
    pub feature_log_prob: Vec<Vec<f64>>,
}

impl MultinomialNb {
    /// Check weight shapes against the expected feature and class spaces.
    pub fn check_consistency(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.class_log_prior.len() != n_classes {
            return Err(format!(
                "naive Bayes has {} priors for {} classes",
                self.class_log_prior.len(),
                n_classes
            ));
        }
        if self.feature_log_prob.len() != n_classes {
            return Err(format!(
                "naive Bayes has {} weight rows for {} classes",
                self.feature_log_prob.len(),
                n_classes
            ));
        }
        for (class, row) in self.feature_log_prob.iter().enumerate() {
            if row.len() < n_features {
                return Err(format!(
                    "naive Bayes class {} has {} feature weights but the vectorizer produces {}",
                    class,
                    row.len(),
                    n_features
                ));
            }
        }
        Ok(())
    }

    /// Posterior distribution over classes for a sparse feature vector.
    pub fn predict_proba(&self, features: &[(usize, f64)]) -> Vec<f64> {
        let joint: Vec<f64> = self
            .class_log_prior
            .iter()
            .zip(&self.feature_log_prob)
            .map(|(prior, log_probs)| {
                prior
                    + features
                        .iter()
                        .map(|&(index, weight)| weight * log_probs[index])
                        .sum::<f64>()
            })
            .collect();
        softmax(&joint)
    }
}

/// One decision tree in flat-array form: `children_left[i] < 0` marks a
/// leaf, `value[i]` holds the class distribution at node `i`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub feature: Vec<usize>,
    pub threshold: Vec<f64>,
    pub children_left: Vec<i32>,
    pub children_right: Vec<i32>,
    pub value: Vec<Vec<f64>>,
}

impl DecisionTree {
    /// Check node array shapes and child indices before traversal.
    fn check_consistency(&self, n_classes: usize) -> Result<(), String> {
        let n_nodes = self.children_left.len();
        if self.children_right.len() != n_nodes
            || self.feature.len() != n_nodes
            || self.threshold.len() != n_nodes
            || self.value.len() != n_nodes
        {
            return Err(format!(
                "decision tree node arrays disagree on length ({} left children)",
                n_nodes
            ));
        }
        if n_nodes == 0 {
            return Err("decision tree has no nodes".into());
        }
        for node in 0..n_nodes {
            for child in [self.children_left[node], self.children_right[node]] {
                if child >= 0 && child as usize >= n_nodes {
                    return Err(format!(
                        "decision tree node {} points at child {} but only {} nodes exist",
                        node, child, n_nodes
                    ));
                }
            }
            if self.value[node].len() != n_classes {
                return Err(format!(
                    "decision tree node {} scores {} classes instead of {}",
                    node,
                    self.value[node].len(),
                    n_classes
                ));
            }
        }
        Ok(())
    }

    fn predict_proba(&self, dense: &[f64]) -> Vec<f64> {
        let mut node = 0usize;
        while self.children_left[node] >= 0 {
            let feature_value = dense.get(self.feature[node]).copied().unwrap_or(0.0);
            node = if feature_value <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        normalize(&self.value[node])
    }
}

/// Random forest: mean of per-tree leaf distributions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub trees: Vec<DecisionTree>,
    /// Feature-space width, needed to densify sparse inputs.
    pub n_features: usize,
}

impl RandomForest {
    pub fn check_consistency(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("random forest has no trees".into());
        }
        if self.n_features < n_features {
            return Err(format!(
                "random forest expects {} features but the vectorizer produces {}",
                self.n_features, n_features
            ));
        }
        for (index, tree) in self.trees.iter().enumerate() {
            tree.check_consistency(n_classes)
                .map_err(|reason| format!("tree {}: {}", index, reason))?;
        }
        Ok(())
    }

    pub fn predict_proba(&self, features: &[(usize, f64)]) -> Vec<f64> {
        let mut dense = vec![0.0; self.n_features];
        for &(index, weight) in features {
            if index < self.n_features {
                dense[index] = weight;
            }
        }

        let mut mean: Vec<f64> = Vec::new();
        for tree in &self.trees {
            let proba = tree.predict_proba(&dense);
            if mean.is_empty() {
                mean = proba;
            } else {
                for (m, p) in mean.iter_mut().zip(proba) {
                    *m += p;
                }
            }
        }
        let count = self.trees.len().max(1) as f64;
        for m in mean.iter_mut() {
            *m /= count;
        }
        mean
    }
}

/// A voting-ensemble member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnsembleMember {
    NaiveBayes(MultinomialNb),
    RandomForest(RandomForest),
}

impl EnsembleMember {
    fn check_consistency(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        match self {
            Self::NaiveBayes(nb) => nb.check_consistency(n_features, n_classes),
            Self::RandomForest(rf) => rf.check_consistency(n_features, n_classes),
        }
    }

    fn predict_proba(&self, features: &[(usize, f64)]) -> Vec<f64> {
        match self {
            Self::NaiveBayes(nb) => nb.predict_proba(features),
            Self::RandomForest(rf) => rf.predict_proba(features),
        }
    }
}

/// Monotone piecewise-linear calibration curve (isotonic regression fit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsotonicCurve {
    /// Breakpoint inputs, strictly increasing.
    pub x: Vec<f64>,
    /// Calibrated outputs at each breakpoint.
    pub y: Vec<f64>,
}

impl IsotonicCurve {
    /// Interpolate, clamping outside the fitted range.
    pub fn apply(&self, value: f64) -> f64 {
        if self.x.is_empty() {
            return value;
        }
        if value <= self.x[0] {
            return self.y[0];
        }
        if value >= *self.x.last().unwrap() {
            return *self.y.last().unwrap();
        }
        // partition_point: first breakpoint above `value`.
        let hi = self.x.partition_point(|&x| x <= value);
        let lo = hi - 1;
        let span = self.x[hi] - self.x[lo];
        if span <= 0.0 {
            return self.y[lo];
        }
        let t = (value - self.x[lo]) / span;
        self.y[lo] + t * (self.y[hi] - self.y[lo])
    }
}

/// Soft-voting ensemble with optional per-class isotonic calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ensemble {
    pub members: Vec<EnsembleMember>,
    /// One curve per class when calibrated.
    #[serde(default)]
    pub calibration: Option<Vec<IsotonicCurve>>,
}

impl Ensemble {
    pub fn check_consistency(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.members.is_empty() {
            return Err("ensemble has no members".into());
        }
        for (index, member) in self.members.iter().enumerate() {
            member
                .check_consistency(n_features, n_classes)
                .map_err(|reason| format!("member {}: {}", index, reason))?;
        }
        if let Some(curves) = &self.calibration {
            if curves.len() != n_classes {
                return Err(format!(
                    "ensemble carries {} calibration curves for {} classes",
                    curves.len(),
                    n_classes
                ));
            }
        }
        Ok(())
    }

    pub fn predict_proba(&self, features: &[(usize, f64)]) -> Vec<f64> {
        let mut votes: Vec<f64> = Vec::new();
        for member in &self.members {
            let proba = member.predict_proba(features);
            if votes.is_empty() {
                votes = proba;
            } else {
                for (v, p) in votes.iter_mut().zip(proba) {
                    *v += p;
                }
            }
        }
        let count = self.members.len().max(1) as f64;
        for v in votes.iter_mut() {
            *v /= count;
        }

        if let Some(curves) = &self.calibration {
            for (v, curve) in votes.iter_mut().zip(curves) {
                *v = curve.apply(*v);
            }
            votes = normalize(&votes);
        }
        votes
    }
}

/// Classifier weights: the simple path is naive Bayes, the advanced path a
/// calibrated soft-voting ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classifier {
    NaiveBayes(MultinomialNb),
    Ensemble(Ensemble),
}

impl Classifier {
    /// Check every weight table against the vectorizer's feature space and
    /// the label set before the model is accepted for prediction.
    pub fn check_consistency(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        match self {
            Self::NaiveBayes(nb) => nb.check_consistency(n_features, n_classes),
            Self::Ensemble(ensemble) => ensemble.check_consistency(n_features, n_classes),
        }
    }

    pub fn predict_proba(&self, features: &[(usize, f64)]) -> Vec<f64> {
        match self {
            Self::NaiveBayes(nb) => nb.predict_proba(features),
            Self::Ensemble(ensemble) => ensemble.predict_proba(features),
        }
    }
}

/// Numerically stable softmax over log scores.
fn softmax(log_scores: &[f64]) -> Vec<f64> {
    let max = log_scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = log_scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    exp.iter().map(|&e| e / sum).collect()
}

fn normalize(values: &[f64]) -> Vec<f64> {
    let sum: f64 = values.iter().sum();
    if sum <= 0.0 {
        let uniform = 1.0 / values.len().max(1) as f64;
        return vec![uniform; values.len()];
    }
    values.iter().map(|&v| v / sum).collect()
}
