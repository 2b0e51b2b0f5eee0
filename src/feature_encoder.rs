//! Feature encoding for linear-model scoring.
//!
//! This module reproduces, at serving time, the exact numeric transformation
//! the training pipeline applied: standardized numeric features followed by
//! one-hot categorical blocks, in the order declared by the artifact.

use crate::model::artifact::ScoringParameters;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Encoder that maps a transaction field map into the model's input vector.
///
/// Encoding is pure and total: missing or malformed fields default rather
/// than fail, mirroring unknown-value handling at training time.
pub struct FeatureEncoder {
    params: Arc<ScoringParameters>,
}

impl FeatureEncoder {
    pub fn new(params: Arc<ScoringParameters>) -> Self {
        Self { params }
    }

    /// Encode a transaction into the fixed-length feature vector.
    ///
    /// Layout is the numeric block first, then one block per categorical
    /// feature in declared order; this must match the coefficient order.
    pub fn encode(&self, txn: &Map<String, Value>) -> Vec<f64> {
        let params = &self.params;
        let mut vector = Vec::with_capacity(self.feature_width());

        for (i, name) in params.numeric_features.iter().enumerate() {
            let raw = txn.get(name).map(coerce_float).unwrap_or(0.0);
            vector.push(standardize(
                raw,
                params.numeric_scaler.mean[i],
                params.numeric_scaler.scale[i],
            ));
        }

        for name in &params.categorical_features {
            let normalized = txn.get(name).map(|value| normalize_category(name, value));
            let vocabulary = params
                .one_hot_categories
                .get(name)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            for entry in vocabulary {
                let hit = normalized.as_ref() == Some(entry);
                vector.push(if hit { 1.0 } else { 0.0 });
            }
        }

        vector
    }

    /// Total number of features produced.
    pub fn feature_width(&self) -> usize {
        self.params.encoded_width()
    }

    /// Position-aligned names for the encoded vector, categorical slots
    /// rendered as `feature=category`.
    pub fn feature_names(&self) -> Vec<String> {
        let params = &self.params;
        let mut names: Vec<String> = params.numeric_features.clone();

        for feature in &params.categorical_features {
            let vocabulary = params
                .one_hot_categories
                .get(feature)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            for entry in vocabulary {
                let label = match entry {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                names.push(format!("{feature}={label}"));
            }
        }

        names
    }
}

/// Coerce a JSON value to a float the way the trainer did: numbers pass
/// through, booleans map to 1/0, numeric strings parse, everything else
/// defaults to 0.0.
fn coerce_float(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// `(x - mean) / scale`, with a zero scale (a degenerate training feature)
/// contributing 0.0 instead of dividing by zero.
fn standardize(value: f64, mean: f64, scale: f64) -> f64 {
    if scale == 0.0 {
        0.0
    } else {
        (value - mean) / scale
    }
}

/// Apply the validation engine's casing to a textual categorical value so
/// one-hot lookup agrees with the vocabularies recorded at training time.
fn normalize_category(feature: &str, value: &Value) -> Value {
    match value {
        Value::String(s) => {
            let cased = if feature == "currency" || feature == "country" {
                s.trim().to_uppercase()
            } else {
                s.trim().to_lowercase()
            };
            Value::String(cased)
        }
        other => other.clone(),
    }
}
