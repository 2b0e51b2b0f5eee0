//! Linear scoring engine for fraud probability.
//!
//! Applies the exported logistic-regression weights to an encoded feature
//! vector and derives the binary label from the artifact's decision
//! threshold.

use crate::config::ScoringPolicy;
use crate::feature_encoder::FeatureEncoder;
use crate::model::artifact::ScoringParameters;
use crate::types::report::ScoreResult;
use crate::validation;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Result of scoring one feature vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreOutcome {
    /// Unrounded fraud probability in (0, 1)
    pub probability: f64,
    /// 1 when probability >= the decision threshold
    pub label: u8,
}

/// Scoring failures. A length mismatch means the encoder and the artifact
/// disagree about the feature layout; it is surfaced to the caller rather
/// than scored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringError {
    #[error("Feature length mismatch: got {got} expected {expected}")]
    LengthMismatch { got: usize, expected: usize },
}

/// Scorer over a shared artifact handle.
pub struct LinearScorer {
    params: Arc<ScoringParameters>,
    encoder: FeatureEncoder,
    policy: ScoringPolicy,
}

impl LinearScorer {
    /// Create a scorer with the default lenient field policy.
    pub fn new(params: Arc<ScoringParameters>) -> Self {
        Self::with_policy(params, ScoringPolicy::default())
    }

    pub fn with_policy(params: Arc<ScoringParameters>, policy: ScoringPolicy) -> Self {
        let encoder = FeatureEncoder::new(params.clone());
        Self {
            params,
            encoder,
            policy,
        }
    }

    pub fn policy(&self) -> ScoringPolicy {
        self.policy
    }

    pub fn params(&self) -> &ScoringParameters {
        &self.params
    }

    /// Score an encoded feature vector against the model weights.
    pub fn score_vector(&self, vector: &[f64]) -> Result<ScoreOutcome, ScoringError> {
        let coefficients = &self.params.logistic_regression.coefficients;
        if vector.len() != coefficients.len() {
            return Err(ScoringError::LengthMismatch {
                got: vector.len(),
                expected: coefficients.len(),
            });
        }

        let logit = self.params.logistic_regression.intercept
            + coefficients
                .iter()
                .zip(vector)
                .map(|(w, x)| w * x)
                .sum::<f64>();

        let probability = sigmoid(logit);
        let label = u8::from(probability >= self.params.decision_threshold);

        debug!(logit, probability, label, "Vector scored");

        Ok(ScoreOutcome { probability, label })
    }

    /// Score a request envelope end to end.
    ///
    /// The lenient policy scores whatever transaction object is present,
    /// defaulting missing or malformed fields at encoding time. The strict
    /// policy runs full validation first and refuses to score an invalid
    /// transaction.
    pub fn score_request(&self, payload: &Value) -> ScoreResult {
        let request_id = validation::request_id_for(payload);

        let Some(txn) = payload.get("transaction").and_then(Value::as_object) else {
            return ScoreResult::failed(
                request_id,
                None,
                None,
                "Missing or invalid 'transaction' object",
            );
        };

        let normalized_fields: Map<String, Value>;
        let fields: &Map<String, Value> = match self.policy {
            ScoringPolicy::Lenient => txn,
            ScoringPolicy::Strict => {
                let report = validation::validate_request(payload);
                match report.normalized_transaction {
                    Some(record) => {
                        normalized_fields = record.to_field_map();
                        &normalized_fields
                    }
                    None => {
                        return ScoreResult::failed(
                            request_id,
                            Some(self.params.model_version.clone()),
                            Some(self.params.decision_threshold),
                            format!(
                                "Transaction failed validation: {} field error(s)",
                                report.validation_errors.len()
                            ),
                        );
                    }
                }
            }
        };

        let vector = self.encoder.encode(fields);
        match self.score_vector(&vector) {
            Ok(outcome) => ScoreResult::scored(
                request_id,
                round_probability(outcome.probability),
                outcome.label,
                self.params.model_version.clone(),
                self.params.decision_threshold,
            ),
            Err(e) => ScoreResult::failed(
                request_id,
                Some(self.params.model_version.clone()),
                Some(self.params.decision_threshold),
                e.to_string(),
            ),
        }
    }
}

/// Numerically stable logistic function: branches on sign so `exp` never
/// overflows for large-magnitude logits.
fn sigmoid(logit: f64) -> f64 {
    if logit >= 0.0 {
        1.0 / (1.0 + (-logit).exp())
    } else {
        let z = logit.exp();
        z / (1.0 + z)
    }
}

/// Round for presentation. Label decisions always use the unrounded value.
fn round_probability(probability: f64) -> f64 {
    (probability * 1e6).round() / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn amount_only_params() -> Arc<ScoringParameters> {
        Arc::new(
            serde_json::from_value(json!({
                "model_version": "fraud-lr-test",
                "decision_threshold": 0.5,
                "numeric_features": ["amount"],
                "categorical_features": [],
                "numeric_scaler": {"mean": [100.0], "scale": [50.0]},
                "one_hot_categories": {},
                "logistic_regression": {"coefficients": [0.02], "intercept": -1.0}
            }))
            .unwrap(),
        )
    }

    #[test]
    fn test_reference_score() {
        // amount=200 -> standardized 2.0 -> logit -0.96
        let scorer = LinearScorer::new(amount_only_params());
        let result = scorer.score_request(&json!({
            "request_id": "r1",
            "transaction": {"amount": 200}
        }));

        assert!(result.error.is_none());
        let probability = result.fraud_probability.unwrap();
        assert!((probability - 0.276878).abs() < 1e-4);
        assert_eq!(result.fraud_label, Some(0));
        assert_eq!(result.model_version.as_deref(), Some("fraud-lr-test"));
        assert_eq!(result.decision_threshold, Some(0.5));
    }

    #[test]
    fn test_sigmoid_is_stable_at_extreme_logits() {
        let high = sigmoid(1000.0);
        let low = sigmoid(-1000.0);

        assert!(high.is_finite() && low.is_finite());
        assert!((0.0..=1.0).contains(&high));
        assert!((0.0..=1.0).contains(&low));
        assert!((high - 1.0).abs() < 1e-12);
        assert!(low.abs() < 1e-12);

        // moderate logits stay strictly inside (0, 1)
        assert!(sigmoid(30.0) > 0.0 && sigmoid(30.0) < 1.0);
        assert!(sigmoid(-30.0) > 0.0 && sigmoid(-30.0) < 1.0);
    }

    #[test]
    fn test_length_mismatch_carries_both_lengths() {
        let scorer = LinearScorer::new(amount_only_params());

        let err = scorer.score_vector(&[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            ScoringError::LengthMismatch {
                got: 3,
                expected: 1
            }
        );
        assert_eq!(err.to_string(), "Feature length mismatch: got 3 expected 1");
    }

    #[test]
    fn test_missing_transaction_short_circuits() {
        let scorer = LinearScorer::new(amount_only_params());

        for payload in [json!({}), json!({"transaction": "nope"})] {
            let result = scorer.score_request(&payload);
            assert_eq!(
                result.error.as_deref(),
                Some("Missing or invalid 'transaction' object")
            );
            assert!(result.fraud_probability.is_none());
            assert!(result.fraud_label.is_none());
            assert!(result.model_version.is_none());
            assert!(result.decision_threshold.is_none());
        }
    }

    #[test]
    fn test_lenient_policy_scores_partial_transactions() {
        let scorer = LinearScorer::new(amount_only_params());

        // amount missing entirely: defaults to 0.0 -> standardized -2.0
        let result = scorer.score_request(&json!({"transaction": {}}));

        assert!(result.error.is_none());
        // logit = -1.0 + 0.02 * -2.0 = -1.04
        let expected = 1.0_f64 / (1.0 + 1.04_f64.exp());
        assert!((result.fraud_probability.unwrap() - expected).abs() < 1e-4);
    }

    #[test]
    fn test_strict_policy_rejects_invalid_transactions() {
        let scorer =
            LinearScorer::with_policy(amount_only_params(), ScoringPolicy::Strict);

        let result = scorer.score_request(&json!({"transaction": {"amount": 200}}));

        let error = result.error.unwrap();
        assert!(error.starts_with("Transaction failed validation:"));
        assert!(result.fraud_probability.is_none());
        assert_eq!(result.model_version.as_deref(), Some("fraud-lr-test"));
    }

    #[test]
    fn test_label_uses_unrounded_probability() {
        // threshold exactly at the sigmoid of logit 0
        let params: Arc<ScoringParameters> = Arc::new(
            serde_json::from_value(json!({
                "model_version": "t",
                "decision_threshold": 0.5,
                "numeric_features": ["amount"],
                "categorical_features": [],
                "numeric_scaler": {"mean": [0.0], "scale": [1.0]},
                "one_hot_categories": {},
                "logistic_regression": {"coefficients": [0.0], "intercept": 0.0}
            }))
            .unwrap(),
        );
        let scorer = LinearScorer::new(params);

        let outcome = scorer.score_vector(&[123.0]).unwrap();
        assert_eq!(outcome.probability, 0.5);
        assert_eq!(outcome.label, 1);
    }

    #[test]
    fn test_round_probability() {
        assert_eq!(round_probability(0.276_878_49), 0.276878);
        assert_eq!(round_probability(0.276_878_51), 0.276879);
    }
}
