//! Request-level result records returned by the validation and scoring flows

use crate::types::transaction::NormalizedTransaction;
use serde::{Deserialize, Serialize};

/// A single field-level validation violation.
///
/// `field` is a dotted path into the request envelope
/// (e.g. `transaction.currency`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Outcome of the validation flow for one request envelope.
///
/// `normalized_transaction` is populated iff `is_valid` is true; a record is
/// never returned alongside errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Caller-supplied request id, or a generated one
    pub request_id: String,

    /// True iff zero validation errors were produced
    pub is_valid: bool,

    /// Canonical record, present only for valid requests
    pub normalized_transaction: Option<NormalizedTransaction>,

    /// All detected violations, empty for valid requests
    pub validation_errors: Vec<FieldError>,
}

impl ValidationReport {
    /// Build a failed report carrying the given errors.
    pub fn invalid(request_id: String, validation_errors: Vec<FieldError>) -> Self {
        Self {
            request_id,
            is_valid: false,
            normalized_transaction: None,
            validation_errors,
        }
    }
}

/// Outcome of the scoring flow for one request envelope.
///
/// `error` being set implies the probability, label, and (for envelope-level
/// failures) artifact fields are null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Caller-supplied request id, or a generated one
    pub request_id: String,

    /// Fraud probability rounded to 6 decimal digits
    pub fraud_probability: Option<f64>,

    /// Binary fraud label (1 = fraud)
    pub fraud_label: Option<u8>,

    /// Version string of the artifact that produced the score
    pub model_version: Option<String>,

    /// Decision threshold the label was derived from
    pub decision_threshold: Option<f64>,

    /// Error description when the request could not be scored
    pub error: Option<String>,
}

impl ScoreResult {
    /// Build a successful score.
    pub fn scored(
        request_id: String,
        fraud_probability: f64,
        fraud_label: u8,
        model_version: String,
        decision_threshold: f64,
    ) -> Self {
        Self {
            request_id,
            fraud_probability: Some(fraud_probability),
            fraud_label: Some(fraud_label),
            model_version: Some(model_version),
            decision_threshold: Some(decision_threshold),
            error: None,
        }
    }

    /// Build a failed score. Artifact fields are passed through so a
    /// configuration-level failure still reports which model rejected it.
    pub fn failed(
        request_id: String,
        model_version: Option<String>,
        decision_threshold: Option<f64>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            request_id,
            fraud_probability: None,
            fraud_label: None,
            model_version,
            decision_threshold,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error_serialization() {
        let err = FieldError::new("transaction.amount", "amount must be > 0");

        let json = serde_json::to_string(&err).unwrap();
        let deserialized: FieldError = serde_json::from_str(&json).unwrap();

        assert_eq!(err, deserialized);
        assert!(json.contains("transaction.amount"));
    }

    #[test]
    fn test_failed_score_has_null_numeric_fields() {
        let result = ScoreResult::failed(
            "req_1".to_string(),
            Some("v1".to_string()),
            Some(0.5),
            "Feature length mismatch: got 3 expected 5",
        );

        assert!(result.fraud_probability.is_none());
        assert!(result.fraud_label.is_none());
        assert_eq!(result.model_version.as_deref(), Some("v1"));
        assert!(result.error.is_some());
    }

    #[test]
    fn test_score_result_serialization() {
        let result =
            ScoreResult::scored("req_1".to_string(), 0.276878, 0, "v1".to_string(), 0.5);

        let json = serde_json::to_string(&result).unwrap();
        let deserialized: ScoreResult = serde_json::from_str(&json).unwrap();

        assert_eq!(result.request_id, deserialized.request_id);
        assert_eq!(result.fraud_probability, deserialized.fraud_probability);
        assert_eq!(result.fraud_label, Some(0));
        assert!(json.contains("\"error\":null"));
    }

    #[test]
    fn test_invalid_report_never_carries_a_record() {
        let report = ValidationReport::invalid(
            "req_1".to_string(),
            vec![FieldError::new("transaction", "Missing required field: transaction")],
        );

        assert!(!report.is_valid);
        assert!(report.normalized_transaction.is_none());
        assert_eq!(report.validation_errors.len(), 1);
    }
}
