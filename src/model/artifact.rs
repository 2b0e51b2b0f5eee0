//! Scoring-parameter artifact: schema, loading, and process-wide cache.
//!
//! The artifact is the JSON bundle exported by the training pipeline. It is
//! loaded once, checked for internal consistency, and shared read-only for
//! the rest of the process lifetime.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Standardization constants for the numeric block, aligned index-for-index
/// with `numeric_features`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Trained linear-model weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

/// Immutable bundle of everything the encoder and scorer need to reproduce
/// the training-time transformation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringParameters {
    pub model_version: String,
    pub decision_threshold: f64,

    /// Export timestamp written by the trainer; informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at_utc: Option<String>,

    /// Numeric feature names; order fixes positions in the numeric block
    pub numeric_features: Vec<String>,

    /// Categorical feature names; order fixes one-hot block order
    pub categorical_features: Vec<String>,

    pub numeric_scaler: NumericScaler,

    /// Vocabulary per categorical feature; entry order fixes bit positions.
    /// Entries may be strings or booleans.
    pub one_hot_categories: HashMap<String, Vec<Value>>,

    pub logistic_regression: LogisticRegression,
}

impl ScoringParameters {
    /// Total width of an encoded feature vector: the numeric block plus one
    /// slot per vocabulary entry of each categorical feature.
    pub fn encoded_width(&self) -> usize {
        let categorical_width: usize = self
            .categorical_features
            .iter()
            .map(|name| {
                self.one_hot_categories
                    .get(name)
                    .map(Vec::len)
                    .unwrap_or(0)
            })
            .sum();
        self.numeric_features.len() + categorical_width
    }

    /// Check the structural invariants the encoder and scorer rely on.
    /// A violation is a configuration error, never a request error.
    pub fn check_consistency(&self) -> Result<(), ArtifactError> {
        let features = self.numeric_features.len();
        let mean = self.numeric_scaler.mean.len();
        let scale = self.numeric_scaler.scale.len();
        if mean != features || scale != features {
            return Err(ArtifactError::ScalerShape {
                features,
                mean,
                scale,
            });
        }

        let width = self.encoded_width();
        let coefficients = self.logistic_regression.coefficients.len();
        if coefficients != width {
            return Err(ArtifactError::CoefficientWidth {
                coefficients,
                width,
            });
        }

        Ok(())
    }
}

/// Reasons the artifact could not be obtained or used.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("scoring parameters not found at {0}")]
    NotFound(PathBuf),

    #[error("failed to read scoring parameters: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse scoring parameters: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("numeric scaler misaligned: {features} features, {mean} means, {scale} scales")]
    ScalerShape {
        features: usize,
        mean: usize,
        scale: usize,
    },

    #[error("coefficient count {coefficients} does not match encoded feature width {width}")]
    CoefficientWidth { coefficients: usize, width: usize },
}

/// Read and check an artifact from a filesystem path.
pub fn load_scoring_parameters<P: AsRef<Path>>(path: P) -> Result<ScoringParameters, ArtifactError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ArtifactError::NotFound(path.to_path_buf()));
    }

    let raw = fs::read_to_string(path)?;
    let params: ScoringParameters = serde_json::from_str(&raw)?;
    params.check_consistency()?;

    info!(
        model_version = %params.model_version,
        decision_threshold = params.decision_threshold,
        encoded_width = params.encoded_width(),
        path = %path.display(),
        "Scoring parameters loaded"
    );

    Ok(params)
}

/// Lazily-populated, process-lifetime holder for the artifact.
///
/// The cell is filled exactly once on first access; concurrent first access
/// is safe, and reads after initialization take no lock. The artifact is
/// never re-fetched while the process lives.
pub struct ArtifactCache {
    path: PathBuf,
    cell: OnceCell<Arc<ScoringParameters>>,
}

impl ArtifactCache {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            cell: OnceCell::new(),
        }
    }

    /// Load on first call, then return the cached handle.
    pub fn get(&self) -> Result<&Arc<ScoringParameters>, ArtifactError> {
        self.cell
            .get_or_try_init(|| load_scoring_parameters(&self.path).map(Arc::new))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    const SAMPLE_ARTIFACT: &str = r#"{
        "model_version": "fraud-lr-2026-01-10",
        "decision_threshold": 0.5,
        "exported_at_utc": "2026-01-10T08:30:00Z",
        "numeric_features": ["amount", "customer_age"],
        "categorical_features": ["channel", "is_international"],
        "numeric_scaler": {"mean": [100.0, 40.0], "scale": [50.0, 12.0]},
        "one_hot_categories": {
            "channel": ["online", "atm"],
            "is_international": [false, true]
        },
        "logistic_regression": {
            "coefficients": [0.02, 0.01, 0.3, -0.1, -0.2, 0.4],
            "intercept": -1.0
        }
    }"#;

    fn sample_params() -> ScoringParameters {
        serde_json::from_str(SAMPLE_ARTIFACT).unwrap()
    }

    #[test]
    fn test_artifact_deserialization() {
        let params = sample_params();

        assert_eq!(params.model_version, "fraud-lr-2026-01-10");
        assert_eq!(params.numeric_features.len(), 2);
        assert_eq!(params.one_hot_categories["channel"].len(), 2);
        assert_eq!(params.logistic_regression.intercept, -1.0);
    }

    #[test]
    fn test_encoded_width_counts_every_vocabulary_entry() {
        let params = sample_params();
        // 2 numeric + 2 channel + 2 is_international
        assert_eq!(params.encoded_width(), 6);
        assert!(params.check_consistency().is_ok());
    }

    #[test]
    fn test_coefficient_width_mismatch_rejected() {
        let mut params = sample_params();
        params.logistic_regression.coefficients.pop();

        match params.check_consistency() {
            Err(ArtifactError::CoefficientWidth {
                coefficients,
                width,
            }) => {
                assert_eq!(coefficients, 5);
                assert_eq!(width, 6);
            }
            other => panic!("expected coefficient width error, got {other:?}"),
        }
    }

    #[test]
    fn test_scaler_shape_mismatch_rejected() {
        let mut params = sample_params();
        params.numeric_scaler.mean.push(0.0);

        assert!(matches!(
            params.check_consistency(),
            Err(ArtifactError::ScalerShape { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let result = load_scoring_parameters("does/not/exist.json");
        assert!(matches!(result, Err(ArtifactError::NotFound(_))));
    }

    #[test]
    fn test_cache_loads_once_and_shares_the_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(SAMPLE_ARTIFACT.as_bytes()).unwrap();

        let cache = ArtifactCache::new(&path);
        let first = cache.get().unwrap().clone();
        let second = cache.get().unwrap().clone();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.model_version, "fraud-lr-2026-01-10");
    }

    #[test]
    fn test_cache_surfaces_unavailable_artifact() {
        let cache = ArtifactCache::new("missing/params.json");
        assert!(cache.get().is_err());
    }
}
