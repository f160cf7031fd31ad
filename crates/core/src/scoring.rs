//! Failure-probability scorers.
//!
//! A [`Scorer`] turns the five readings of a sample into a failure
//! probability. Two implementations exist: [`LogisticModel`], a trained
//! model loaded from a JSON file at startup, and [`FallbackScorer`], which
//! returns a uniform random value in `[0, 0.3]`. [`select_scorer`] picks one
//! once at process start.

use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use serde::Deserialize;

/// Number of features every scorer receives.
pub const FEATURE_COUNT: usize = 5;

/// Feature order expected by scorers.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "air_temperature",
    "process_temperature",
    "rotational_speed",
    "torque",
    "tool_wear",
];

/// Upper bound of the fallback probability range.
pub const FALLBACK_MAX_PROBABILITY: f64 = 0.3;

/// Errors raised while loading or evaluating a scorer.
#[derive(Debug, thiserror::Error)]
pub enum ScorerError {
    #[error("Failed to read model file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse model file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Evaluation failed: {0}")]
    Evaluation(String),
}

/// Capability that estimates a failure probability from one reading.
///
/// Implementations must be cheap to call from many workers concurrently.
pub trait Scorer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this is the uniform-random fallback. The estimator skips its
    /// timeout machinery for fallback scorers.
    fn is_fallback(&self) -> bool {
        false
    }

    /// Score a feature vector ordered as [`FEATURE_NAMES`].
    fn predict(&self, features: &[f64; FEATURE_COUNT]) -> Result<f64, ScorerError>;
}

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

/// Uniform random probability in `[0, FALLBACK_MAX_PROBABILITY]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackScorer;

impl FallbackScorer {
    /// Draw a fallback probability.
    pub fn draw() -> f64 {
        rand::rng().random_range(0.0..=FALLBACK_MAX_PROBABILITY)
    }
}

impl Scorer for FallbackScorer {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn is_fallback(&self) -> bool {
        true
    }

    fn predict(&self, _features: &[f64; FEATURE_COUNT]) -> Result<f64, ScorerError> {
        Ok(Self::draw())
    }
}

// ---------------------------------------------------------------------------
// Logistic model
// ---------------------------------------------------------------------------

/// On-disk model format.
///
/// ```json
/// { "weights": [0.01, 0.02, -0.001, 0.05, 0.3], "intercept": -12.0,
///   "means": [300, 600, 1500, 30, 10], "scales": [2, 60, 400, 10, 8] }
/// ```
///
/// `means`/`scales` are optional; when present each feature is
/// standardised as `(x - mean) / scale` before the linear term.
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticModel {
    pub weights: Vec<f64>,
    pub intercept: f64,
    #[serde(default)]
    pub means: Option<Vec<f64>>,
    #[serde(default)]
    pub scales: Option<Vec<f64>>,
}

impl LogisticModel {
    /// Load and validate a model from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ScorerError> {
        let raw = std::fs::read_to_string(path)?;
        let model: LogisticModel = serde_json::from_str(&raw)?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), ScorerError> {
        if self.weights.len() != FEATURE_COUNT {
            return Err(ScorerError::InvalidModel(format!(
                "expected {FEATURE_COUNT} weights, got {}",
                self.weights.len()
            )));
        }
        for (label, v) in [("means", &self.means), ("scales", &self.scales)] {
            if let Some(v) = v {
                if v.len() != FEATURE_COUNT {
                    return Err(ScorerError::InvalidModel(format!(
                        "expected {FEATURE_COUNT} {label}, got {}",
                        v.len()
                    )));
                }
            }
        }
        if let Some(scales) = &self.scales {
            if scales.iter().any(|s| *s == 0.0 || !s.is_finite()) {
                return Err(ScorerError::InvalidModel(
                    "scales must be finite and non-zero".to_string(),
                ));
            }
        }
        if !self.intercept.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err(ScorerError::InvalidModel(
                "weights and intercept must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

impl Scorer for LogisticModel {
    fn name(&self) -> &'static str {
        "logistic"
    }

    fn predict(&self, features: &[f64; FEATURE_COUNT]) -> Result<f64, ScorerError> {
        let mut z = self.intercept;
        for (i, x) in features.iter().enumerate() {
            if !x.is_finite() {
                return Err(ScorerError::Evaluation(format!(
                    "feature {} is not finite",
                    FEATURE_NAMES[i]
                )));
            }
            let mean = self.means.as_ref().map_or(0.0, |m| m[i]);
            let scale = self.scales.as_ref().map_or(1.0, |s| s[i]);
            z += self.weights[i] * (x - mean) / scale;
        }
        let p = 1.0 / (1.0 + (-z).exp());
        if p.is_finite() {
            Ok(p)
        } else {
            Err(ScorerError::Evaluation(format!("non-finite output for z = {z}")))
        }
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Pick the process-wide scorer.
///
/// Loads a [`LogisticModel`] from `model_path` when given; a missing or
/// invalid file yields the [`FallbackScorer`] along with the load error so
/// the caller can log it.
pub fn select_scorer(model_path: Option<&Path>) -> (Arc<dyn Scorer>, Option<ScorerError>) {
    match model_path {
        None => (Arc::new(FallbackScorer), None),
        Some(path) => match LogisticModel::load(path) {
            Ok(model) => (Arc::new(model), None),
            Err(e) => (Arc::new(FallbackScorer), Some(e)),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn model_file(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(body.as_bytes()).expect("write model");
        file
    }

    #[test]
    fn fallback_stays_in_range() {
        let scorer = FallbackScorer;
        for _ in 0..1000 {
            let p = scorer.predict(&[0.0; FEATURE_COUNT]).unwrap();
            assert!((0.0..=FALLBACK_MAX_PROBABILITY).contains(&p));
        }
        assert!(scorer.is_fallback());
    }

    #[test]
    fn logistic_model_is_monotone_in_positive_weights() {
        let model = LogisticModel {
            weights: vec![0.0, 0.0, 0.0, 0.0, 1.0],
            intercept: -5.0,
            means: None,
            scales: None,
        };
        let low = model.predict(&[300.0, 600.0, 1500.0, 30.0, 0.0]).unwrap();
        let high = model.predict(&[300.0, 600.0, 1500.0, 30.0, 10.0]).unwrap();
        assert!(low < 0.01);
        assert!(high > 0.99);
        assert!(!model.is_fallback());
    }

    #[test]
    fn logistic_model_standardises_features() {
        let model = LogisticModel {
            weights: vec![1.0, 0.0, 0.0, 0.0, 0.0],
            intercept: 0.0,
            means: Some(vec![300.0, 0.0, 0.0, 0.0, 0.0]),
            scales: Some(vec![2.0, 1.0, 1.0, 1.0, 1.0]),
        };
        let p = model.predict(&[300.0, 1.0, 1.0, 1.0, 1.0]).unwrap();
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn non_finite_features_are_evaluation_errors() {
        let model = LogisticModel {
            weights: vec![1.0; FEATURE_COUNT],
            intercept: 0.0,
            means: None,
            scales: None,
        };
        let err = model.predict(&[f64::NAN, 0.0, 0.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, ScorerError::Evaluation(_)));
    }

    #[test]
    fn load_accepts_a_valid_file() {
        let file = model_file(r#"{"weights":[0.1,0.2,0.0,0.3,0.4],"intercept":-1.5}"#);
        let model = LogisticModel::load(file.path()).unwrap();
        assert_eq!(model.weights.len(), FEATURE_COUNT);
    }

    #[test]
    fn load_rejects_wrong_arity_and_zero_scales() {
        let file = model_file(r#"{"weights":[0.1,0.2],"intercept":0}"#);
        assert!(matches!(
            LogisticModel::load(file.path()),
            Err(ScorerError::InvalidModel(_))
        ));

        let file = model_file(
            r#"{"weights":[1,1,1,1,1],"intercept":0,"scales":[1,0,1,1,1]}"#,
        );
        assert!(matches!(
            LogisticModel::load(file.path()),
            Err(ScorerError::InvalidModel(_))
        ));
    }

    #[test]
    fn select_scorer_falls_back_when_the_file_is_missing() {
        let (scorer, err) = select_scorer(Some(Path::new("/nonexistent/model.json")));
        assert!(scorer.is_fallback());
        assert!(matches!(err, Some(ScorerError::Io(_))));

        let (scorer, err) = select_scorer(None);
        assert!(scorer.is_fallback());
        assert!(err.is_none());
    }

    #[test]
    fn select_scorer_loads_a_model() {
        let file = model_file(r#"{"weights":[0,0,0,0,0],"intercept":0}"#);
        let (scorer, err) = select_scorer(Some(file.path()));
        assert!(err.is_none());
        assert_eq!(scorer.name(), "logistic");
    }
}
