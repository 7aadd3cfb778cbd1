use nalgebra::SVector;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::features::{FEATURE_COUNT, FEATURE_NAMES};

type Vector = SVector<f64, FEATURE_COUNT>;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model artifact not found at {0}; train and export it first")]
    NotFound(PathBuf),

    #[error("failed to read model artifact {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed model artifact {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("feature order mismatch at position {position}: extractor has {expected:?}, artifact has {found:?}")]
    FeatureOrder {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("{field} has {found} values, expected {expected}")]
    Dimension {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid calibration curve: {0}")]
    Calibration(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Probability-of-malicious capability. Implementations must be safe to call
/// concurrently.
pub trait Classifier: Send + Sync {
    fn predict_probability(&self, features: &[f64; FEATURE_COUNT]) -> Result<f64, ModelError>;

    fn version(&self) -> &str {
        "unknown"
    }
}

/// Companion document written next to the model at training time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureSpec {
    pub feature_names: Vec<String>,
}

impl FeatureSpec {
    pub fn current() -> Self {
        Self {
            feature_names: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        read_json(path)
    }

    /// Byte-for-byte comparison against the extractor's order.
    pub fn verify(&self) -> Result<(), ModelError> {
        if self.feature_names.len() != FEATURE_COUNT {
            return Err(ModelError::Dimension {
                field: "feature_names",
                expected: FEATURE_COUNT,
                found: self.feature_names.len(),
            });
        }
        for (position, (expected, found)) in FEATURE_NAMES.iter().zip(&self.feature_names).enumerate() {
            if expected.as_bytes() != found.as_bytes() {
                return Err(ModelError::FeatureOrder {
                    position,
                    expected: expected.to_string(),
                    found: found.clone(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerWeights {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Isotonic calibration curve: monotone breakpoints, linear in between,
/// flat beyond the ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationCurve {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl CalibrationCurve {
    fn validate(&self) -> Result<(), ModelError> {
        if self.x.is_empty() || self.x.len() != self.y.len() {
            return Err(ModelError::Calibration(format!(
                "x has {} points, y has {}",
                self.x.len(),
                self.y.len()
            )));
        }
        if self.x.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(ModelError::Calibration("x must be non-decreasing".to_string()));
        }
        if self.x.iter().chain(&self.y).any(|v| !v.is_finite()) {
            return Err(ModelError::Calibration("non-finite breakpoint".to_string()));
        }
        Ok(())
    }

    /// Non-finite input is passed through for the caller to reject.
    pub fn apply(&self, p: f64) -> f64 {
        let Some(last) = self.x.len().min(self.y.len()).checked_sub(1) else {
            return p;
        };
        if !p.is_finite() {
            return p;
        }
        if p <= self.x[0] {
            return self.y[0];
        }
        if p >= self.x[last] {
            return self.y[last];
        }
        let upper = self.x[..=last].partition_point(|&x| x <= p).clamp(1, last);
        let lower = upper - 1;
        let (x0, x1) = (self.x[lower], self.x[upper]);
        let (y0, y1) = (self.y[lower], self.y[upper]);
        if x1 == x0 {
            return y1;
        }
        y0 + (p - x0) * (y1 - y0) / (x1 - x0)
    }
}

/// On-disk form of `LinearModel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModelArtifact {
    pub version: String,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub scaler: Option<ScalerWeights>,
    #[serde(default)]
    pub calibration: Option<CalibrationCurve>,
}

/// Standardized logistic regression with optional isotonic calibration.
#[derive(Debug, Clone)]
pub struct LinearModel {
    version: String,
    intercept: f64,
    coefficients: Vector,
    mean: Vector,
    scale: Vector,
    calibration: Option<CalibrationCurve>,
}

impl LinearModel {
    /// Loads the model and its feature spec, refusing anything that does not
    /// line up with the extractor.
    pub fn load(model_path: &Path, feature_spec_path: &Path) -> Result<Self, ModelError> {
        let spec = FeatureSpec::load(feature_spec_path)?;
        spec.verify()?;

        let artifact: LinearModelArtifact = read_json(model_path)?;
        let model = Self::from_artifact(artifact)?;
        info!(
            "Loaded classifier {} from {}",
            model.version,
            model_path.display()
        );
        Ok(model)
    }

    pub fn from_artifact(artifact: LinearModelArtifact) -> Result<Self, ModelError> {
        let coefficients = to_vector("coefficients", &artifact.coefficients)?;
        let (mean, scale) = match &artifact.scaler {
            Some(scaler) => (
                to_vector("scaler.mean", &scaler.mean)?,
                to_vector("scaler.scale", &scaler.scale)?,
            ),
            None => (Vector::zeros(), Vector::repeat(1.0)),
        };
        if let Some(curve) = &artifact.calibration {
            curve.validate()?;
        }
        // Zero-variance columns are left unscaled, as the scaler does.
        let scale = scale.map(|s| if s == 0.0 || !s.is_finite() { 1.0 } else { s });

        debug!(version = %artifact.version, calibrated = artifact.calibration.is_some(), "classifier ready");
        Ok(Self {
            version: artifact.version,
            intercept: artifact.intercept,
            coefficients,
            mean,
            scale,
            calibration: artifact.calibration,
        })
    }

    fn raw_probability(&self, features: &[f64; FEATURE_COUNT]) -> f64 {
        let x = Vector::from_column_slice(features);
        let standardized = (x - self.mean).component_div(&self.scale);
        let z = self.coefficients.dot(&standardized) + self.intercept;
        sigmoid(z)
    }
}

impl Classifier for LinearModel {
    fn predict_probability(&self, features: &[f64; FEATURE_COUNT]) -> Result<f64, ModelError> {
        if let Some(position) = features.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::Inference(format!(
                "feature {} is not finite",
                FEATURE_NAMES[position]
            )));
        }

        let p = self.raw_probability(features);
        let p = match &self.calibration {
            Some(curve) => curve.apply(p),
            None => p,
        };

        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(ModelError::Inference(format!("probability {p} outside [0, 1]")));
        }
        Ok(p)
    }

    fn version(&self) -> &str {
        &self.version
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn to_vector(field: &'static str, values: &[f64]) -> Result<Vector, ModelError> {
    if values.len() != FEATURE_COUNT {
        return Err(ModelError::Dimension {
            field,
            expected: FEATURE_COUNT,
            found: values.len(),
        });
    }
    Ok(Vector::from_column_slice(values))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ModelError::NotFound(path.to_path_buf())
        } else {
            ModelError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    serde_json::from_str(&content).map_err(|source| ModelError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn artifact() -> LinearModelArtifact {
        LinearModelArtifact {
            version: "test-1".to_string(),
            intercept: 0.0,
            coefficients: vec![0.0; FEATURE_COUNT],
            scaler: None,
            calibration: None,
        }
    }

    fn write_artifacts(artifact: &LinearModelArtifact, spec: &FeatureSpec) -> (TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.json");
        let spec_path = dir.path().join("feature_spec.json");
        std::fs::write(&model_path, serde_json::to_string(artifact).unwrap()).unwrap();
        std::fs::write(&spec_path, serde_json::to_string(spec).unwrap()).unwrap();
        (dir, model_path, spec_path)
    }

    #[test]
    fn test_zero_model_predicts_one_half() {
        let model = LinearModel::from_artifact(artifact()).unwrap();
        let p = model.predict_probability(&[3.0; FEATURE_COUNT]).unwrap();
        assert!((p - 0.5).abs() < 1e-12);
        assert_eq!(model.version(), "test-1");
    }

    #[test]
    fn test_standardization_and_sign() {
        let mut a = artifact();
        a.coefficients[8] = 4.0; // has_ip_host
        a.scaler = Some(ScalerWeights {
            mean: vec![0.5; FEATURE_COUNT],
            scale: vec![0.5; FEATURE_COUNT],
        });
        let model = LinearModel::from_artifact(a).unwrap();

        let mut ip = [0.0; FEATURE_COUNT];
        ip[8] = 1.0;
        let high = model.predict_probability(&ip).unwrap();
        let low = model.predict_probability(&[0.0; FEATURE_COUNT]).unwrap();
        assert!((high - sigmoid(4.0)).abs() < 1e-12);
        assert!((low - sigmoid(-4.0)).abs() < 1e-12);
    }

    #[test]
    fn test_zero_scale_is_ignored() {
        let mut a = artifact();
        a.coefficients[0] = 1.0;
        a.scaler = Some(ScalerWeights {
            mean: vec![0.0; FEATURE_COUNT],
            scale: vec![0.0; FEATURE_COUNT],
        });
        let model = LinearModel::from_artifact(a).unwrap();
        let p = model.predict_probability(&[0.0; FEATURE_COUNT]).unwrap();
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_calibration_curve() {
        let curve = CalibrationCurve {
            x: vec![0.2, 0.4, 0.8],
            y: vec![0.0, 0.5, 1.0],
        };
        assert_eq!(curve.apply(0.1), 0.0);
        assert_eq!(curve.apply(0.9), 1.0);
        assert!((curve.apply(0.3) - 0.25).abs() < 1e-12);
        assert!((curve.apply(0.6) - 0.75).abs() < 1e-12);
        assert_eq!(curve.apply(0.4), 0.5);

        let mut a = artifact();
        a.calibration = Some(curve);
        let model = LinearModel::from_artifact(a).unwrap();
        let p = model.predict_probability(&[0.0; FEATURE_COUNT]).unwrap();
        assert!((p - 0.625).abs() < 1e-12);
    }

    #[test]
    fn test_calibration_passes_nan_through() {
        let curve = CalibrationCurve {
            x: vec![0.2, 0.4, 0.8],
            y: vec![0.0, 0.5, 1.0],
        };
        assert!(curve.apply(f64::NAN).is_nan());

        let empty = CalibrationCurve { x: vec![], y: vec![] };
        assert_eq!(empty.apply(0.3), 0.3);
    }

    #[test]
    fn test_overflowing_model_is_an_inference_error() {
        let mut a = artifact();
        a.coefficients = vec![1e308; FEATURE_COUNT];
        a.calibration = Some(CalibrationCurve {
            x: vec![0.0, 1.0],
            y: vec![0.0, 1.0],
        });
        let model = LinearModel::from_artifact(a).unwrap();

        let mut features = [0.0; FEATURE_COUNT];
        features[0] = 1e300;
        features[1] = -1e300;
        assert!(matches!(
            model.predict_probability(&features),
            Err(ModelError::Inference(_))
        ));
    }

    #[test]
    fn test_rejects_bad_dimensions_and_curves() {
        let mut a = artifact();
        a.coefficients.pop();
        assert!(matches!(
            LinearModel::from_artifact(a),
            Err(ModelError::Dimension { field: "coefficients", .. })
        ));

        let mut a = artifact();
        a.calibration = Some(CalibrationCurve {
            x: vec![0.5, 0.1],
            y: vec![0.0, 1.0],
        });
        assert!(matches!(
            LinearModel::from_artifact(a),
            Err(ModelError::Calibration(_))
        ));
    }

    #[test]
    fn test_non_finite_features_fail_inference() {
        let model = LinearModel::from_artifact(artifact()).unwrap();
        let mut features = [0.0; FEATURE_COUNT];
        features[14] = f64::NAN;
        let err = model.predict_probability(&features).unwrap_err();
        assert!(err.to_string().contains("host_entropy"));
    }

    #[test]
    fn test_load_round_trip() {
        let (_dir, model_path, spec_path) = write_artifacts(&artifact(), &FeatureSpec::current());
        let model = LinearModel::load(&model_path, &spec_path).unwrap();
        assert_eq!(model.version(), "test-1");
    }

    #[test]
    fn test_missing_model_fails_fast() {
        let (dir, _model_path, spec_path) = write_artifacts(&artifact(), &FeatureSpec::current());
        let err = LinearModel::load(&dir.path().join("absent.json"), &spec_path).unwrap_err();
        assert!(matches!(err, ModelError::NotFound(_)));
    }

    #[test]
    fn test_reordered_feature_spec_rejected() {
        let mut spec = FeatureSpec::current();
        spec.feature_names.swap(0, 1);
        let (_dir, model_path, spec_path) = write_artifacts(&artifact(), &spec);
        match LinearModel::load(&model_path, &spec_path) {
            Err(ModelError::FeatureOrder { position, expected, found }) => {
                assert_eq!(position, 0);
                assert_eq!(expected, "url_len");
                assert_eq!(found, "host_len");
            }
            other => panic!("expected feature order error, got {other:?}"),
        }
    }

    #[test]
    fn test_short_feature_spec_rejected() {
        let mut spec = FeatureSpec::current();
        spec.feature_names.pop();
        assert!(matches!(spec.verify(), Err(ModelError::Dimension { .. })));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let spec_path = dir.path().join("feature_spec.json");
        std::fs::write(&spec_path, "{not json").unwrap();
        assert!(matches!(
            FeatureSpec::load(&spec_path),
            Err(ModelError::Malformed { .. })
        ));
    }

    #[test]
    fn test_shipped_artifacts_load() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("ml/artifacts");
        let model = LinearModel::load(&dir.join("model.json"), &dir.join("feature_spec.json"))
            .expect("shipped artifacts are consistent");
        assert_eq!(model.version(), "logreg-2024.06-iso");

        let p = model.predict_probability(&[0.0; FEATURE_COUNT]).unwrap();
        assert!((0.0..=1.0).contains(&p));
    }
}
