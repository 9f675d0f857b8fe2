use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::features::FeatureVector;

pub const DEFAULT_PRECISION: u32 = 2;

/// A pre-trained regression model. Read-only once loaded.
pub trait RegressionModel: Send + Sync + Debug {
    /// Input columns the model was trained on, in order.
    fn feature_names(&self) -> &[String];

    /// Raw prediction for inputs laid out as `feature_names()`.
    fn predict(&self, features: &[f64]) -> f64;
}

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("Failed to read model artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse model artifact {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Model declares {features} features but {coefficients} coefficients")]
    Shape { features: usize, coefficients: usize },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictError {
    #[error(
        "Feature vector does not match the model contract: expected [{}], got [{}]",
        .expected.join(", "),
        .actual.join(", ")
    )]
    FeatureMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },
    #[error("Model produced a non-finite prediction ({0})")]
    NonFinite(f64),
}

/// Linear regression artifact:
///
/// ```json
/// { "name": "...", "features": ["..."], "intercept": 0.0, "coefficients": [0.0] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    #[serde(default)]
    pub name: String,
    pub features: Vec<String>,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    pub fn new(
        features: Vec<String>,
        intercept: f64,
        coefficients: Vec<f64>,
    ) -> Result<Self, ModelLoadError> {
        let model = Self { name: String::new(), features, intercept, coefficients };
        model.check_shape()?;
        Ok(model)
    }

    /// Read the artifact once; the caller keeps the result for the process lifetime.
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        let contents = fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let model: LinearModel = serde_json::from_str(&contents).map_err(|source| {
            ModelLoadError::Json { path: path.to_path_buf(), source }
        })?;
        model.check_shape()?;

        tracing::info!(
            path = %path.display(),
            name = %model.name,
            features = model.features.len(),
            "loaded regression model"
        );
        Ok(model)
    }

    fn check_shape(&self) -> Result<(), ModelLoadError> {
        if self.features.len() != self.coefficients.len() {
            return Err(ModelLoadError::Shape {
                features: self.features.len(),
                coefficients: self.coefficients.len(),
            });
        }
        Ok(())
    }
}

impl RegressionModel for LinearModel {
    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn predict(&self, features: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(features)
            .fold(self.intercept, |acc, (w, x)| acc + w * x)
    }
}

/// Checks feature vectors against the model contract and rounds predictions.
#[derive(Debug, Clone)]
pub struct PredictionService {
    model: Arc<dyn RegressionModel>,
    precision: u32,
}

impl PredictionService {
    /// `precision` is the number of decimals kept, clamped to 1..=2.
    pub fn new(model: Arc<dyn RegressionModel>, precision: u32) -> Self {
        Self { model, precision: precision.clamp(1, 2) }
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn predict(&self, vector: &FeatureVector) -> Result<f64, PredictError> {
        let expected = self.model.feature_names();
        let matches = vector.names().count() == expected.len()
            && vector.names().zip(expected).all(|(actual, expected)| actual == expected.as_str());

        if !matches {
            return Err(PredictError::FeatureMismatch {
                expected: expected.to_vec(),
                actual: vector.names().map(str::to_string).collect(),
            });
        }

        let raw = self.model.predict(&vector.values());
        if !raw.is_finite() {
            return Err(PredictError::NonFinite(raw));
        }

        Ok(round_to(raw, self.precision))
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}
