use anyhow::anyhow;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{ForecastError, Result};
use super::FeatureVector;

/// Opaque fitted regression model, as handed over by the training side
pub trait Regressor: Send + Sync {
    fn name(&self) -> &str;

    /// Feature names in the order the model was fitted on
    fn feature_names(&self) -> &[String];

    fn predict_row(&self, row: &[f64]) -> anyhow::Result<f64>;
}

/// Feature vector in, one price out
#[cfg_attr(test, mockall::automock)]
pub trait StepPredictor: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<f64>;
}

/// Wraps a [`Regressor`] and enforces the feature contract on every call
#[derive(Clone)]
pub struct PredictorAdapter {
    model: Arc<dyn Regressor>,
}

impl PredictorAdapter {
    pub fn new(model: Arc<dyn Regressor>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Compare an expected name list (normally `FeatureConfig::feature_names`) with the model's
    pub fn check_contract(&self, names: &[String]) -> Result<()> {
        let expected = self.model.feature_names();
        if names.len() != expected.len() {
            return Err(ForecastError::FeatureContractMismatch(format!(
                "model '{}' expects {} features, got {}",
                self.model.name(),
                expected.len(),
                names.len()
            )));
        }
        if let Some((idx, (got, want))) = names
            .iter()
            .zip(expected.iter())
            .enumerate()
            .find(|(_, (got, want))| got != want)
        {
            return Err(ForecastError::FeatureContractMismatch(format!(
                "model '{}' expects '{}' at position {}, got '{}'",
                self.model.name(),
                want,
                idx,
                got
            )));
        }
        Ok(())
    }
}

impl StepPredictor for PredictorAdapter {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        self.check_contract(features.names())?;

        let value = self.model.predict_row(features.values()).map_err(|e| {
            ForecastError::PredictorUnavailable(format!("model '{}' failed: {:#}", self.model.name(), e))
        })?;

        if !value.is_finite() {
            return Err(ForecastError::PredictorUnavailable(format!(
                "model '{}' returned a non-finite prediction",
                self.model.name()
            )));
        }
        Ok(value)
    }
}

/// Persisted weights of a fitted linear model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelWeights {
    #[serde(default = "default_model_name")]
    pub name: String,
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Empty means the coefficients apply to raw values
    #[serde(default)]
    pub feature_means: Vec<f64>,
    #[serde(default)]
    pub feature_stds: Vec<f64>,
}

fn default_model_name() -> String {
    "linear_regression".to_string()
}

/// Linear regression over z-scored features
#[derive(Debug, Clone)]
pub struct LinearModel {
    weights: ModelWeights,
    coefficients: Array1<f64>,
    means: Array1<f64>,
    scales: Array1<f64>,
}

impl LinearModel {
    pub fn from_weights(weights: ModelWeights) -> Result<Self> {
        let width = weights.feature_names.len();
        let malformed = |what: &str, len: usize| {
            ForecastError::PredictorUnavailable(format!(
                "malformed artifact '{}': {} has {} entries for {} features",
                weights.name, what, len, width
            ))
        };

        if weights.coefficients.len() != width {
            return Err(malformed("coefficients", weights.coefficients.len()));
        }
        if !weights.feature_means.is_empty() && weights.feature_means.len() != width {
            return Err(malformed("feature_means", weights.feature_means.len()));
        }
        if weights.feature_stds.len() != weights.feature_means.len() {
            return Err(malformed("feature_stds", weights.feature_stds.len()));
        }

        let means = if weights.feature_means.is_empty() {
            Array1::zeros(width)
        } else {
            Array1::from(weights.feature_means.clone())
        };
        // constant features contribute nothing
        let scales = if weights.feature_stds.is_empty() {
            Array1::ones(width)
        } else {
            weights
                .feature_stds
                .iter()
                .map(|&std| if std > 1e-10 { 1.0 / std } else { 0.0 })
                .collect()
        };

        Ok(Self {
            coefficients: Array1::from(weights.coefficients.clone()),
            means,
            scales,
            weights,
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let weights: ModelWeights = serde_json::from_str(json)
            .map_err(|e| ForecastError::PredictorUnavailable(format!("malformed artifact: {}", e)))?;
        Self::from_weights(weights)
    }

    /// Load an artifact file; a missing file means no model is available
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ForecastError::PredictorUnavailable(format!(
                "missing trained model at {}",
                path.display()
            )));
        }
        let json = std::fs::read_to_string(path)?;
        let model = Self::from_json(&json)?;
        info!(
            "Loaded model '{}' ({} features) from {}",
            model.weights.name,
            model.weights.feature_names.len(),
            path.display()
        );
        Ok(model)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.weights)?)
    }

    pub fn weights(&self) -> &ModelWeights {
        &self.weights
    }
}

impl Regressor for LinearModel {
    fn name(&self) -> &str {
        &self.weights.name
    }

    fn feature_names(&self) -> &[String] {
        &self.weights.feature_names
    }

    fn predict_row(&self, row: &[f64]) -> anyhow::Result<f64> {
        if row.len() != self.coefficients.len() {
            return Err(anyhow!(
                "row has {} values, model has {} coefficients",
                row.len(),
                self.coefficients.len()
            ));
        }
        let x = Array1::from(row.to_vec());
        let z = (&x - &self.means) * &self.scales;
        let prediction = self.weights.intercept + self.coefficients.dot(&z);
        debug!("{} prediction: {:.4}", self.weights.name, prediction);
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn test_weights() -> ModelWeights {
        ModelWeights {
            name: "test_linear".to_string(),
            feature_names: names(&["lag_1", "month"]),
            coefficients: vec![2.0, 0.5],
            intercept: 10.0,
            feature_means: vec![40.0, 6.0],
            feature_stds: vec![5.0, 0.0],
        }
    }

    #[test]
    fn test_linear_prediction_uses_zscores() {
        let model = LinearModel::from_weights(test_weights()).unwrap();
        // (50 - 40) / 5 = 2 -> 10 + 2 * 2; the constant month feature is dropped
        assert_relative_eq!(model.predict_row(&[50.0, 3.0]).unwrap(), 14.0);
    }

    #[test]
    fn test_raw_coefficients_without_scaling() {
        let weights = ModelWeights {
            feature_means: vec![],
            feature_stds: vec![],
            ..test_weights()
        };
        let model = LinearModel::from_weights(weights).unwrap();
        assert_relative_eq!(model.predict_row(&[50.0, 2.0]).unwrap(), 111.0);
    }

    #[test]
    fn test_malformed_weights_rejected() {
        let weights = ModelWeights {
            coefficients: vec![1.0],
            ..test_weights()
        };
        assert!(matches!(
            LinearModel::from_weights(weights),
            Err(ForecastError::PredictorUnavailable(_))
        ));
        assert!(LinearModel::from_json("{not json").is_err());
    }

    #[test]
    fn test_load_missing_artifact() {
        let result = LinearModel::load("/nonexistent/best_model.json");
        assert!(matches!(result, Err(ForecastError::PredictorUnavailable(_))));
    }

    #[test]
    fn test_json_artifact_round_trip() {
        let model = LinearModel::from_weights(test_weights()).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", model.to_json().unwrap()).unwrap();

        let loaded = LinearModel::load(file.path()).unwrap();
        assert_eq!(loaded.weights(), model.weights());
    }

    #[test]
    fn test_adapter_checks_contract() {
        let adapter = PredictorAdapter::new(Arc::new(LinearModel::from_weights(test_weights()).unwrap()));

        let good = FeatureVector::new(names(&["lag_1", "month"]), vec![50.0, 1.0]).unwrap();
        assert_relative_eq!(adapter.predict(&good).unwrap(), 14.0);

        let reordered = FeatureVector::new(names(&["month", "lag_1"]), vec![1.0, 50.0]).unwrap();
        assert!(matches!(
            adapter.predict(&reordered),
            Err(ForecastError::FeatureContractMismatch(_))
        ));

        let narrow = FeatureVector::new(names(&["lag_1"]), vec![50.0]).unwrap();
        assert!(matches!(
            adapter.predict(&narrow),
            Err(ForecastError::FeatureContractMismatch(_))
        ));
    }

    struct NanModel {
        names: Vec<String>,
    }

    impl Regressor for NanModel {
        fn name(&self) -> &str {
            "nan"
        }

        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn predict_row(&self, _row: &[f64]) -> anyhow::Result<f64> {
            Ok(f64::NAN)
        }
    }

    #[test]
    fn test_adapter_rejects_non_finite_predictions() {
        let adapter = PredictorAdapter::new(Arc::new(NanModel { names: names(&["lag_1"]) }));
        let features = FeatureVector::new(names(&["lag_1"]), vec![1.0]).unwrap();

        assert!(matches!(
            adapter.predict(&features),
            Err(ForecastError::PredictorUnavailable(_))
        ));
    }
}
