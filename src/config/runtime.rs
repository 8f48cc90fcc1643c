use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::features::FeatureConfig;

/// Upper bound on forecast horizon, in months
pub const MAX_FORECAST_MONTHS: u32 = 24;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub features: FeatureConfig,
    pub training: TrainingConfig,
    pub forecast: ForecastSettings,
    pub advisory: AdvisorySettings,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(mut feature_errors) = self.features.validate() {
            errors.append(&mut feature_errors);
        }
        if let Err(mut forecast_errors) = self.forecast.validate() {
            errors.append(&mut forecast_errors);
        }
        if let Err(mut advisory_errors) = self.advisory.validate() {
            errors.append(&mut advisory_errors);
        }
        if self.training.artifact_path.as_os_str().is_empty() {
            errors.push("training.artifact_path must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Where the fitted model and history live, and which regions are in scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub data_path: PathBuf,
    pub artifact_path: PathBuf,
    pub region_filter: RegionFilter,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("rice.csv"),
            artifact_path: PathBuf::from("artifacts/best_model.json"),
            region_filter: RegionFilter::default(),
        }
    }
}

/// Empty `include` means every region not listed in `exclude`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl RegionFilter {
    pub fn allows(&self, region: &str) -> bool {
        if self.exclude.iter().any(|r| r == region) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|r| r == region)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    pub max_months: u32,
    pub parallel_regions: bool,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            max_months: MAX_FORECAST_MONTHS,
            parallel_regions: true,
        }
    }
}

impl ForecastSettings {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.max_months == 0 || self.max_months > MAX_FORECAST_MONTHS {
            errors.push(format!("forecast.max_months must be between 1 and {}", MAX_FORECAST_MONTHS));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Thresholds for the built-in advisory rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorySettings {
    /// Absolute month-over-month change that raises an advisory (0.05 = 5%)
    pub pct_change_threshold: f64,
    /// Trailing points used for the reference mean
    pub band_window: usize,
    /// Allowed distance from the trailing mean (0.10 = 10%)
    pub band_pct: f64,
    /// Consecutive same-direction moves that count as a trend
    pub trend_length: usize,
}

impl Default for AdvisorySettings {
    fn default() -> Self {
        Self {
            pct_change_threshold: 0.05,
            band_window: 6,
            band_pct: 0.10,
            trend_length: 3,
        }
    }
}

impl AdvisorySettings {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(self.pct_change_threshold > 0.0 && self.pct_change_threshold.is_finite()) {
            errors.push("advisory.pct_change_threshold must be > 0".to_string());
        }
        if self.band_window == 0 {
            errors.push("advisory.band_window must be > 0".to_string());
        }
        if !(self.band_pct > 0.0 && self.band_pct.is_finite()) {
            errors.push("advisory.band_pct must be > 0".to_string());
        }
        if self.trend_length < 2 {
            errors.push("advisory.trend_length must be >= 2".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
