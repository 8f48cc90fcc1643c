use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::FeatureConfig;
use crate::error::{ForecastError, Result};
use crate::types::month::{month_start, shift_months};
use crate::types::RegionSeries;

/// Named feature values in the order given by [`FeatureConfig::feature_names`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    names: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn new(names: Vec<String>, values: Vec<f64>) -> Result<Self> {
        if names.len() != values.len() {
            return Err(ForecastError::FeatureContractMismatch(format!(
                "{} feature names for {} values",
                names.len(),
                values.len()
            )));
        }
        Ok(Self { names, values })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.names
            .iter()
            .cloned()
            .zip(self.values.iter().copied())
            .collect()
    }
}

/// Builds model inputs for one target month from a region's series.
///
/// Only points dated strictly before the target month are read, so a training
/// row (where the target price exists) and a forecast row (where it does not)
/// see exactly the same inputs.
#[derive(Debug, Clone, Copy)]
pub struct FeatureBuilder<'a> {
    config: &'a FeatureConfig,
}

impl<'a> FeatureBuilder<'a> {
    pub fn new(config: &'a FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        self.config
    }

    pub fn build(&self, series: &RegionSeries, as_of: NaiveDate) -> Result<FeatureVector> {
        // a zero lag reads the target itself, a one-point window has no std
        if let Some(lag) = self.config.lags.iter().find(|&&lag| lag == 0) {
            return Err(ForecastError::Config(format!("lag {} must be >= 1", lag)));
        }
        if let Some(window) = self.config.rolling_windows.iter().find(|&&w| w < 2) {
            return Err(ForecastError::Config(format!("rolling window {} must be >= 2", window)));
        }

        let as_of = month_start(as_of);
        let region = series.region();
        let history = series.before(as_of);
        let mut values = Vec::with_capacity(self.config.width());

        if history.is_empty() {
            return Err(ForecastError::insufficient_history(
                region,
                format!("no observations before {}", as_of.format("%Y-%m")),
            ));
        }

        // lags: exact calendar months, gaps are not filled
        for &lag in &self.config.lags {
            let month = shift_months(as_of, -(lag as i32)).ok_or_else(|| {
                ForecastError::insufficient_history(region, format!("lag {} is out of calendar range", lag))
            })?;
            let price = series.price_at(month).ok_or_else(|| {
                ForecastError::insufficient_history(
                    region,
                    format!("lag {} needs {} which is not observed", lag, month.format("%Y-%m")),
                )
            })?;
            values.push(price);
        }

        for &window in &self.config.rolling_windows {
            if history.len() < window {
                return Err(ForecastError::insufficient_history(
                    region,
                    format!(
                        "rolling window {} needs {} points before {}, have {}",
                        window,
                        window,
                        as_of.format("%Y-%m"),
                        history.len()
                    ),
                ));
            }
            let trailing: Vec<f64> = history[history.len() - window..]
                .iter()
                .map(|p| p.price)
                .collect();
            values.push(mean(&trailing));
            values.push(sample_std(&trailing));
        }

        values.extend(self.config.calendar.iter().map(|c| c.value(as_of)));

        FeatureVector::new(self.config.feature_names(), values)
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with an n - 1 denominator
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
