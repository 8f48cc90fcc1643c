use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::types::month::quarter;

/// Calendar attributes of the target month that can be fed to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarFeature {
    Month,
    Quarter,
    Year,
    MonthSin,
    MonthCos,
}

impl CalendarFeature {
    pub fn name(&self) -> &'static str {
        match self {
            CalendarFeature::Month => "month",
            CalendarFeature::Quarter => "quarter",
            CalendarFeature::Year => "year",
            CalendarFeature::MonthSin => "month_sin",
            CalendarFeature::MonthCos => "month_cos",
        }
    }

    pub fn value(&self, date: NaiveDate) -> f64 {
        let angle = 2.0 * PI * date.month0() as f64 / 12.0;
        match self {
            CalendarFeature::Month => date.month() as f64,
            CalendarFeature::Quarter => quarter(date) as f64,
            CalendarFeature::Year => date.year() as f64,
            CalendarFeature::MonthSin => angle.sin(),
            CalendarFeature::MonthCos => angle.cos(),
        }
    }
}

/// Column naming and feature layout shared by training export and inference.
///
/// The ordered name list from [`FeatureConfig::feature_names`] is the contract a
/// fitted model is checked against before every prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub date_col: String,
    pub region_col: String,
    pub price_col: String,
    /// Month offsets back from the target month
    pub lags: Vec<u32>,
    /// Trailing point counts for rolling mean/std
    pub rolling_windows: Vec<usize>,
    pub calendar: Vec<CalendarFeature>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            date_col: "date".to_string(),
            region_col: "admin1".to_string(),
            price_col: "price".to_string(),
            lags: vec![1, 2, 3, 6, 12],
            rolling_windows: vec![3, 6, 12],
            calendar: vec![CalendarFeature::Month, CalendarFeature::Quarter],
        }
    }
}

impl FeatureConfig {
    pub fn lag_name(lag: u32) -> String {
        format!("lag_{}", lag)
    }

    pub fn rolling_mean_name(window: usize) -> String {
        format!("rolling_mean_{}", window)
    }

    pub fn rolling_std_name(window: usize) -> String {
        format!("rolling_std_{}", window)
    }

    /// Ordered feature names: lags, then mean/std per window, then calendar
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.width());
        names.extend(self.lags.iter().map(|&lag| Self::lag_name(lag)));
        for &window in &self.rolling_windows {
            names.push(Self::rolling_mean_name(window));
            names.push(Self::rolling_std_name(window));
        }
        names.extend(self.calendar.iter().map(|c| c.name().to_string()));
        names
    }

    pub fn width(&self) -> usize {
        self.lags.len() + 2 * self.rolling_windows.len() + self.calendar.len()
    }

    /// Months of contiguous history needed before the first forecast month
    pub fn min_history(&self) -> usize {
        let max_lag = self.lags.iter().copied().max().unwrap_or(0) as usize;
        let max_window = self.rolling_windows.iter().copied().max().unwrap_or(0);
        max_lag.max(max_window).max(1)
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (label, value) in [
            ("date_col", &self.date_col),
            ("region_col", &self.region_col),
            ("price_col", &self.price_col),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("features.{} must not be empty", label));
            }
        }
        if self.date_col == self.region_col
            || self.date_col == self.price_col
            || self.region_col == self.price_col
        {
            errors.push("features: column names must be distinct".to_string());
        }

        if self.lags.iter().any(|&lag| lag == 0) {
            errors.push("features.lags must be >= 1 (the target month is never an input)".to_string());
        }
        if has_duplicates(&self.lags) {
            errors.push("features.lags contains duplicates".to_string());
        }
        if self.rolling_windows.iter().any(|&w| w < 2) {
            errors.push("features.rolling_windows must be >= 2".to_string());
        }
        if has_duplicates(&self.rolling_windows) {
            errors.push("features.rolling_windows contains duplicates".to_string());
        }
        if has_duplicates(&self.calendar) {
            errors.push("features.calendar contains duplicates".to_string());
        }
        if self.width() == 0 {
            errors.push("features: at least one feature is required".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn has_duplicates<T: PartialEq>(values: &[T]) -> bool {
    values
        .iter()
        .enumerate()
        .any(|(i, v)| values[..i].contains(v))
}
