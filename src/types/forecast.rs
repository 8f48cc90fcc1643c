use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One forecast step for one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub region: String,
    pub current_date: NaiveDate,
    pub forecast_date: NaiveDate,
    pub current_price: f64,
    pub forecast_price: f64,
    pub price_change: f64,
    /// `None` when the current price is zero
    pub pct_change: Option<f64>,
    pub step: u32,
}

impl ForecastRecord {
    pub fn new(
        region: &str,
        step: u32,
        current_date: NaiveDate,
        current_price: f64,
        forecast_date: NaiveDate,
        forecast_price: f64,
    ) -> Self {
        let price_change = forecast_price - current_price;
        Self {
            region: region.to_string(),
            current_date,
            forecast_date,
            current_price,
            forecast_price,
            price_change,
            pct_change: pct_change(current_price, forecast_price),
            step,
        }
    }

    pub fn is_increase(&self) -> bool {
        self.price_change > 0.0
    }
}

/// Relative change, `None` when the base price is zero
pub fn pct_change(current: f64, forecast: f64) -> Option<f64> {
    if current == 0.0 {
        None
    } else {
        Some((forecast - current) / current)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Watch,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &str {
        match self {
            Severity::Info => "info",
            Severity::Watch => "watch",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// Rule-based advisory raised for a forecast record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryRecord {
    pub region: String,
    pub forecast_date: NaiveDate,
    pub step: u32,
    pub rule: String,
    pub category: String,
    pub severity: Severity,
    pub message: String,
}
