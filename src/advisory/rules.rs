use crate::config::AdvisorySettings;
use crate::ml::features::mean;
use crate::types::{AdvisoryRecord, ForecastRecord, RegionSeries, Severity};

pub const CONSUMER_PRICE_PRESSURE: &str = "consumer_price_pressure";
pub const FARMER_INCOME_RISK: &str = "farmer_income_risk";

// Absorbs rounding in forecast / current so a 5% move compares equal to 0.05
const THRESHOLD_TOLERANCE: f64 = 1e-12;

/// A pure predicate over one forecast record and the series it was built from
pub trait AdvisoryRule: Send + Sync {
    fn name(&self) -> &str;
    fn evaluate(&self, history: &RegionSeries, record: &ForecastRecord) -> Option<AdvisoryRecord>;
}

fn advisory(
    rule: &str,
    record: &ForecastRecord,
    rising: bool,
    severity: Severity,
    message: String,
) -> AdvisoryRecord {
    AdvisoryRecord {
        region: record.region.clone(),
        forecast_date: record.forecast_date,
        step: record.step,
        rule: rule.to_string(),
        category: if rising { CONSUMER_PRICE_PRESSURE } else { FARMER_INCOME_RISK }.to_string(),
        severity,
        message,
    }
}

/// Month-over-month change at or beyond a threshold
#[derive(Debug, Clone)]
pub struct PctChangeThreshold {
    pub threshold: f64,
}

impl PctChangeThreshold {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl AdvisoryRule for PctChangeThreshold {
    fn name(&self) -> &str {
        "pct_change_threshold"
    }

    fn evaluate(&self, _history: &RegionSeries, record: &ForecastRecord) -> Option<AdvisoryRecord> {
        let pct = record.pct_change?;
        if pct.abs() + THRESHOLD_TOLERANCE < self.threshold {
            return None;
        }

        let rising = pct > 0.0;
        let severity = if pct.abs() >= 2.0 * self.threshold {
            Severity::Warning
        } else {
            Severity::Watch
        };
        let message = if rising {
            format!(
                "{} price expected to rise {:.1}% to {:.2} in {}; consider releasing stocks or monitoring retail margins",
                record.region,
                pct * 100.0,
                record.forecast_price,
                record.forecast_date.format("%Y-%m")
            )
        } else {
            format!(
                "{} price expected to fall {:.1}% to {:.2} in {}; consider delaying sales or price support for producers",
                record.region,
                pct.abs() * 100.0,
                record.forecast_price,
                record.forecast_date.format("%Y-%m")
            )
        };

        Some(advisory(self.name(), record, rising, severity, message))
    }
}

/// Forecast outside a band around the trailing mean of the series
#[derive(Debug, Clone)]
pub struct TrailingMeanBand {
    pub window: usize,
    pub band: f64,
}

impl TrailingMeanBand {
    pub fn new(window: usize, band: f64) -> Self {
        Self { window, band }
    }
}

impl AdvisoryRule for TrailingMeanBand {
    fn name(&self) -> &str {
        "trailing_mean_band"
    }

    fn evaluate(&self, history: &RegionSeries, record: &ForecastRecord) -> Option<AdvisoryRecord> {
        let trailing = history.tail_prices(self.window);
        if self.window == 0 || trailing.len() < self.window {
            return None;
        }
        let reference = mean(&trailing);
        if reference.is_nan() || reference <= 0.0 {
            return None;
        }

        let deviation = (record.forecast_price - reference) / reference;
        if deviation.abs() <= self.band {
            return None;
        }

        let rising = deviation > 0.0;
        let severity = if deviation.abs() >= 2.0 * self.band {
            Severity::Warning
        } else {
            Severity::Watch
        };
        let message = format!(
            "{} forecast {:.2} for {} is {:.1}% {} the {}-month average of {:.2}",
            record.region,
            record.forecast_price,
            record.forecast_date.format("%Y-%m"),
            deviation.abs() * 100.0,
            if rising { "above" } else { "below" },
            self.window,
            reference
        );

        Some(advisory(self.name(), record, rising, severity, message))
    }
}

/// `length` consecutive moves in one direction, the last being the forecast
#[derive(Debug, Clone)]
pub struct SustainedTrend {
    pub length: usize,
}

impl SustainedTrend {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl AdvisoryRule for SustainedTrend {
    fn name(&self) -> &str {
        "sustained_trend"
    }

    fn evaluate(&self, history: &RegionSeries, record: &ForecastRecord) -> Option<AdvisoryRecord> {
        if self.length == 0 {
            return None;
        }
        let mut prices = history.tail_prices(self.length);
        if prices.len() < self.length {
            return None;
        }
        prices.push(record.forecast_price);

        let moves: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
        let rising = moves.iter().all(|m| *m > 0.0);
        let falling = moves.iter().all(|m| *m < 0.0);
        if !rising && !falling {
            return None;
        }

        let first = prices[0];
        let total = if first != 0.0 {
            format!(" ({:+.1}% overall)", (record.forecast_price - first) / first * 100.0)
        } else {
            String::new()
        };
        let message = format!(
            "{} prices {} for {} consecutive months through {}{}",
            record.region,
            if rising { "rising" } else { "falling" },
            self.length,
            record.forecast_date.format("%Y-%m"),
            total
        );

        Some(advisory(self.name(), record, rising, Severity::Info, message))
    }
}

/// Built-in rules in evaluation order
pub fn default_rules(settings: &AdvisorySettings) -> Vec<Box<dyn AdvisoryRule>> {
    vec![
        Box::new(PctChangeThreshold::new(settings.pct_change_threshold)),
        Box::new(TrailingMeanBand::new(settings.band_window, settings.band_pct)),
        Box::new(SustainedTrend::new(settings.trend_length)),
    ]
}
