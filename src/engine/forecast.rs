use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{FeatureConfig, ForecastSettings, MAX_FORECAST_MONTHS};
use crate::error::{ForecastError, Result};
use crate::ml::{FeatureBuilder, StepPredictor};
use crate::types::month::shift_months;
use crate::types::{ForecastRecord, RegionHistory, RegionSeries};

use super::request::{check_months, latest_observation, ForecastPlan, ForecastRequest};
use super::results::{ForecastOutcome, RegionSkip, StepSnapshot};

/// Recursive multi-step forecaster.
///
/// Each step predicts one month per region and appends the prediction to that
/// region's series, so the next step's lags and rolling windows read it as if
/// it had been observed.
pub struct ForecastEngine<'a> {
    config: &'a FeatureConfig,
    predictor: &'a dyn StepPredictor,
    max_months: u32,
    parallel: bool,
}

impl<'a> ForecastEngine<'a> {
    pub fn new(config: &'a FeatureConfig, predictor: &'a dyn StepPredictor) -> Self {
        Self {
            config,
            predictor,
            max_months: MAX_FORECAST_MONTHS,
            parallel: false,
        }
    }

    /// `max_months` can only tighten the built-in horizon bound
    pub fn with_settings(mut self, settings: &ForecastSettings) -> Self {
        self.max_months = settings.max_months.min(MAX_FORECAST_MONTHS);
        self.parallel = settings.parallel_regions;
        self
    }

    /// Run regions of a step on the rayon pool
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn max_months(&self) -> u32 {
        self.max_months
    }

    /// Validate a request against the history, then run it
    pub fn run_request(
        &self,
        history: &RegionHistory,
        request: &ForecastRequest,
    ) -> Result<(ForecastPlan, ForecastOutcome)> {
        request.validate(self.max_months)?;
        let latest = latest_observation(history)
            .ok_or_else(|| ForecastError::InvalidRequest("no history to forecast from".to_string()))?;
        let plan = request.plan(latest, self.max_months)?;
        let outcome = self.run(history, plan.months_generated)?;
        Ok((plan, outcome))
    }

    pub fn run(&self, history: &RegionHistory, months: u32) -> Result<ForecastOutcome> {
        check_months(months, self.max_months)?;

        let mut states = Vec::with_capacity(history.len());
        for (region, series) in history {
            if series.region() != region {
                return Err(ForecastError::InvalidSeries {
                    region: region.clone(),
                    reason: format!("series is labelled '{}'", series.region()),
                });
            }
            states.push(RegionState::new(series.clone()));
        }

        info!(
            "Forecasting {} months for {} regions{}",
            months,
            states.len(),
            if self.parallel { " (parallel)" } else { "" }
        );

        let builder = FeatureBuilder::new(self.config);
        let predictor = self.predictor;
        let mut outcome = ForecastOutcome::default();

        for step in 1..=months {
            // collect() keeps region order in both branches
            let results: Vec<Result<StepResult>> = if self.parallel {
                states
                    .par_iter_mut()
                    .map(|state| state.advance(step, &builder, predictor))
                    .collect()
            } else {
                states
                    .iter_mut()
                    .map(|state| state.advance(step, &builder, predictor))
                    .collect()
            };

            let mut snapshot = StepSnapshot::new(step);
            for result in results {
                match result? {
                    StepResult::Forecast { record, series } => {
                        snapshot.series.insert(record.region.clone(), series);
                        outcome.records.push(record);
                    }
                    StepResult::Skipped(skip) => {
                        warn!("Region {} stopped at step {}: {}", skip.region, skip.step, skip.reason);
                        outcome.skipped.push(skip);
                    }
                    StepResult::Inactive => {}
                }
            }

            debug!("Step {}: {} regions forecast", step, snapshot.series.len());
            outcome.snapshots.push(snapshot);
        }

        info!(
            "Forecast complete: {} records, {} regions skipped",
            outcome.records.len(),
            outcome.skipped.len()
        );

        Ok(outcome)
    }
}

/// Entry point: forecast `months` steps for every region in `history`
pub fn forecast(
    history: &RegionHistory,
    months: u32,
    config: &FeatureConfig,
    predictor: &dyn StepPredictor,
) -> Result<ForecastOutcome> {
    ForecastEngine::new(config, predictor).run(history, months)
}

enum StepResult {
    Forecast { record: ForecastRecord, series: RegionSeries },
    Skipped(RegionSkip),
    Inactive,
}

/// Per-region accumulator, owned by exactly one task per step
struct RegionState {
    series: RegionSeries,
    last_observed: Option<NaiveDate>,
    active: bool,
}

impl RegionState {
    fn new(series: RegionSeries) -> Self {
        Self {
            last_observed: series.last_date(),
            series,
            active: true,
        }
    }

    fn stop(&mut self, step: u32, reason: String) -> StepResult {
        self.active = false;
        StepResult::Skipped(RegionSkip {
            region: self.series.region().to_string(),
            step,
            reason,
        })
    }

    fn advance(
        &mut self,
        step: u32,
        builder: &FeatureBuilder<'_>,
        predictor: &dyn StepPredictor,
    ) -> Result<StepResult> {
        if !self.active {
            return Ok(StepResult::Inactive);
        }
        let (Some(last_observed), Some(current)) = (self.last_observed, self.series.last().cloned()) else {
            return Ok(self.stop(step, "no observations".to_string()));
        };

        let forecast_date = shift_months(last_observed, step as i32).ok_or_else(|| {
            ForecastError::InvalidRequest(format!("step {} is outside the calendar range", step))
        })?;

        let features = match builder.build(&self.series, forecast_date) {
            Ok(features) => features,
            Err(ForecastError::InsufficientHistory { reason, .. }) => {
                return Ok(self.stop(step, reason));
            }
            Err(e) => return Err(e),
        };

        let forecast_price = predictor.predict(&features)?;
        let record = ForecastRecord::new(
            self.series.region(),
            step,
            current.date,
            current.price,
            forecast_date,
            forecast_price,
        );

        let series = self.series.clone();
        self.series.push(forecast_date, forecast_price)?;

        Ok(StepResult::Forecast { record, series })
    }
}
