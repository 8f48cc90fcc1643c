use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::types::month::{month_of, months_between};
use crate::types::{ForecastRecord, RegionHistory};
use super::results::{summary_lines, ForecastOutcome, RegionSkip};

pub const MIN_TARGET_YEAR: i32 = 2000;
pub const MAX_TARGET_YEAR: i32 = 2100;

/// Reject a horizon outside `1..=max_months`
pub fn check_months(months: u32, max_months: u32) -> Result<()> {
    if months < 1 || months > max_months {
        return Err(ForecastError::InvalidRequest(format!(
            "months must be between 1 and {}, got {}",
            max_months, months
        )));
    }
    Ok(())
}

/// Latest observed month across all regions
pub fn latest_observation(history: &RegionHistory) -> Option<NaiveDate> {
    history.values().filter_map(|s| s.last_date()).max()
}

/// Caller-facing forecast parameters: a horizon and an optional target month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub months: u32,
    pub target_year: Option<i32>,
    pub target_month: Option<u32>,
}

impl Default for ForecastRequest {
    fn default() -> Self {
        Self {
            months: 1,
            target_year: None,
            target_month: None,
        }
    }
}

impl ForecastRequest {
    pub fn months(months: u32) -> Self {
        Self {
            months,
            ..Self::default()
        }
    }

    pub fn with_target(mut self, year: i32, month: u32) -> Self {
        self.target_year = Some(year);
        self.target_month = Some(month);
        self
    }

    /// Checks that need no history: horizon bound and target pairing/range
    pub fn validate(&self, max_months: u32) -> Result<Option<NaiveDate>> {
        check_months(self.months, max_months)?;

        match (self.target_year, self.target_month) {
            (None, None) => Ok(None),
            (Some(year), Some(month)) => {
                if !(MIN_TARGET_YEAR..=MAX_TARGET_YEAR).contains(&year) {
                    return Err(ForecastError::InvalidRequest(format!(
                        "target_year must be between {} and {}, got {}",
                        MIN_TARGET_YEAR, MAX_TARGET_YEAR, year
                    )));
                }
                let target = month_of(year, month).ok_or_else(|| {
                    ForecastError::InvalidRequest(format!("target_month must be between 1 and 12, got {}", month))
                })?;
                Ok(Some(target))
            }
            _ => Err(ForecastError::InvalidRequest(
                "provide both target_year and target_month, or omit both".to_string(),
            )),
        }
    }

    /// Resolve how many months to generate given the latest observation
    pub fn plan(&self, latest_observation: NaiveDate, max_months: u32) -> Result<ForecastPlan> {
        let target_date = self.validate(max_months)?;
        let mut months_generated = self.months;

        if let Some(target) = target_date {
            let delta = months_between(latest_observation, target);
            if delta < 1 {
                return Err(ForecastError::InvalidRequest(format!(
                    "target must be after the latest observation ({})",
                    latest_observation.format("%Y-%m")
                )));
            }
            if delta as u32 > max_months {
                return Err(ForecastError::InvalidRequest(format!(
                    "target {} is {} months after the latest observation, the limit is {}",
                    target.format("%Y-%m"),
                    delta,
                    max_months
                )));
            }
            months_generated = months_generated.max(delta as u32);
        }

        Ok(ForecastPlan {
            latest_observation,
            months_requested: self.months,
            months_generated,
            target_date,
        })
    }
}

/// A validated request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPlan {
    pub latest_observation: NaiveDate,
    pub months_requested: u32,
    pub months_generated: u32,
    pub target_date: Option<NaiveDate>,
}

/// Response envelope for downstream consumers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResponse {
    pub latest_observation: NaiveDate,
    pub months_requested: u32,
    pub months_generated: u32,
    pub target_date: Option<NaiveDate>,
    pub result_count: usize,
    pub results: Vec<ForecastRecord>,
    pub skipped: Vec<RegionSkip>,
}

impl ForecastResponse {
    /// With a target month, only records forecasting that month are kept
    pub fn new(plan: &ForecastPlan, outcome: &ForecastOutcome) -> Self {
        let results: Vec<ForecastRecord> = outcome
            .records
            .iter()
            .filter(|r| plan.target_date.map_or(true, |target| r.forecast_date == target))
            .cloned()
            .collect();

        Self {
            latest_observation: plan.latest_observation,
            months_requested: plan.months_requested,
            months_generated: plan.months_generated,
            target_date: plan.target_date,
            result_count: results.len(),
            results,
            skipped: outcome.skipped.clone(),
        }
    }

    /// Console table of the kept results
    pub fn summary_lines(&self) -> Vec<String> {
        summary_lines(&self.results, &self.skipped)
    }

    pub fn print_summary(&self) {
        for line in self.summary_lines() {
            println!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn test_months_bounds() {
        assert!(check_months(1, 24).is_ok());
        assert!(check_months(24, 24).is_ok());
        assert!(matches!(check_months(0, 24), Err(ForecastError::InvalidRequest(_))));
        assert!(matches!(check_months(25, 24), Err(ForecastError::InvalidRequest(_))));
    }

    #[test]
    fn test_half_specified_target_rejected() {
        let request = ForecastRequest {
            months: 1,
            target_year: Some(2024),
            target_month: None,
        };
        assert!(matches!(request.validate(24), Err(ForecastError::InvalidRequest(_))));

        let request = ForecastRequest {
            months: 1,
            target_year: None,
            target_month: Some(3),
        };
        assert!(request.validate(24).is_err());
    }

    #[test]
    fn test_target_range_checks() {
        assert!(ForecastRequest::months(1).with_target(1999, 1).validate(24).is_err());
        assert!(ForecastRequest::months(1).with_target(2024, 13).validate(24).is_err());
        assert_eq!(
            ForecastRequest::months(1).with_target(2024, 6).validate(24).unwrap(),
            Some(ymd(2024, 6))
        );
    }

    #[test]
    fn test_plan_extends_to_target() {
        let plan = ForecastRequest::months(1)
            .with_target(2024, 8)
            .plan(ymd(2024, 5), 24)
            .unwrap();

        assert_eq!(plan.months_requested, 1);
        assert_eq!(plan.months_generated, 3);
        assert_eq!(plan.target_date, Some(ymd(2024, 8)));

        // a longer horizon than the target is kept
        let plan = ForecastRequest::months(6)
            .with_target(2024, 8)
            .plan(ymd(2024, 5), 24)
            .unwrap();
        assert_eq!(plan.months_generated, 6);
    }

    #[test]
    fn test_plan_rejects_past_or_distant_targets() {
        let latest = ymd(2024, 5);
        assert!(ForecastRequest::months(1).with_target(2024, 5).plan(latest, 24).is_err());
        assert!(ForecastRequest::months(1).with_target(2023, 12).plan(latest, 24).is_err());
        assert!(ForecastRequest::months(1).with_target(2026, 6).plan(latest, 24).is_err());
    }

    #[test]
    fn test_response_filters_to_target() {
        let outcome = ForecastOutcome {
            records: vec![
                ForecastRecord::new("A", 1, ymd(2024, 5), 10.0, ymd(2024, 6), 11.0),
                ForecastRecord::new("A", 2, ymd(2024, 6), 11.0, ymd(2024, 7), 12.0),
            ],
            ..ForecastOutcome::default()
        };
        let plan = ForecastRequest::months(1)
            .with_target(2024, 7)
            .plan(ymd(2024, 5), 24)
            .unwrap();

        let response = ForecastResponse::new(&plan, &outcome);
        assert_eq!(response.result_count, 1);
        assert_eq!(response.results[0].step, 2);

        let table = response.summary_lines();
        let rows: Vec<&String> = table.iter().filter(|l| l.starts_with("A ")).collect();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].contains("2024-07"));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["target_date"], "2024-07-01");
        assert_eq!(json["latest_observation"], "2024-05-01");
    }
}
