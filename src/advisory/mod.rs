pub mod rules;

pub use rules::*;

use tracing::debug;

use crate::engine::ForecastOutcome;
use crate::types::{AdvisoryRecord, ForecastRecord, RegionHistory, RegionSeries};

/// Run `rules` in order against one record; every rule that fires contributes
pub fn evaluate(
    history_snapshot: &RegionSeries,
    record: &ForecastRecord,
    rules: &[Box<dyn AdvisoryRule>],
) -> Vec<AdvisoryRecord> {
    rules
        .iter()
        .filter_map(|rule| rule.evaluate(history_snapshot, record))
        .collect()
}

/// Advisories for the records of one step, each read against its region's
/// series as it stood before that step
pub fn generate_advisories<'r, I>(
    history_for_step: &RegionHistory,
    records_for_step: I,
    rules: &[Box<dyn AdvisoryRule>],
) -> Vec<AdvisoryRecord>
where
    I: IntoIterator<Item = &'r ForecastRecord>,
{
    let mut advisories = Vec::new();
    for record in records_for_step {
        let advisories_for_record = match history_for_step.get(&record.region) {
            Some(series) => evaluate(series, record, rules),
            None => {
                debug!("No history for {}, evaluating against an empty series", record.region);
                evaluate(&RegionSeries::new(&record.region), record, rules)
            }
        };
        advisories.extend(advisories_for_record);
    }
    advisories
}

/// Advisories for every step of a run, in (step, region, rule) order
pub fn generate_run_advisories(
    outcome: &ForecastOutcome,
    rules: &[Box<dyn AdvisoryRule>],
) -> Vec<AdvisoryRecord> {
    let empty = RegionHistory::new();
    (1..=outcome.steps())
        .flat_map(|step| {
            let history = outcome.snapshot(step).map(|s| &s.series).unwrap_or(&empty);
            generate_advisories(history, outcome.records_for_step(step), rules)
        })
        .collect()
}

/// Pretty print to console
pub fn print_advisories(advisories: &[AdvisoryRecord]) {
    println!("\n{}", "=".repeat(96));
    println!("                                   ADVISORIES");
    println!("{}", "=".repeat(96));
    if advisories.is_empty() {
        println!("No advisories triggered under the current rules.");
    }
    for a in advisories {
        println!(
            "[{:<8}] {} {} step {} {} / {}",
            a.severity.as_str().to_uppercase(),
            a.region,
            a.forecast_date.format("%Y-%m"),
            a.step,
            a.rule,
            a.category
        );
        println!("           {}", a.message);
    }
    println!("{}", "=".repeat(96));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AdvisorySettings, FeatureConfig};
    use crate::engine::forecast;
    use crate::error::Result;
    use crate::ml::{FeatureVector, StepPredictor};
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    struct RisingPredictor;

    impl StepPredictor for RisingPredictor {
        fn predict(&self, features: &FeatureVector) -> Result<f64> {
            Ok(features.get("lag_1").unwrap_or(0.0) * 1.06)
        }
    }

    fn create_test_history() -> RegionHistory {
        let mut history = RegionHistory::new();
        history.insert(
            "A".to_string(),
            RegionSeries::from_prices("A", &[(ymd(2023, 12), 50.0), (ymd(2024, 1), 50.0)]).unwrap(),
        );
        history
    }

    #[test]
    fn test_evaluate_keeps_rule_order() {
        let rules = default_rules(&AdvisorySettings {
            band_window: 2,
            ..AdvisorySettings::default()
        });
        let series = RegionSeries::from_prices("A", &[(ymd(2023, 12), 50.0), (ymd(2024, 1), 50.0)]).unwrap();
        let record = ForecastRecord::new("A", 1, ymd(2024, 1), 50.0, ymd(2024, 2), 60.0);

        let advisories = evaluate(&series, &record, &rules);
        let names: Vec<&str> = advisories.iter().map(|a| a.rule.as_str()).collect();
        assert_eq!(names, vec!["pct_change_threshold", "trailing_mean_band"]);
    }

    #[test]
    fn test_quiet_record_gives_no_advisories() {
        let rules = default_rules(&AdvisorySettings::default());
        let record = ForecastRecord::new("A", 1, ymd(2024, 1), 50.0, ymd(2024, 2), 50.5);
        assert!(generate_advisories(&create_test_history(), [&record], &rules).is_empty());
    }

    #[test]
    fn test_missing_region_history() {
        let rules = default_rules(&AdvisorySettings::default());
        let record = ForecastRecord::new("Z", 1, ymd(2024, 1), 50.0, ymd(2024, 2), 60.0);
        let advisories = generate_advisories(&RegionHistory::new(), vec![&record], &rules);
        assert_eq!(advisories.len(), 1);
        assert_eq!(advisories[0].region, "Z");
    }

    #[test]
    fn test_run_advisories_read_step_snapshots() {
        let config = FeatureConfig {
            lags: vec![1],
            rolling_windows: vec![2],
            calendar: vec![],
            ..FeatureConfig::default()
        };
        let outcome = forecast(&create_test_history(), 3, &config, &RisingPredictor).unwrap();
        let rules: Vec<Box<dyn AdvisoryRule>> = vec![Box::new(SustainedTrend::new(2))];

        let advisories = generate_run_advisories(&outcome, &rules);

        // step 1 still reads the flat observed pair; from step 2 the earlier
        // forecast rise is part of the snapshot
        assert_eq!(advisories.iter().map(|a| a.step).collect::<Vec<_>>(), vec![2, 3]);
        assert!(advisories.iter().all(|a| a.category == CONSUMER_PRICE_PRESSURE));

        let threshold: Vec<Box<dyn AdvisoryRule>> = vec![Box::new(PctChangeThreshold::new(0.05))];
        let every_step = generate_run_advisories(&outcome, &threshold);
        assert_eq!(every_step.iter().map(|a| a.step).collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
