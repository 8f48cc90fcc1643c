use serde::Serialize;
use std::collections::BTreeSet;

use crate::types::{ForecastRecord, RegionHistory, RegionSeries};

/// A region dropped from a run, and the step where it stopped
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSkip {
    pub region: String,
    pub step: u32,
    pub reason: String,
}

/// Series state each region's forecast for `step` was built from.
///
/// It holds observed history plus the forecast points of steps before `step`,
/// never the point predicted at `step` itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepSnapshot {
    pub step: u32,
    pub series: RegionHistory,
}

impl StepSnapshot {
    pub fn new(step: u32) -> Self {
        Self {
            step,
            series: RegionHistory::new(),
        }
    }

    pub fn get(&self, region: &str) -> Option<&RegionSeries> {
        self.series.get(region)
    }
}

/// Everything a forecast run produced
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ForecastOutcome {
    /// Ordered by step, then region
    pub records: Vec<ForecastRecord>,
    /// `snapshots[k - 1]` belongs to step `k`
    pub snapshots: Vec<StepSnapshot>,
    pub skipped: Vec<RegionSkip>,
}

impl ForecastOutcome {
    pub fn steps(&self) -> u32 {
        self.snapshots.len() as u32
    }

    pub fn records_for_step(&self, step: u32) -> Vec<&ForecastRecord> {
        self.records.iter().filter(|r| r.step == step).collect()
    }

    pub fn records_for_region(&self, region: &str) -> Vec<&ForecastRecord> {
        self.records.iter().filter(|r| r.region == region).collect()
    }

    pub fn snapshot(&self, step: u32) -> Option<&StepSnapshot> {
        let idx = (step as usize).checked_sub(1)?;
        self.snapshots.get(idx)
    }

    /// Regions with at least one record
    pub fn regions(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.region.as_str()).collect()
    }

    /// Pretty print to console
    pub fn print_summary(&self) {
        for line in summary_lines(&self.records, &self.skipped) {
            println!("{}", line);
        }
    }
}

/// Console table for forecast records and skipped regions
pub fn summary_lines(records: &[ForecastRecord], skipped: &[RegionSkip]) -> Vec<String> {
    let mut lines = vec![
        format!("\n{}", "=".repeat(96)),
        "                                   FORECAST RESULTS".to_string(),
        "=".repeat(96),
        format!(
            "{:<24} {:>4} {:>10} {:>10} {:>12} {:>12} {:>9}",
            "Region", "Step", "Current", "Forecast", "Cur. price", "Fcst. price", "Change"
        ),
        "-".repeat(96),
    ];
    for r in records {
        let pct = r
            .pct_change
            .map(|p| format!("{:+.2}%", p * 100.0))
            .unwrap_or_else(|| "n/a".to_string());
        lines.push(format!(
            "{:<24} {:>4} {:>10} {:>10} {:>12.2} {:>12.2} {:>9}",
            r.region,
            r.step,
            r.current_date.format("%Y-%m"),
            r.forecast_date.format("%Y-%m"),
            r.current_price,
            r.forecast_price,
            pct
        ));
    }
    if !skipped.is_empty() {
        lines.push("-".repeat(96));
        lines.push("SKIPPED REGIONS".to_string());
        for skip in skipped {
            lines.push(format!("  {} (step {}): {}", skip.region, skip.step, skip.reason));
        }
    }
    lines.push("=".repeat(96));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn test_outcome_lookups() {
        let outcome = ForecastOutcome {
            records: vec![
                ForecastRecord::new("A", 1, ymd(2024, 1), 10.0, ymd(2024, 2), 11.0),
                ForecastRecord::new("B", 1, ymd(2024, 1), 20.0, ymd(2024, 2), 19.0),
                ForecastRecord::new("A", 2, ymd(2024, 2), 11.0, ymd(2024, 3), 12.0),
            ],
            snapshots: vec![StepSnapshot::new(1), StepSnapshot::new(2)],
            skipped: vec![],
        };

        assert_eq!(outcome.steps(), 2);
        assert_eq!(outcome.records_for_step(1).len(), 2);
        assert_eq!(outcome.records_for_region("A").len(), 2);
        assert_eq!(outcome.snapshot(2).unwrap().step, 2);
        assert!(outcome.snapshot(0).is_none());
        assert!(outcome.snapshot(3).is_none());
        assert_eq!(outcome.regions().into_iter().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn test_summary_lines() {
        let records = vec![ForecastRecord::new("A", 1, ymd(2024, 1), 0.0, ymd(2024, 2), 11.0)];
        let skipped = vec![RegionSkip {
            region: "C".to_string(),
            step: 1,
            reason: "no observations".to_string(),
        }];

        let lines = summary_lines(&records, &skipped);
        assert_eq!(lines.iter().filter(|l| l.starts_with("A ")).count(), 1);
        assert!(lines.iter().any(|l| l.contains("2024-02") && l.contains("n/a")));
        assert!(lines.iter().any(|l| l.contains("C (step 1): no observations")));
    }
}
