use chrono::NaiveDate;
use std::io::Write;
use tracing::{debug, info};

use crate::config::FeatureConfig;
use crate::error::Result;
use crate::types::RegionHistory;
use super::{FeatureBuilder, FeatureVector};

/// One supervised example: features for a month and the price observed in it
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRow {
    pub region: String,
    pub date: NaiveDate,
    pub features: FeatureVector,
    pub target: f64,
}

/// Training examples built with the same [`FeatureBuilder`] the forecast engine uses
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub feature_names: Vec<String>,
    pub rows: Vec<TrainingRow>,
    /// Months without enough prior history to form a row
    pub skipped: usize,
}

impl TrainingSet {
    pub fn build(history: &RegionHistory, config: &FeatureConfig) -> Result<Self> {
        let builder = FeatureBuilder::new(config);
        let mut rows = Vec::new();
        let mut skipped = 0;

        for (region, series) in history {
            let before = rows.len();
            for point in series.points() {
                match builder.build(series, point.date) {
                    Ok(features) => rows.push(TrainingRow {
                        region: region.clone(),
                        date: point.date,
                        features,
                        target: point.price,
                    }),
                    Err(e) if !e.is_fatal() => skipped += 1,
                    Err(e) => return Err(e),
                }
            }
            debug!("{}: {} training rows", region, rows.len() - before);
        }

        info!(
            "Training set: {} rows across {} regions ({} months skipped for history)",
            rows.len(),
            history.len(),
            skipped
        );

        Ok(Self {
            feature_names: config.feature_names(),
            rows,
            skipped,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header: region, date, one column per feature, target
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        let mut header = vec!["region".to_string(), "date".to_string()];
        header.extend(self.feature_names.iter().cloned());
        header.push("target".to_string());
        csv_writer.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.region.clone(), row.date.format("%Y-%m-%d").to_string()];
            record.extend(row.features.values().iter().map(|v| format!("{:.6}", v)));
            record.push(format!("{:.6}", row.target));
            csv_writer.write_record(&record)?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::month::shift_months;
    use crate::types::RegionSeries;

    fn create_test_history() -> RegionHistory {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let mut history = RegionHistory::new();
        for (region, months) in [("A", 6), ("B", 2)] {
            let prices: Vec<(NaiveDate, f64)> = (0..months)
                .map(|i| (shift_months(start, i).unwrap(), 10.0 + i as f64))
                .collect();
            history.insert(region.to_string(), RegionSeries::from_prices(region, &prices).unwrap());
        }
        history
    }

    fn small_config() -> FeatureConfig {
        FeatureConfig {
            lags: vec![1, 2],
            rolling_windows: vec![3],
            calendar: vec![],
            ..FeatureConfig::default()
        }
    }

    #[test]
    fn test_rows_match_inference_features() {
        let history = create_test_history();
        let config = small_config();
        let set = TrainingSet::build(&history, &config).unwrap();

        // A: months 4..6 have 3 prior points; B never does
        assert_eq!(set.len(), 3);
        assert_eq!(set.skipped, 5);

        let row = &set.rows[0];
        assert_eq!(row.region, "A");
        assert_eq!(row.target, 13.0);

        let series = &history["A"];
        let inference = FeatureBuilder::new(&config)
            .build(&series.truncated_before(row.date), row.date)
            .unwrap();
        assert_eq!(row.features, inference);
    }

    #[test]
    fn test_write_csv() {
        let set = TrainingSet::build(&create_test_history(), &small_config()).unwrap();
        let mut buffer = Vec::new();
        set.write_csv(&mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "region,date,lag_1,lag_2,rolling_mean_3,rolling_std_3,target"
        );
        assert_eq!(
            lines.next().unwrap(),
            "A,2023-04-01,12.000000,11.000000,11.000000,1.000000,13.000000"
        );
        assert_eq!(text.lines().count(), 4);
    }
}
