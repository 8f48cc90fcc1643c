use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{FeatureConfig, RegionFilter};
use crate::error::{ForecastError, Result};
use crate::ml::{history_cache, HistoryKey};
use crate::types::month::month_start;
use crate::types::{RegionHistory, RegionSeries};

pub const NATIONAL_REGION: &str = "National";

/// A CSV row that was read but not used
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: u64,
    pub message: String,
}

/// Monthly regional history plus what happened to the raw rows
#[derive(Debug, Clone)]
pub struct LoadedHistory {
    pub history: RegionHistory,
    pub rows_read: usize,
    pub rows_used: usize,
    pub rows_filtered: usize,
    pub row_errors: Vec<RowError>,
}

/// Accepts `YYYY-MM-DD` (with an optional time part) or `YYYY-MM`
pub fn parse_month(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day_part = raw.get(..10).unwrap_or(raw);
    if let Ok(date) = NaiveDate::parse_from_str(day_part, "%Y-%m-%d") {
        return Some(month_start(date));
    }
    NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d").ok()
}

fn column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| ForecastError::Data(format!("missing column '{}'", name)))
}

/// Read raw price rows and average them per (region, month)
pub fn read_history<R: Read>(reader: R, config: &FeatureConfig, filter: &RegionFilter) -> Result<LoadedHistory> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let date_idx = column(&headers, &config.date_col)?;
    let region_idx = column(&headers, &config.region_col)?;
    let price_idx = column(&headers, &config.price_col)?;

    let mut sums: BTreeMap<String, BTreeMap<NaiveDate, (f64, usize)>> = BTreeMap::new();
    let mut rows_read = 0;
    let mut rows_used = 0;
    let mut rows_filtered = 0;
    let mut row_errors = Vec::new();

    for result in csv_reader.records() {
        let record = result?;
        rows_read += 1;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let region = record.get(region_idx).map(str::trim).unwrap_or("");
        if region.is_empty() {
            row_errors.push(RowError {
                line,
                message: "empty region".to_string(),
            });
            continue;
        }
        if !filter.allows(region) {
            rows_filtered += 1;
            continue;
        }

        let raw_date = record.get(date_idx).unwrap_or("");
        let Some(date) = parse_month(raw_date) else {
            row_errors.push(RowError {
                line,
                message: format!("unparseable date '{}'", raw_date),
            });
            continue;
        };

        let raw_price = record.get(price_idx).unwrap_or("").trim();
        let price = match raw_price.parse::<f64>() {
            Ok(p) if p.is_finite() => p,
            _ => {
                row_errors.push(RowError {
                    line,
                    message: format!("invalid price '{}'", raw_price),
                });
                continue;
            }
        };

        let slot = sums
            .entry(region.to_string())
            .or_default()
            .entry(date)
            .or_insert((0.0, 0));
        slot.0 += price;
        slot.1 += 1;
        rows_used += 1;
    }

    let mut history = RegionHistory::new();
    for (region, months) in sums {
        let prices: Vec<(NaiveDate, f64)> = months
            .into_iter()
            .map(|(date, (sum, count))| (date, sum / count as f64))
            .collect();
        debug!("{}: {} months", region, prices.len());
        let series = RegionSeries::from_prices(&region, &prices)?;
        history.insert(region, series);
    }

    if !row_errors.is_empty() {
        warn!("Skipped {} unusable rows", row_errors.len());
    }

    Ok(LoadedHistory {
        history,
        rows_read,
        rows_used,
        rows_filtered,
        row_errors,
    })
}

pub fn load_history(path: &Path, config: &FeatureConfig, filter: &RegionFilter) -> Result<LoadedHistory> {
    let file = File::open(path)
        .map_err(|e| ForecastError::Data(format!("failed to open '{}': {}", path.display(), e)))?;
    let loaded = read_history(file, config, filter)?;

    if loaded.history.is_empty() {
        return Err(ForecastError::Data(format!("no usable price rows in '{}'", path.display())));
    }

    info!(
        "Loaded {} regions from {} ({} of {} rows used)",
        loaded.history.len(),
        path.display(),
        loaded.rows_used,
        loaded.rows_read
    );
    Ok(loaded)
}

/// Regions of `history` the filter lets through
pub fn filter_regions(history: &RegionHistory, filter: &RegionFilter) -> RegionHistory {
    history
        .iter()
        .filter(|(region, _)| filter.allows(region))
        .map(|(region, series)| (region.clone(), series.clone()))
        .collect()
}

/// Process-wide cached regional history, loaded on first use.
///
/// The file is cached unfiltered per column layout; `filter` is applied on
/// every call.
pub fn cached_history(path: &Path, config: &FeatureConfig, filter: &RegionFilter) -> Result<Arc<RegionHistory>> {
    let key = HistoryKey::new(path, config);
    let full = history_cache().get_or_load(&key, |key| {
        load_history(&key.path, config, &RegionFilter::default()).map(|loaded| loaded.history)
    })?;

    if filter.include.is_empty() && filter.exclude.is_empty() {
        return Ok(full);
    }
    let filtered = filter_regions(&full, filter);
    if filtered.is_empty() {
        return Err(ForecastError::Data(format!(
            "region filter leaves no regions in '{}'",
            path.display()
        )));
    }
    debug!("Region filter kept {} of {} regions", filtered.len(), full.len());
    Ok(Arc::new(filtered))
}

/// Mean of the regional monthly prices for every month any region reports
pub fn national_average(history: &RegionHistory) -> Result<RegionSeries> {
    let mut sums: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for point in history.values().flat_map(|s| s.points()) {
        let slot = sums.entry(point.date).or_insert((0.0, 0));
        slot.0 += point.price;
        slot.1 += 1;
    }
    let prices: Vec<(NaiveDate, f64)> = sums
        .into_iter()
        .map(|(date, (sum, count))| (date, sum / count as f64))
        .collect();
    RegionSeries::from_prices(NATIONAL_REGION, &prices)
}
