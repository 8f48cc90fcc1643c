use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ForecastError, Result};
use super::month::month_start;

/// One monthly price observation (or forecast) for a region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub region: String,
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    /// Dates are stored as first-of-month
    pub fn new(region: &str, date: NaiveDate, price: f64) -> Self {
        Self {
            region: region.to_string(),
            date: month_start(date),
            price,
        }
    }
}

/// Per-region history; BTreeMap keeps region iteration order deterministic
pub type RegionHistory = BTreeMap<String, RegionSeries>;

/// Date-ordered monthly prices for a single region, at most one point per month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSeries {
    region: String,
    points: Vec<PricePoint>,
}

impl RegionSeries {
    pub fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),
            points: Vec::new(),
        }
    }

    /// Build from points in any order. Duplicate months and foreign regions are rejected.
    pub fn from_points(region: &str, points: Vec<PricePoint>) -> Result<Self> {
        let mut points: Vec<PricePoint> = points
            .into_iter()
            .map(|p| PricePoint::new(&p.region, p.date, p.price))
            .collect();

        if let Some(foreign) = points.iter().find(|p| p.region != region) {
            return Err(ForecastError::InvalidSeries {
                region: region.to_string(),
                reason: format!("point for region '{}' on {}", foreign.region, foreign.date),
            });
        }

        points.sort_by_key(|p| p.date);
        if let Some(pair) = points.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(ForecastError::InvalidSeries {
                region: region.to_string(),
                reason: format!("duplicate month {}", pair[0].date.format("%Y-%m")),
            });
        }

        Ok(Self {
            region: region.to_string(),
            points,
        })
    }

    /// Convenience constructor from `(date, price)` pairs
    pub fn from_prices(region: &str, prices: &[(NaiveDate, f64)]) -> Result<Self> {
        let points = prices
            .iter()
            .map(|(date, price)| PricePoint::new(region, *date, *price))
            .collect();
        Self::from_points(region, points)
    }

    /// Append a point dated after the current last month
    pub fn push(&mut self, date: NaiveDate, price: f64) -> Result<()> {
        let date = month_start(date);
        if let Some(last) = self.points.last() {
            if date <= last.date {
                return Err(ForecastError::InvalidSeries {
                    region: self.region.clone(),
                    reason: format!(
                        "cannot append {} after {}",
                        date.format("%Y-%m"),
                        last.date.format("%Y-%m")
                    ),
                });
            }
        }
        self.points.push(PricePoint::new(&self.region, date, price));
        Ok(())
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Price recorded for the month containing `date`
    pub fn price_at(&self, date: NaiveDate) -> Option<f64> {
        let date = month_start(date);
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|idx| self.points[idx].price)
    }

    /// Points strictly before the month containing `date`
    pub fn before(&self, date: NaiveDate) -> &[PricePoint] {
        let date = month_start(date);
        let end = self.points.partition_point(|p| p.date < date);
        &self.points[..end]
    }

    /// Copy of the series holding only points strictly before `date`
    pub fn truncated_before(&self, date: NaiveDate) -> Self {
        Self {
            region: self.region.clone(),
            points: self.before(date).to_vec(),
        }
    }

    /// Prices of the trailing `n` points (fewer if the series is shorter)
    pub fn tail_prices(&self, n: usize) -> Vec<f64> {
        let start = self.points.len().saturating_sub(n);
        self.points[start..].iter().map(|p| p.price).collect()
    }
}
