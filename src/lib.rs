//! Recursive multi-step regional price forecasting with rule-based advisories.
//!
//! The engine rebuilds model inputs at every step from the series alone, feeding
//! each prediction back as the newest month. Advisories read the per-step
//! snapshots the engine keeps.

pub mod advisory;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod ml;
pub mod types;

pub use engine::{forecast, ForecastEngine, ForecastOutcome, ForecastRequest};
pub use error::{ForecastError, Result};
