pub mod forecast;
pub mod request;
pub mod results;

pub use forecast::{forecast, ForecastEngine};
pub use request::{check_months, latest_observation, ForecastPlan, ForecastRequest, ForecastResponse};
pub use results::{summary_lines, ForecastOutcome, RegionSkip, StepSnapshot};
