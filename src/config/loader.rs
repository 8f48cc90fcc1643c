use std::path::Path;
use tracing::{debug, info};

use crate::error::{ForecastError, Result};
use super::runtime::AppConfig;

const ENV_PREFIX: &str = "FORECAST";

/// Layer defaults, an optional TOML file and `FORECAST__*` environment variables.
///
/// `.env` is read first when present, so variables set there behave like real
/// environment variables.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    if let Ok(env_file) = dotenvy::dotenv() {
        debug!("Loaded environment from {}", env_file.display());
    }

    let mut builder = config::Config::builder();

    if let Some(path) = path {
        if !path.exists() {
            return Err(ForecastError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        builder = builder.add_source(config::File::from(path).format(config::FileFormat::Toml));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("features.lags")
            .with_list_parse_key("features.rolling_windows")
            .with_list_parse_key("features.calendar")
            .with_list_parse_key("training.region_filter.include")
            .with_list_parse_key("training.region_filter.exclude"),
    );

    let app_config: AppConfig = builder.build()?.try_deserialize()?;
    app_config
        .validate()
        .map_err(|errors| ForecastError::Config(errors.join(", ")))?;

    info!(
        "Configuration loaded: {} features, max {} months, artifact {}",
        app_config.features.width(),
        app_config.forecast.max_months,
        app_config.training.artifact_path.display()
    );

    Ok(app_config)
}

/// Render a configuration as TOML (used by `print-config`)
pub fn to_toml(app_config: &AppConfig) -> Result<String> {
    toml::to_string_pretty(app_config).map_err(|e| ForecastError::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CalendarFeature;
    use std::io::Write;

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.features.lags, AppConfig::default().features.lags);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[features]
lags = [1, 2]
rolling_windows = [3]
calendar = ["month", "month_sin"]

[forecast]
max_months = 12
parallel_regions = false

[training.region_filter]
exclude = ["NCR"]
"#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.features.lags, vec![1, 2]);
        assert_eq!(config.features.calendar, vec![CalendarFeature::Month, CalendarFeature::MonthSin]);
        assert_eq!(config.features.region_col, "admin1");
        assert_eq!(config.forecast.max_months, 12);
        assert!(!config.forecast.parallel_regions);
        assert!(!config.training.region_filter.allows("NCR"));
    }

    #[test]
    fn test_invalid_file_config_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[features]\nlags = [0]").unwrap();

        let result = load_config(Some(file.path()));
        assert!(matches!(result, Err(ForecastError::Config(_))));
    }

    #[test]
    fn test_missing_file_rejected() {
        let result = load_config(Some(Path::new("/nonexistent/forecast.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let rendered = to_toml(&AppConfig::default()).unwrap();
        assert!(rendered.contains("[features]"));
        let parsed: AppConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, AppConfig::default());
    }
}
