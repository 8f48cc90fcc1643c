use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use price_forecaster::advisory::{
    default_rules, generate_advisories, generate_run_advisories, print_advisories,
};
use price_forecaster::config::{load_config, to_toml, AdvisoryProfile, AppConfig};
use price_forecaster::data::{cached_history, load_history, national_average};
use price_forecaster::engine::{ForecastEngine, ForecastRequest, ForecastResponse};
use price_forecaster::ml::{cached_model, PredictorAdapter, TrainingSet};
use price_forecaster::types::RegionHistory;

#[derive(Parser)]
#[command(name = "price-forecaster")]
#[command(version = "0.1.0")]
#[command(about = "Monthly regional price forecasts and rule-based advisories", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast prices for every region
    Forecast {
        /// Months to forecast
        #[arg(short, long, default_value = "1")]
        months: u32,
        /// Keep only forecasts for this year (requires --target-month)
        #[arg(long)]
        target_year: Option<i32>,
        /// Keep only forecasts for this month (requires --target-year)
        #[arg(long)]
        target_month: Option<u32>,
        /// Price history CSV (overrides training.data_path)
        #[arg(long)]
        history: Option<PathBuf>,
        /// Model artifact JSON (overrides training.artifact_path)
        #[arg(long)]
        model: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Forecast, then evaluate advisory rules
    Advise {
        #[arg(short, long, default_value = "1")]
        months: u32,
        /// Only advisories for this forecast step
        #[arg(short, long)]
        step: Option<u32>,
        /// Threshold preset: sensitive, standard, relaxed (defaults to [advisory] config)
        #[arg(short, long)]
        profile: Option<AdvisoryProfile>,
        #[arg(long)]
        history: Option<PathBuf>,
        #[arg(long)]
        model: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Export model inputs and targets as CSV for offline training
    ExportTrainingData {
        /// Output CSV file path
        #[arg(short, long, default_value = "training_data.csv")]
        output: PathBuf,
        #[arg(long)]
        history: Option<PathBuf>,
    },
    /// Show the regions in the price history
    Regions {
        #[arg(long)]
        history: Option<PathBuf>,
    },
    /// Print the effective configuration as TOML
    PrintConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is kept for command output
    let filter = log_filter(cli.verbose, std::env::var("RUST_LOG").ok().as_deref());
    if cli.log_json {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    let app_config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Forecast { months, target_year, target_month, history, model, format } => {
            let request = ForecastRequest { months, target_year, target_month };
            run_forecast(&app_config, &request, history.as_deref(), model.as_deref(), format)?;
        }
        Commands::Advise { months, step, profile, history, model, format } => {
            run_advise(&app_config, months, step, profile, history.as_deref(), model.as_deref(), format)?;
        }
        Commands::ExportTrainingData { output, history } => {
            export_training_data(&app_config, history.as_deref(), &output)?;
        }
        Commands::Regions { history } => {
            show_regions(&app_config, history.as_deref())?;
        }
        Commands::PrintConfig => {
            print!("{}", to_toml(&app_config)?);
        }
    }

    Ok(())
}

/// `RUST_LOG` directives win; otherwise `--verbose` picks DEBUG over INFO
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level))
}

fn load_inputs(
    app_config: &AppConfig,
    history_path: Option<&Path>,
    model_path: Option<&Path>,
) -> Result<(Arc<RegionHistory>, PredictorAdapter)> {
    let history_path = history_path.unwrap_or(app_config.training.data_path.as_path());
    let model_path = model_path.unwrap_or(app_config.training.artifact_path.as_path());

    let history = cached_history(history_path, &app_config.features, &app_config.training.region_filter)
        .with_context(|| format!("loading price history from {}", history_path.display()))?;
    let model = cached_model(model_path)?;

    let adapter = PredictorAdapter::new(model);
    adapter.check_contract(&app_config.features.feature_names())?;
    info!("Using model '{}' on {} regions", adapter.model_name(), history.len());

    Ok((history, adapter))
}

fn run_forecast(
    app_config: &AppConfig,
    request: &ForecastRequest,
    history_path: Option<&Path>,
    model_path: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let (history, adapter) = load_inputs(app_config, history_path, model_path)?;
    let engine = ForecastEngine::new(&app_config.features, &adapter).with_settings(&app_config.forecast);

    let (plan, outcome) = engine.run_request(&history, request)?;
    let response = ForecastResponse::new(&plan, &outcome);

    info!(
        "Latest observation {}, {} months generated, {} results",
        plan.latest_observation.format("%Y-%m"),
        plan.months_generated,
        response.result_count
    );

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        OutputFormat::Table => response.print_summary(),
    }
    Ok(())
}

fn run_advise(
    app_config: &AppConfig,
    months: u32,
    step: Option<u32>,
    profile: Option<AdvisoryProfile>,
    history_path: Option<&Path>,
    model_path: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let (history, adapter) = load_inputs(app_config, history_path, model_path)?;
    let engine = ForecastEngine::new(&app_config.features, &adapter).with_settings(&app_config.forecast);
    let outcome = engine.run(&history, months)?;

    let settings = match profile {
        Some(profile) => {
            info!("Advisory profile: {} ({})", profile.name(), profile.description());
            profile.settings()
        }
        None => app_config.advisory.clone(),
    };
    let rules = default_rules(&settings);

    let advisories = match step {
        Some(step) => {
            let snapshot = outcome
                .snapshot(step)
                .ok_or_else(|| anyhow!("step must be between 1 and {}, got {}", outcome.steps(), step))?;
            generate_advisories(&snapshot.series, outcome.records_for_step(step), &rules)
        }
        None => generate_run_advisories(&outcome, &rules),
    };

    info!("{} advisories from {} forecast records", advisories.len(), outcome.records.len());

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&advisories)?),
        OutputFormat::Table => print_advisories(&advisories),
    }
    Ok(())
}

fn export_training_data(app_config: &AppConfig, history_path: Option<&Path>, output: &Path) -> Result<()> {
    let history_path = history_path.unwrap_or(app_config.training.data_path.as_path());

    info!("=== Exporting Training Data ===");
    info!("History: {}", history_path.display());
    info!("Output: {}", output.display());

    let loaded = load_history(history_path, &app_config.features, &app_config.training.region_filter)?;
    let training_set = TrainingSet::build(&loaded.history, &app_config.features)?;

    if training_set.is_empty() {
        return Err(anyhow!(
            "No training rows: every month lacks the {} months of history the features need",
            app_config.features.min_history()
        ));
    }

    let file = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    training_set.write_csv(BufWriter::new(file))?;

    info!("Exported {} rows to {}", training_set.len(), output.display());
    info!("  Features: {}", training_set.feature_names.join(", "));
    info!("  Months without enough history: {}", training_set.skipped);
    Ok(())
}

fn show_regions(app_config: &AppConfig, history_path: Option<&Path>) -> Result<()> {
    let history_path = history_path.unwrap_or(app_config.training.data_path.as_path());
    let loaded = load_history(history_path, &app_config.features, &app_config.training.region_filter)?;

    for error in loaded.row_errors.iter().take(10) {
        warn!("line {}: {}", error.line, error.message);
    }

    println!("\n{}", "=".repeat(72));
    println!("{:<28} {:>8} {:>10} {:>10} {:>12}", "Region", "Months", "First", "Last", "Last price");
    println!("{}", "-".repeat(72));
    let national = national_average(&loaded.history)?;
    for series in loaded.history.values().chain(std::iter::once(&national)) {
        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            continue;
        };
        println!(
            "{:<28} {:>8} {:>10} {:>10} {:>12.2}",
            series.region(),
            series.len(),
            first.date.format("%Y-%m"),
            last.date.format("%Y-%m"),
            last.price
        );
    }
    println!("{}", "=".repeat(72));
    println!(
        "{} regions, {} of {} rows used, {} filtered out",
        loaded.history.len(),
        loaded.rows_used,
        loaded.rows_read,
        loaded.rows_filtered
    );
    Ok(())
}
