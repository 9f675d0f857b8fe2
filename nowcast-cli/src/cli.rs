use anyhow::{Context, anyhow};
use chrono::{Local, NaiveDateTime};
use clap::{Parser, Subcommand};
use nowcast_core::{
    AggregateError, AggregatedRecord, Config, Coordinates, LinearModel, aggregator_from_config,
};
use std::path::{Path, PathBuf};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "nowcast",
    version,
    about = "Live weather with a next-hour temperature prediction"
)]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show weather for a city from the city table.
    City {
        /// City key, e.g. "northcarolina".
        name: String,
    },

    /// Show weather for explicit coordinates.
    Live {
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        lon: Option<String>,
    },

    /// List the known cities.
    Cities,

    /// Interactively set the model path and prediction options.
    Configure,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };
        let config = Config::load_from(&config_path)?;
        tracing::debug!(path = %config_path.display(), "configuration loaded");

        match self.command {
            Command::City { name } => {
                let aggregator = aggregator_from_config(&config)?;
                let record = aggregator.aggregate_city(&name, now()).await.map_err(report)?;
                print_record(&record)?;
            }
            Command::Live { lat, lon } => {
                // bad input is reported before the model is loaded
                Coordinates::parse(lat.as_deref(), lon.as_deref())
                    .map_err(|err| report(err.into()))?;

                let aggregator = aggregator_from_config(&config)?;
                let record = aggregator
                    .aggregate_live(lat.as_deref(), lon.as_deref(), now())
                    .await
                    .map_err(report)?;
                print_record(&record)?;
            }
            Command::Cities => {
                for (key, city) in config.city_table().iter() {
                    println!(
                        "{key:<16} {:<20} {:>9.4} {:>9.4}",
                        city.name, city.latitude, city.longitude
                    );
                }
            }
            Command::Configure => configure(config, &config_path)?,
        }

        Ok(())
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn report(err: AggregateError) -> anyhow::Error {
    anyhow!("{} [{}]", err, err.kind())
}

fn print_record(record: &AggregatedRecord) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(record).context("Failed to serialize record")?;
    println!("{json}");
    Ok(())
}

fn configure(mut config: Config, path: &Path) -> anyhow::Result<()> {
    let model_path = inquire::Text::new("Model artifact path:")
        .with_default(&config.model_path.display().to_string())
        .prompt()?;

    if let Err(err) = LinearModel::load(Path::new(&model_path)) {
        println!("Warning: {err}");
    }

    let cursor = if config.precision <= 1 { 0 } else { 1 };
    let precision = inquire::Select::new("Prediction decimals:", vec![1u32, 2])
        .with_starting_cursor(cursor)
        .prompt()?;

    let strict_prediction =
        inquire::Confirm::new("Fail requests when the model rejects the feature vector?")
            .with_default(config.strict_prediction)
            .prompt()?;

    config.model_path = PathBuf::from(model_path);
    config.precision = precision;
    config.strict_prediction = strict_prediction;
    config.save_to(path)?;

    println!("Saved configuration to {}", path.display());
    Ok(())
}
