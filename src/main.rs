mod display;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use skylog_core::{App, AppError, Config};
use skylog_weather::{SearchInput, SubmitOutcome, TemperatureUnit};

#[derive(Debug, Parser)]
#[command(name = "skylog")]
#[command(about = "Current weather lookups with a persistent search history")]
struct Cli {
    /// Temperature unit (defaults to the configured one)
    #[arg(long, value_enum, global = true)]
    unit: Option<Unit>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Unit {
    C,
    F,
}

impl From<Unit> for TemperatureUnit {
    fn from(unit: Unit) -> Self {
        match unit {
            Unit::C => TemperatureUnit::Celsius,
            Unit::F => TemperatureUnit::Fahrenheit,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Look up the weather for a city
    City { name: String },
    /// Look up the weather at a latitude/longitude
    #[command(allow_negative_numbers = true)]
    Coords { latitude: f64, longitude: f64 },
    /// Look up the weather at the configured current location
    Locate,
    /// List past searches, newest first
    History,
    /// Show a past search again without re-fetching it
    Show { id: i64 },
    /// Remove one entry from the history
    Remove { id: i64 },
    /// Remove every entry from the history
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    skylog_core::init()?;

    let cli = Cli::parse();
    let (config, _warnings) = Config::load_validated()?;
    let unit = cli
        .unit
        .map(TemperatureUnit::from)
        .unwrap_or(config.ui.temperature_unit);

    let app = App::new(config).map_err(report)?;

    match cli.command {
        Commands::City { name } => search(&app, SearchInput::city(name), unit).await,
        Commands::Coords {
            latitude,
            longitude,
        } => search(&app, SearchInput::coordinates(latitude, longitude), unit).await,
        Commands::Locate => search(&app, SearchInput::autolocation(), unit).await,
        Commands::History => {
            let store = app.store().lock();
            if store.history().is_empty() {
                println!("No searches yet.");
            }
            for entry in store.history() {
                println!("{}", display::history_line(entry));
            }
            Ok(())
        }
        Commands::Show { id } => {
            let mut store = app.store().lock();
            if !store.replay_by_id(id) {
                anyhow::bail!("No history entry with id {}", id);
            }
            if let Some(current) = store.current() {
                println!("{}", display::weather_card(current, unit));
            }
            Ok(())
        }
        Commands::Remove { id } => {
            if app.store().lock().remove_history_item(id) {
                println!("Removed {}", id);
                Ok(())
            } else {
                anyhow::bail!("No history entry with id {}", id)
            }
        }
        Commands::Clear => {
            app.store().lock().clear_history();
            println!("History cleared.");
            Ok(())
        }
    }
}

async fn search(app: &App, input: SearchInput, unit: TemperatureUnit) -> Result<()> {
    match app.search(input).await {
        SubmitOutcome::Completed { id } => {
            let store = app.store().lock();
            if let Some(current) = store.current() {
                println!("{}", display::weather_card(current, unit));
            }
            tracing::debug!("Recorded history entry {}", id);
            Ok(())
        }
        SubmitOutcome::Failed(err) | SubmitOutcome::Rejected(err) => {
            let detail = anyhow::anyhow!(err.to_string());
            let err = AppError::from(err);
            tracing::debug!("Search classified as {:?}", err);
            Err(detail.context(err.user_message()))
        }
        SubmitOutcome::Duplicate | SubmitOutcome::Superseded => {
            tracing::warn!("Search was skipped");
            Ok(())
        }
    }
}

fn report(err: AppError) -> anyhow::Error {
    tracing::error!("{}", err);
    anyhow::anyhow!(err.user_message())
}
