use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use tracing::warn;
use weather_core::{
    Config, Coordinates, IpApiLocator, WeatherProvider, locate_or_fallback, provider_from_config,
};

use crate::{render, server};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-dash", version, about = "Personal weather dashboard")]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key in the config file.
    Configure,

    /// Run the dashboard web server.
    Serve {
        /// Interface to bind, overrides config and HOST.
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on, overrides config and PORT.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show current conditions.
    Current(CoordsArgs),

    /// Show the daily outlook.
    Forecast(CoordsArgs),

    /// Show the location detected from this machine's IP address.
    Locate,
}

/// Explicit coordinates; when absent the location is auto-detected.
#[derive(Debug, Args)]
pub struct CoordsArgs {
    #[arg(long, allow_negative_numbers = true, requires = "lon")]
    pub lat: Option<f64>,

    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    pub lon: Option<f64>,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure()?,
            Command::Serve { host, port } => {
                let mut config = Config::load()?;
                if let Some(host) = host {
                    config.server.host = host;
                }
                if let Some(port) = port {
                    config.server.port = port;
                }
                server::serve(config).await?;
            }
            Command::Current(at) => {
                let config = Config::load()?;
                let coords = resolve(&at, &config).await?;
                let weather = provider_from_config(&config).current(coords).await?;
                print!("{}", render::current_text(&weather));
            }
            Command::Forecast(at) => {
                let config = Config::load()?;
                let coords = resolve(&at, &config).await?;
                let daily = provider_from_config(&config).daily_forecast(coords).await?;
                print!("{}", render::forecast_text(&daily));
            }
            Command::Locate => {
                let config = Config::load()?;
                let lookup =
                    locate_or_fallback(&IpApiLocator::new(), &config.fallback_location).await;
                print!("{}", render::location_text(&lookup));
            }
        }

        Ok(())
    }
}

fn configure() -> anyhow::Result<()> {
    let path = Config::config_file_path()?;
    // Only the file is rewritten, environment overrides must not leak into it.
    let mut config = Config::load_from(&path)?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    config.set_api_key(api_key.trim().to_string());
    config.save_to(&path)?;

    println!("Saved configuration to {}", path.display());
    Ok(())
}

async fn resolve(at: &CoordsArgs, config: &Config) -> anyhow::Result<Coordinates> {
    if let (Some(lat), Some(lon)) = (at.lat, at.lon) {
        return Ok(Coordinates::new(lat, lon)?);
    }

    let lookup = locate_or_fallback(&IpApiLocator::new(), &config.fallback_location).await;
    if let Some(error) = &lookup.error {
        warn!("{error}; using {}", lookup.location.city);
    }

    Ok(lookup.location.coordinates()?)
}
