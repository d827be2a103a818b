use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use termin::config::Config;

mod commands;

#[derive(Parser)]
#[command(
    name = "termin",
    version,
    about = "Appointment availability and reservation engine",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file (defaults to TERMIN_* environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configuration
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the booking API server
    Serve {
        /// Bind address, e.g. 127.0.0.1:8080
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Print the slots of a service on a date
    Availability {
        /// Profile ID
        #[arg(short, long)]
        profile: String,

        /// Service ID
        #[arg(short, long)]
        service: String,

        /// Date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Restrict to one staff member
        #[arg(long)]
        staff: Option<String>,

        /// Print JSON instead of a table
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Print blocked and taken days of a profile
    UnavailableDays {
        /// Profile ID
        #[arg(short, long)]
        profile: String,
    },

    /// Expire stale pending reservations once
    Sweep,

    /// Validate the configuration and print it
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    // Initialize tracing/logging
    let format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&format, &config.logging.level, cli.verbose)?;

    match cli.command {
        Commands::Serve { bind } => {
            tracing::info!(bind = ?bind, "Starting serve command");
            commands::serve(config, bind).await?;
        }

        Commands::Availability {
            profile,
            service,
            date,
            staff,
            json,
        } => {
            tracing::info!(
                profile = %profile,
                service = %service,
                date = %date,
                staff = ?staff,
                "Starting availability command"
            );
            commands::availability(
                &config,
                commands::AvailabilityParams {
                    profile,
                    service,
                    date,
                    staff,
                    json,
                },
            )?;
        }

        Commands::UnavailableDays { profile } => {
            commands::unavailable_days(&config, &profile)?;
        }

        Commands::Sweep => {
            commands::sweep(&config)?;
        }

        Commands::CheckConfig => {
            commands::check_config(&config)?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("termin=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("termin={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    Ok(())
}
