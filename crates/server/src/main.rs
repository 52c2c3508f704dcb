//! Turbopi configuration service - main application entry point

use anyhow::{Context, Result};
use clap::Parser;
use settings::{LoggingSettings, SettingsLoader, SettingsValidator};
use std::env;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod app;

use app::Application;

/// Local configuration store for Turbopi devices
#[derive(Debug, Parser)]
#[command(name = "turbopi-config", version, about)]
struct Cli {
    /// YAML file with service settings
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Configuration file to manage (overrides TURBOPI_CONFIG_PATH)
    #[arg(long, value_name = "FILE")]
    config_path: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to bind
    #[arg(long)]
    port: Option<u16>,

    /// Write the default service settings to FILE and exit
    #[arg(long, value_name = "FILE")]
    write_example_settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = cli.write_example_settings {
        SettingsLoader::create_example(&path)?;
        println!("Wrote default settings to {}", path.display());
        return Ok(());
    }

    // Load .env file if it exists; logged once the subscriber is up
    let dotenv_result = dotenv::dotenv();

    let mut settings = SettingsLoader::load(cli.settings.as_deref())
        .context("Failed to load service settings")?;
    if let Some(host) = cli.host {
        settings.server.host = host;
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }

    init_logging(&settings.logging)?;

    match dotenv_result {
        Ok(path) => info!("Loaded environment variables from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Could not load .env file: {}", e),
    }

    info!("Starting Turbopi configuration service v{}", env!("CARGO_PKG_VERSION"));

    let report = SettingsValidator::validate(&settings);
    for issue in &report.warnings {
        warn!(field = %issue.field, "{}", issue.message);
    }
    if report.has_errors() {
        for issue in &report.errors {
            error!(field = %issue.field, "{}", issue.message);
        }
        anyhow::bail!("Invalid service settings: {}", report.summary());
    }

    let app = Application::new(settings, cli.config_path.as_deref())
        .context("Failed to create application")?;
    info!(
        path = %app.state().service.store().path().display(),
        "Serving configuration file"
    );

    let shutdown_signal = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    };

    info!("Application starting...");
    if let Err(e) = app.run(shutdown_signal).await {
        error!("Application error: {:#}", e);
        return Err(e);
    }

    info!("Turbopi configuration service shutdown complete");
    Ok(())
}

/// Initialize logging from settings; `RUST_LOG` and `LOG_FORMAT` take precedence
fn init_logging(logging: &LoggingSettings) -> Result<()> {
    let log_level = logging.level.clone();
    let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("Failed to initialize JSON logging")?;
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("Failed to initialize pretty logging")?;
        }
    }

    info!("Logging initialized");
    info!("Log level: {}", log_level);
    info!("Log format: {}", log_format);

    if log_level == "trace" || log_level == "debug" {
        warn!("Debug/trace logging enabled - request payloads may appear in logs");
    }

    Ok(())
}
