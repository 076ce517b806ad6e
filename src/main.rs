//! fasthotel-search - Room availability search for FastHotel reservation engines
//!
//! Drives a headless Chromium through the availability page, watches the quote
//! requests it fires and extracts the rendered room listings.

use anyhow::Result;
use clap::{Parser, Subcommand};
use fasthotel_search::browser::ChromiumDriver;
use fasthotel_search::commands::SearchCommand;
use fasthotel_search::config::{Config, OutputFormat};
use fasthotel_search::fasthotel::SearchOrchestrator;
use fasthotel_search::server;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "fasthotel-search",
    version,
    about = "Room availability search for FastHotel reservation engines",
    long_about = "Searches a FastHotel hotel for available rooms between two dates, from the command line or over HTTP."
)]
struct Cli {
    /// Reservation engine origin
    #[arg(long, global = true, env = "FASTHOTEL_BASE_URL")]
    base_url: Option<String>,

    /// Quote endpoint pattern to monitor (defaults to the engine path under the base URL)
    #[arg(long, global = true, env = "FASTHOTEL_QUOTE_ENDPOINT")]
    quote_endpoint: Option<String>,

    /// Chromium executable
    #[arg(long, global = true, env = "FASTHOTEL_CHROME")]
    chrome: Option<PathBuf>,

    /// Navigation timeout in milliseconds
    #[arg(long, global = true, env = "FASTHOTEL_NAV_TIMEOUT")]
    nav_timeout: Option<u64>,

    /// Show the browser window
    #[arg(long, global = true)]
    headful: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search available rooms for a stay
    #[command(alias = "s")]
    Search {
        /// Checkin date (YYYY-MM-DD)
        #[arg(long)]
        checkin: String,

        /// Checkout date (YYYY-MM-DD)
        #[arg(long)]
        checkout: String,

        /// Number of adults
        #[arg(long)]
        adults: Option<u32>,
    },

    /// Serve searches over HTTP
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    config.format = cli.format;

    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Some(pattern) = cli.quote_endpoint {
        config.quote_endpoint = Some(pattern);
    }
    if let Some(chrome) = cli.chrome {
        config.chrome_path = Some(chrome);
    }
    if let Some(timeout) = cli.nav_timeout {
        config.navigation_timeout_ms = timeout;
    }
    if cli.headful {
        config.headless = false;
    }

    match cli.command {
        Commands::Search { checkin, checkout, adults } => {
            if let Some(adults) = adults {
                config.adults = adults;
            }

            let cmd = SearchCommand::new(config);
            let output = cmd.execute(&checkin, &checkout).await?;

            if output.failed {
                eprintln!("{}", output.text);
                std::process::exit(1);
            }
            println!("{}", output.text);
        }

        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }

            let port = config.port;
            let driver = ChromiumDriver::new(&config);
            let orchestrator = SearchOrchestrator::new(driver, config)?;

            server::start(port, Arc::new(orchestrator)).await?;
        }
    }

    Ok(())
}
