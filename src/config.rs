//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::validation::SearchRequest;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Reservation engine origin
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Hotel path on the reservation engine (`/{chain}/{hotel}`)
    #[serde(default = "default_hotel_path")]
    pub hotel_path: String,

    /// Number of adults requested per search
    #[serde(default = "default_adults")]
    pub adults: u32,

    /// Pattern (case-insensitive) identifying the quote endpoint to monitor;
    /// derived from `base_url` when unset
    #[serde(default)]
    pub quote_endpoint: Option<String>,

    /// DOM marker that shows the listings finished rendering
    #[serde(default = "default_listings_selector")]
    pub listings_selector: String,

    /// Hard bound on page navigation in milliseconds
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Best-effort wait for the first quote response in milliseconds
    #[serde(default = "default_response_wait_ms")]
    pub response_wait_ms: u64,

    /// Non-fatal wait for the listings marker in milliseconds
    #[serde(default = "default_selector_timeout_ms")]
    pub selector_timeout_ms: u64,

    /// Chromium executable; auto-detected when unset
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// Run the browser without a window
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Port for the HTTP adapter
    #[serde(default = "default_port")]
    pub port: u16,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_base_url() -> String {
    "https://reservations3.fasthotel.com.br".to_string()
}

fn default_hotel_path() -> String {
    "/188/214".to_string()
}

fn default_adults() -> u32 {
    1
}

fn default_listings_selector() -> String {
    ".row.row-shadow.row-roundy.animated.slideInDown.fast".to_string()
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

fn default_response_wait_ms() -> u64 {
    20_000
}

fn default_selector_timeout_ms() -> u64 {
    10_000
}

fn default_headless() -> bool {
    true
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            hotel_path: default_hotel_path(),
            adults: default_adults(),
            quote_endpoint: None,
            listings_selector: default_listings_selector(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            response_wait_ms: default_response_wait_ms(),
            selector_timeout_ms: default_selector_timeout_ms(),
            chrome_path: None,
            headless: default_headless(),
            port: default_port(),
            format: OutputFormat::Table,
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("fasthotel-search").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(base_url) = std::env::var("FASTHOTEL_BASE_URL") {
            self.base_url = base_url;
        }

        if let Ok(endpoint) = std::env::var("FASTHOTEL_QUOTE_ENDPOINT") {
            self.quote_endpoint = Some(endpoint);
        }

        if let Ok(chrome) = std::env::var("FASTHOTEL_CHROME") {
            self.chrome_path = Some(PathBuf::from(chrome));
        }

        if let Ok(timeout) = std::env::var("FASTHOTEL_NAV_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.navigation_timeout_ms = t;
            }
        }

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(p) = port.parse() {
                self.port = p;
            }
        }

        self
    }

    /// Builds the availability page URL for a validated request.
    pub fn search_url(&self, request: &SearchRequest) -> String {
        let checkin = request.checkin.format("%Y-%m-%d").to_string();
        let checkout = request.checkout.format("%Y-%m-%d").to_string();

        format!(
            "{}{}?entrada={}&saida={}&adultos={}#acomodacoes",
            self.base_url.trim_end_matches('/'),
            self.hotel_path,
            urlencoding::encode(&checkin),
            urlencoding::encode(&checkout),
            self.adults
        )
    }

    /// Quote endpoint pattern: the explicit one, or the engine path under `base_url`.
    pub fn quote_endpoint_pattern(&self) -> String {
        match &self.quote_endpoint {
            Some(pattern) => pattern.clone(),
            None => format!("{}/reservaMotorCotar/", regex_lite::escape(self.base_url.trim_end_matches('/'))),
        }
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn response_wait(&self) -> Duration {
        Duration::from_millis(self.response_wait_ms)
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_millis(self.selector_timeout_ms)
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Markdown,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use: table, json, markdown, csv", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
