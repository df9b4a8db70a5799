use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::workflows::patents::domain::CountryCode;
use crate::workflows::patents::pipeline::PipelineSettings;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub pipeline: PipelineConfig,
    pub fixtures: FixtureConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            pipeline: PipelineConfig::from_env()?,
            fixtures: FixtureConfig::from_env(),
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Batch-level knobs for the scoring pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub workers: usize,
    pub max_citations: usize,
    pub retrieval_top_k: usize,
    pub web_results_per_query: usize,
    pub judge_enabled: bool,
    pub patents_per_country: usize,
    pub countries: Vec<CountryCode>,
    pub baseline_country: CountryCode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_citations: 5,
            retrieval_top_k: 4,
            web_results_per_query: 2,
            judge_enabled: true,
            patents_per_country: 3,
            countries: ["US", "KR", "JP"].into_iter().map(CountryCode::new).collect(),
            baseline_country: CountryCode::new("KR"),
        }
    }
}

impl PipelineConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let countries = match env::var("PIPELINE_COUNTRIES") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(CountryCode::new)
                .collect(),
            Err(_) => defaults.countries,
        };

        Ok(Self {
            workers: read_usize("PIPELINE_WORKERS", defaults.workers)?.max(1),
            max_citations: read_usize("PIPELINE_MAX_CITATIONS", defaults.max_citations)?,
            retrieval_top_k: read_usize("PIPELINE_TOP_K", defaults.retrieval_top_k)?,
            web_results_per_query: read_usize(
                "PIPELINE_WEB_RESULTS",
                defaults.web_results_per_query,
            )?,
            judge_enabled: read_bool("PIPELINE_JUDGE_ENABLED", defaults.judge_enabled)?,
            patents_per_country: read_usize(
                "PIPELINE_PATENTS_PER_COUNTRY",
                defaults.patents_per_country,
            )?,
            countries,
            baseline_country: env::var("PIPELINE_BASELINE_COUNTRY")
                .map(CountryCode::new)
                .unwrap_or(defaults.baseline_country),
        })
    }

    pub fn settings(&self) -> PipelineSettings {
        PipelineSettings {
            workers: self.workers,
            max_citations: (self.max_citations > 0).then_some(self.max_citations),
            retrieval_top_k: self.retrieval_top_k,
            web_results_per_query: self.web_results_per_query,
        }
    }
}

/// Optional CSV exports backing the offline collaborators.
#[derive(Debug, Clone, Default)]
pub struct FixtureConfig {
    pub patents_csv: Option<PathBuf>,
    pub citations_csv: Option<PathBuf>,
    pub corpus_csv: Option<PathBuf>,
}

impl FixtureConfig {
    fn from_env() -> Self {
        Self {
            patents_csv: env::var_os("FIXTURE_PATENTS_CSV").map(PathBuf::from),
            citations_csv: env::var_os("FIXTURE_CITATIONS_CSV").map(PathBuf::from),
            corpus_csv: env::var_os("FIXTURE_CORPUS_CSV").map(PathBuf::from),
        }
    }
}

fn read_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidNumber { name }),
        Err(_) => Ok(default),
    }
}

fn read_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { name }),
        },
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { name: &'static str },
    InvalidFlag { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { name } => {
                write!(f, "{name} must be a non-negative integer")
            }
            ConfigError::InvalidFlag { name } => write!(f, "{name} must be true or false"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidFlag { .. } => None,
        }
    }
}
