use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::diagnostic::{LossConfig, LossPreset, ScoringConfig, ScoringPreset};

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
    pub diagnostic: DiagnosticConfig,
    pub backend: BackendConfig,
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
            server: ServerConfig {
                host,
                port,
                cors_origins: list_var("CORS_ALLOWED_ORIGINS", str::to_string),
            },
            telemetry: TelemetryConfig { log_level },
            diagnostic: DiagnosticConfig::from_env()?,
            backend: BackendConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Browser origins allowed to call the API. Empty allows any origin.
    pub cors_origins: Vec<String>,
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Scoring presets, optional dial overrides and the registration gate.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticConfig {
    pub scoring_preset: ScoringPreset,
    pub loss_preset: LossPreset,
    pub scale_factor: Option<f64>,
    pub max_loss_fraction: Option<f64>,
    pub whitelist_enforced: bool,
    /// Addresses pre-authorised when running without an external backend.
    pub whitelist_seed: Vec<String>,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        Self {
            scoring_preset: ScoringPreset::default(),
            loss_preset: LossPreset::default(),
            scale_factor: None,
            max_loss_fraction: None,
            whitelist_enforced: false,
            whitelist_seed: Vec::new(),
        }
    }
}

impl DiagnosticConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let scoring_preset = match env::var("SCORING_PRESET") {
            Ok(value) => ScoringPreset::parse(&value).ok_or(ConfigError::UnknownPreset {
                var: "SCORING_PRESET",
                value,
            })?,
            Err(_) => ScoringPreset::default(),
        };
        let loss_preset = match env::var("LOSS_PRESET") {
            Ok(value) => LossPreset::parse(&value).ok_or(ConfigError::UnknownPreset {
                var: "LOSS_PRESET",
                value,
            })?,
            Err(_) => LossPreset::default(),
        };

        let scale_factor = optional_number("SCORING_SCALE_FACTOR", |v| v > 0.0)?;
        let max_loss_fraction = optional_number("MAX_LOSS_FRACTION", |v| (0.0..=1.0).contains(&v))?;

        let whitelist_enforced = env::var("WHITELIST_ENFORCED")
            .map(|value| matches!(value.trim(), "1" | "true" | "TRUE" | "yes"))
            .unwrap_or(false);
        let whitelist_seed = list_var("WHITELIST_EMAILS", str::to_ascii_lowercase);

        Ok(Self {
            scoring_preset,
            loss_preset,
            scale_factor,
            max_loss_fraction,
            whitelist_enforced,
            whitelist_seed,
        })
    }

    /// Preset scoring dials with any configured override applied.
    pub fn scoring(&self) -> ScoringConfig {
        let mut config = self.scoring_preset.config();
        if let Some(scale_factor) = self.scale_factor {
            config.scale_factor = scale_factor;
        }
        config
    }

    pub fn loss(&self) -> LossConfig {
        let mut config = self.loss_preset.config();
        if let Some(max_loss_fraction) = self.max_loss_fraction {
            config.max_loss_fraction = max_loss_fraction;
        }
        config
    }
}

/// Comma-separated list, blanks dropped.
fn list_var(var: &str, normalize: impl Fn(&str) -> String) -> Vec<String> {
    env::var(var)
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(normalize)
                .collect()
        })
        .unwrap_or_default()
}

fn optional_number(
    var: &'static str,
    accept: impl Fn(f64) -> bool,
) -> Result<Option<f64>, ConfigError> {
    match env::var(var) {
        Ok(value) => match value.trim().parse::<f64>() {
            Ok(number) if number.is_finite() && accept(number) => Ok(Some(number)),
            _ => Err(ConfigError::InvalidNumber { var, value }),
        },
        Err(_) => Ok(None),
    }
}

/// External identity/database service. `None` runs against in-process stores.
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    pub supabase: Option<SupabaseConfig>,
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let Ok(url) = env::var("SUPABASE_URL") else {
            return Ok(Self::default());
        };
        if url.trim().is_empty() {
            return Ok(Self::default());
        }
        let anon_key = env::var("SUPABASE_ANON_KEY").map_err(|_| ConfigError::MissingAnonKey)?;

        Ok(Self {
            supabase: Some(SupabaseConfig { url, anon_key }),
        })
    }

    pub fn label(&self) -> &'static str {
        if self.supabase.is_some() {
            "supabase"
        } else {
            "in-memory"
        }
    }
}

#[derive(Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    UnknownPreset { var: &'static str, value: String },
    InvalidNumber { var: &'static str, value: String },
    MissingAnonKey,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::UnknownPreset { var, value } => {
                write!(f, "{var} does not name a known preset: '{value}'")
            }
            ConfigError::InvalidNumber { var, value } => {
                write!(f, "{var} is not an acceptable number: '{value}'")
            }
            ConfigError::MissingAnonKey => {
                write!(f, "SUPABASE_ANON_KEY must be set when SUPABASE_URL is")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::UnknownPreset { .. }
            | ConfigError::InvalidNumber { .. }
            | ConfigError::MissingAnonKey => None,
        }
    }
}
