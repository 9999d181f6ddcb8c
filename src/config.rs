use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Allowed CORS origins. Required unless cors_permissive is true.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Explicitly allow all origins (development only). Defaults to false.
    #[serde(default)]
    pub cors_permissive: bool,
    /// Overdue-trip sweep configuration
    #[serde(default)]
    pub overdue_sweep: SweepConfig,
    /// Transactional mail provider. Outbound mail is disabled when absent.
    #[serde(default)]
    pub mail: Option<MailConfig>,
}

/// Configuration for the background sweep that cancels overdue trips
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    /// Interval in seconds between sweep cycles (default: 300)
    #[serde(default = "SweepConfig::default_interval_secs")]
    pub interval_secs: u64,
    /// IANA timezone trips are scheduled in (default: UTC).
    /// "Today" and "now" in the overdue check are evaluated here.
    #[serde(default = "SweepConfig::default_timezone")]
    pub timezone: String,
    /// Whether to run one sweep immediately at startup (default: true)
    #[serde(default = "SweepConfig::default_run_on_startup")]
    pub run_on_startup: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: Self::default_interval_secs(),
            timezone: Self::default_timezone(),
            run_on_startup: Self::default_run_on_startup(),
        }
    }
}

impl SweepConfig {
    fn default_interval_secs() -> u64 {
        300
    }
    fn default_timezone() -> String {
        "UTC".to_string()
    }
    fn default_run_on_startup() -> bool {
        true
    }

    /// Parsed timezone. Call validate() first; this falls back to UTC.
    pub fn timezone(&self) -> chrono_tz::Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }

    pub fn validate(&self) {
        if self.interval_secs == 0 {
            panic!("overdue_sweep.interval_secs must be greater than zero");
        }
        if self.timezone.parse::<chrono_tz::Tz>().is_err() {
            panic!(
                "overdue_sweep.timezone '{}' is not a valid IANA timezone",
                self.timezone
            );
        }
    }
}

/// Transactional mail provider credentials
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// HTTP endpoint of the mail provider's send API
    pub api_url: String,
    /// Bearer token for the provider
    pub api_key: String,
    /// Sender address for all outbound mail
    pub sender: String,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
}
