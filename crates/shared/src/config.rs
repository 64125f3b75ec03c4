//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Number sequence allocator tuning.
    #[serde(default)]
    pub numbering: NumberingConfig,
    /// Lifecycle policy values.
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Bounded retry for the number sequence allocator.
#[derive(Debug, Clone, Deserialize)]
pub struct NumberingConfig {
    /// Attempts before giving up with `RetryExhausted`.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff between attempts; attempt `n` waits `n × base`.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_backoff_ms() -> u64 {
    10
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Lifecycle policy values.
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    /// Days between an offer's sent date and its expiration date.
    #[serde(default = "default_offer_validity_days")]
    pub offer_validity_days: i64,
    /// Allowed gap between an order's value and the synced total income.
    #[serde(default = "default_dw_income_tolerance")]
    pub dw_income_tolerance: Decimal,
    /// Currency for new deals when none is given.
    #[serde(default = "default_currency")]
    pub default_currency: String,
    /// Probability given to a deal on entering each stage.
    #[serde(default)]
    pub probabilities: StageProbabilities,
}

/// Per-stage deal probabilities, 0 to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StageProbabilities {
    /// Probability for `lead`.
    pub lead: i32,
    /// Probability for `qualified`.
    pub qualified: i32,
    /// Probability for `proposal`.
    pub proposal: i32,
    /// Probability for `negotiation`.
    pub negotiation: i32,
    /// Probability for `won`.
    pub won: i32,
    /// Probability for `lost`.
    pub lost: i32,
}

impl Default for StageProbabilities {
    fn default() -> Self {
        Self {
            lead: 10,
            qualified: 25,
            proposal: 50,
            negotiation: 75,
            won: 100,
            lost: 0,
        }
    }
}

fn default_offer_validity_days() -> i64 {
    60
}

fn default_dw_income_tolerance() -> Decimal {
    Decimal::ONE
}

fn default_currency() -> String {
    "NOK".to_string()
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            offer_validity_days: default_offer_validity_days(),
            dw_income_tolerance: default_dw_income_tolerance(),
            default_currency: default_currency(),
            probabilities: StageProbabilities::default(),
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from config files and `KONTRAKT__*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("KONTRAKT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
