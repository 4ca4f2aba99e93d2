// Configuration management for the ladder bot

use std::fs;
use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::retry::RetryPolicy;
use crate::core::stop_watcher::{StopOrder, TriggerDirection};
use crate::core::types::Side;

pub const API_KEY_ENV: &str = "LADDER_BOT_API_KEY";
pub const API_SECRET_ENV: &str = "LADDER_BOT_API_SECRET";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    #[serde(default = "default_quote_currency")]
    pub quote_currency: String,
    /// Ids starting with this prefix belong to orders the venue already closed
    #[serde(default = "default_inactive_prefix")]
    pub inactive_order_prefix: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Per-level price step as a fraction (0.005 = 0.5%)
    pub growth_rate: Decimal,
    /// Ladder depth per side
    pub order_pairs: usize,
    /// Base unit size before the distance weighting
    pub order_size: Decimal,
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
    #[serde(default = "default_size_decimal_places")]
    pub size_decimal_places: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_normal_interval")]
    pub normal_interval_secs: u64,
    #[serde(default = "default_fast_interval")]
    pub fast_interval_secs: u64,
    #[serde(default = "default_fast_cycles")]
    pub fast_check_cycles: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_delay")]
    pub delay_ms: u64,
    #[serde(default)]
    pub jitter_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DryRunConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_dry_base")]
    pub base_balance: Decimal,
    #[serde(default = "default_dry_quote")]
    pub quote_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopWatchConfig {
    #[serde(default = "default_stop_poll")]
    pub poll_interval_secs: u64,
    /// Limit price used for triggered buys; far above any realistic quote
    #[serde(default = "default_stop_buy_price")]
    pub buy_limit_price: Decimal,
    /// Limit price used for triggered sells; far below any realistic quote
    #[serde(default = "default_stop_sell_price")]
    pub sell_limit_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_profit_log")]
    pub profit_log: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopOrderConfig {
    pub trigger_price: Decimal,
    pub side: Side,
    pub size: Decimal,
    #[serde(default)]
    pub direction: Option<TriggerDirection>,
}

impl StopOrderConfig {
    pub fn to_stop_order(&self) -> StopOrder {
        match self.direction {
            Some(direction) => StopOrder {
                trigger_price: self.trigger_price,
                direction,
                side: self.side,
                size: self.size,
            },
            None => StopOrder::for_side(self.side, self.trigger_price, self.size),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub exchange: ExchangeConfig,
    pub grid: GridConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub dry_run: DryRunConfig,
    #[serde(default)]
    pub stop_watch: StopWatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub stop_orders: Vec<StopOrderConfig>,
}

// Default value functions
fn default_base_url() -> String { "https://api.example-exchange.com".to_string() }
fn default_base_currency() -> String { "BTC".to_string() }
fn default_quote_currency() -> String { "USD".to_string() }
fn default_inactive_prefix() -> String { "X".to_string() }
fn default_request_timeout() -> u64 { 10 }
fn default_decimal_places() -> u32 { 5 }
fn default_size_decimal_places() -> u32 { 8 }
fn default_normal_interval() -> u64 { 60 }
fn default_fast_interval() -> u64 { 15 }
fn default_fast_cycles() -> u32 { 8 }
fn default_retry_delay() -> u64 { 5000 }
fn default_dry_base() -> Decimal { Decimal::from(100) }
fn default_dry_quote() -> Decimal { Decimal::from(400) }
fn default_stop_poll() -> u64 { 20 }
fn default_stop_buy_price() -> Decimal { Decimal::from(100_000) }
fn default_stop_sell_price() -> Decimal { Decimal::new(1, 6) }
fn default_log_level() -> String { "info".to_string() }
fn default_profit_log() -> String { "logs/profit_log.csv".to_string() }

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            api_secret: String::new(),
            base_currency: default_base_currency(),
            quote_currency: default_quote_currency(),
            inactive_order_prefix: default_inactive_prefix(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            growth_rate: Decimal::new(5, 3),   // 0.5%
            order_pairs: 3,
            order_size: Decimal::new(2, 2),    // 0.02
            decimal_places: default_decimal_places(),
            size_decimal_places: default_size_decimal_places(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            normal_interval_secs: default_normal_interval(),
            fast_interval_secs: default_fast_interval(),
            fast_check_cycles: default_fast_cycles(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_retry_delay(),
            jitter_ms: 0,
        }
    }
}

impl Default for DryRunConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_balance: default_dry_base(),
            quote_balance: default_dry_quote(),
        }
    }
}

impl Default for StopWatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_stop_poll(),
            buy_limit_price: default_stop_buy_price(),
            sell_limit_price: default_stop_sell_price(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            profit_log: default_profit_log(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exchange: ExchangeConfig::default(),
            grid: GridConfig::default(),
            polling: PollingConfig::default(),
            retry: RetryConfig::default(),
            dry_run: DryRunConfig::default(),
            stop_watch: StopWatchConfig::default(),
            logging: LoggingConfig::default(),
            stop_orders: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(e.to_string()))?;

        let mut config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::write(path, content)
            .map_err(|e| ConfigError::FileWrite(e.to_string()))?;

        Ok(())
    }

    /// Load configuration, or fail with a hint to run `ladder-bot init`
    pub fn load_or_error<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        if !path_ref.exists() {
            return Err(ConfigError::FileNotFound(path_ref.display().to_string()));
        }
        Self::from_file(path_ref)
    }

    /// Load configuration from file, or create default if file doesn't exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            let config = Self::default();
            config.to_file(&path)?;
            tracing::info!("📁 Created default config file: {}", path.as_ref().display());
            Ok(config)
        }
    }

    /// Credentials from the environment take precedence over the file
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                self.exchange.api_key = key;
            }
        }
        if let Ok(secret) = std::env::var(API_SECRET_ENV) {
            if !secret.is_empty() {
                self.exchange.api_secret = secret;
            }
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(self.retry.delay_ms),
            Duration::from_millis(self.retry.jitter_ms),
        )
    }

    pub fn has_api_keys(&self) -> bool {
        !self.exchange.api_key.is_empty() && !self.exchange.api_secret.is_empty()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.growth_rate <= Decimal::ZERO {
            return Err(ConfigError::Validation("growth_rate must be positive".to_string()));
        }

        if self.grid.order_pairs == 0 {
            return Err(ConfigError::Validation("order_pairs must be greater than 0".to_string()));
        }

        if self.grid.order_size <= Decimal::ZERO {
            return Err(ConfigError::Validation("order_size must be positive".to_string()));
        }

        if self.grid.decimal_places > 16 || self.grid.size_decimal_places > 16 {
            return Err(ConfigError::Validation("decimal places must be at most 16".to_string()));
        }

        if self.polling.normal_interval_secs == 0 {
            return Err(ConfigError::Validation("normal_interval_secs must be greater than 0".to_string()));
        }

        if self.polling.fast_interval_secs > self.polling.normal_interval_secs {
            return Err(ConfigError::Validation(
                "fast_interval_secs must not exceed normal_interval_secs".to_string(),
            ));
        }

        if self.dry_run.base_balance < Decimal::ZERO || self.dry_run.quote_balance < Decimal::ZERO {
            return Err(ConfigError::Validation("dry run balances must be non-negative".to_string()));
        }

        if self.stop_watch.buy_limit_price <= Decimal::ZERO
            || self.stop_watch.sell_limit_price <= Decimal::ZERO
        {
            return Err(ConfigError::Validation("stop limit prices must be positive".to_string()));
        }

        for stop in &self.stop_orders {
            if stop.trigger_price <= Decimal::ZERO || stop.size <= Decimal::ZERO {
                return Err(ConfigError::Validation(
                    "stop orders need a positive trigger_price and size".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    FileRead(String),

    #[error("Failed to write config file: {0}")]
    FileWrite(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}
