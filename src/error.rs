//! Unified error handling for the ladder bot
//!
//! Every fallible operation in the crate returns [`TradingResult`]. Errors fall
//! into two tiers: transient venue failures, which the retry wrapper absorbs,
//! and fatal invariant violations, which stop the process.

use std::io;

use thiserror::Error;

/// Main error type for the ladder bot
#[derive(Debug, Error)]
pub enum TradingError {
    // Configuration errors
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Configuration validation error: {0}")]
    ConfigValidation(String),

    // API errors
    #[error("API connection error: {0}")]
    ApiConnection(String),

    #[error("API authentication failed: {0}")]
    ApiAuthentication(String),

    #[error("API rate limit exceeded: {0}")]
    ApiRateLimit(String),

    #[error("API response error: {0}")]
    ApiResponse(String),

    #[error("API timeout: {0}")]
    ApiTimeout(String),

    // Trading errors
    #[error("Order rejected: {0}")]
    OrderRejected(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Invalid order side: {0}")]
    InvalidOrderSide(String),

    #[error("Sanity check failed: {0}")]
    SanityCheckFailed(String),

    // IO errors
    #[error("File read error: {0}")]
    FileRead(String),

    #[error("File write error: {0}")]
    FileWrite(String),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TradingError {
    /// Get a user-friendly error message with helpful context
    pub fn user_message(&self) -> String {
        match self {
            TradingError::ConfigNotFound(path) => {
                format!(
                    "Configuration file not found: {}\n\n\
                    💡 Quick fix:\n\
                    1. Run: ladder-bot init\n\
                    2. Edit config.toml with your API keys\n\
                    3. Try again",
                    path
                )
            }
            TradingError::ConfigValidation(msg) => {
                format!(
                    "Configuration validation error: {}\n\n\
                    💡 Check config.toml for:\n\
                    - Positive growth_rate, order_pairs and order_size\n\
                    - fast_interval_secs not above normal_interval_secs",
                    msg
                )
            }
            TradingError::SanityCheckFailed(msg) => {
                format!(
                    "Sanity check failed, data screwy: {}\n\n\
                    💡 The first ladder levels would cross the market.\n\
                    Check growth_rate, decimal_places and --start-price.",
                    msg
                )
            }
            TradingError::ApiAuthentication(msg) => {
                format!(
                    "API authentication failed: {}\n\n\
                    💡 Check:\n\
                    - API key is correct\n\
                    - API secret is correct (base64)\n\
                    - Keys have trading permissions",
                    msg
                )
            }
            _ => self.to_string(),
        }
    }

    /// Transient venue failures that are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TradingError::ApiConnection(_)
                | TradingError::ApiTimeout(_)
                | TradingError::ApiRateLimit(_)
                | TradingError::ApiResponse(_)
                | TradingError::ApiAuthentication(_)
                | TradingError::OrderRejected(_)
        )
    }

    /// Invariant violations that must terminate the process
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TradingError::SanityCheckFailed(_) | TradingError::InvalidOrderSide(_)
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            TradingError::ConfigNotFound(_)
            | TradingError::ConfigParse(_)
            | TradingError::ConfigValidation(_) => "config",

            TradingError::ApiConnection(_)
            | TradingError::ApiAuthentication(_)
            | TradingError::ApiRateLimit(_)
            | TradingError::ApiResponse(_)
            | TradingError::ApiTimeout(_) => "api",

            TradingError::OrderRejected(_)
            | TradingError::OrderNotFound(_)
            | TradingError::InvalidOrderSide(_)
            | TradingError::SanityCheckFailed(_) => "trading",

            TradingError::FileRead(_) | TradingError::FileWrite(_) => "io",

            TradingError::Internal(_) => "internal",
        }
    }
}

impl From<io::Error> for TradingError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                TradingError::FileRead(err.to_string())
            }
            io::ErrorKind::TimedOut => TradingError::ApiTimeout(err.to_string()),
            io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset => {
                TradingError::ApiConnection(err.to_string())
            }
            _ => TradingError::Internal(format!("IO error: {}", err)),
        }
    }
}

impl From<serde_json::Error> for TradingError {
    fn from(err: serde_json::Error) -> Self {
        TradingError::ApiResponse(format!("JSON parse error: {}", err))
    }
}

impl From<toml::de::Error> for TradingError {
    fn from(err: toml::de::Error) -> Self {
        TradingError::ConfigParse(format!("TOML parse error: {}", err))
    }
}

impl From<reqwest::Error> for TradingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TradingError::ApiTimeout(err.to_string())
        } else if err.is_status() || err.is_decode() {
            TradingError::ApiResponse(err.to_string())
        } else {
            TradingError::ApiConnection(err.to_string())
        }
    }
}

impl From<crate::config::ConfigError> for TradingError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::FileNotFound(path) => TradingError::ConfigNotFound(path),
            ConfigError::FileRead(msg) => TradingError::FileRead(msg),
            ConfigError::FileWrite(msg) => TradingError::FileWrite(msg),
            ConfigError::Parse(msg) | ConfigError::Serialize(msg) => TradingError::ConfigParse(msg),
            ConfigError::Validation(msg) => TradingError::ConfigValidation(msg),
        }
    }
}

/// Result type alias using TradingError
pub type TradingResult<T> = Result<T, TradingError>;
