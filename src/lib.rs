// Grid Ladder Bot Library
//
// Keeps a symmetric ladder of limit orders around a reference price on a spot
// venue, replaces fills across the gap and tracks realized profit.

pub mod core;
pub mod clients;
pub mod config;
pub mod error;       // Unified error handling

// Re-export core ladder types
pub use core::{
    Balances, GridCalculator, GridLevel, LadderOrderManager, OpenOrder, PollMode, PollingScheduler,
    ProfitLog, ProfitReport, ReconcileOutcome, ResilientExchange, RetryPolicy, SessionBaseline,
    Side, StopOrder, StopOutcome, StopWatcher, StopWatcherHandle, StopWatcherPool, Ticker,
    TrackedOrder, TradeData, TriggerDirection,
};

// Re-export error types
pub use error::{TradingError, TradingResult};

// Re-export client types
pub use clients::{ExchangeGateway, InMemoryExchange, RestGateway};

// Re-export configuration
pub use config::{
    Config, ConfigError, DryRunConfig, ExchangeConfig, GridConfig, LoggingConfig, PollingConfig,
    RetryConfig, StopOrderConfig, StopWatchConfig,
};
