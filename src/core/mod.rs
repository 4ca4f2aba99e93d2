// Core ladder logic modules

pub mod exchange;
pub mod grid_calculator;
pub mod order_manager;
pub mod profit;
pub mod retry;
pub mod scheduler;
pub mod stop_watcher;
pub mod types;

// Re-export commonly used types
pub use exchange::ResilientExchange;
pub use grid_calculator::GridCalculator;
pub use order_manager::{LadderOrderManager, ReconcileOutcome};
pub use profit::{ProfitLog, ProfitReport, SessionBaseline};
pub use retry::RetryPolicy;
pub use scheduler::{PollMode, PollingScheduler};
pub use stop_watcher::{
    StopOrder, StopOutcome, StopWatcher, StopWatcherHandle, StopWatcherPool, TriggerDirection,
};
pub use types::{Balances, GridLevel, OpenOrder, Side, Ticker, TrackedOrder, TradeData};
