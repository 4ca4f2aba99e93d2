// Common test utilities and helpers
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use grid_ladder_bot::{
    Balances, Config, GridConfig, InMemoryExchange, LadderOrderManager, ProfitLog,
    ResilientExchange, RetryPolicy, Ticker,
};
use rust_decimal_macros::dec;
use tempfile::TempDir;

/// Create a test configuration with sensible defaults
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.grid = GridConfig {
        growth_rate: dec!(0.01),
        order_pairs: 3,
        order_size: dec!(1),
        decimal_places: 5,
        size_decimal_places: 8,
    };
    config.retry.delay_ms = 0;
    config
}

/// Venue quoting 100 with a tight spread
pub fn create_test_venue() -> Arc<InMemoryExchange> {
    Arc::new(InMemoryExchange::new(
        Ticker { last: dec!(100), bid: dec!(99.95), ask: dec!(100.05) },
        Balances { base: dec!(10), quote: dec!(1000) },
    ))
}

pub fn create_test_exchange(venue: &Arc<InMemoryExchange>) -> ResilientExchange {
    ResilientExchange::new(venue.clone(), RetryPolicy::immediate())
}

/// Manager over the given venue with its profit log in a temp directory
pub fn create_test_manager(
    venue: &Arc<InMemoryExchange>,
    config: &Config,
) -> (LadderOrderManager, TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let log_path = temp_dir.path().join("logs").join("profit_log.csv");
    let manager = LadderOrderManager::new(create_test_exchange(venue), config.grid.clone())
        .with_profit_log(ProfitLog::new(&log_path));
    (manager, temp_dir, log_path)
}

/// Exchange id of the order tracked at `index`
pub fn order_id_at(manager: &LadderOrderManager, index: i64) -> String {
    manager
        .orders()
        .get(&index)
        .map(|o| o.exchange_order_id.clone())
        .unwrap_or_else(|| panic!("no order tracked at index {}", index))
}
