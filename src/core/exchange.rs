// Resilient facade over the exchange gateway
//
// Every venue call made by the ladder or a stop watcher goes through here and
// is retried until it succeeds. Dry-run mode is also handled at this layer so
// the ladder logic is identical in both modes.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::clients::ExchangeGateway;
use crate::config::{Config, DryRunConfig};
use crate::core::retry::RetryPolicy;
use crate::core::types::{Balances, Side, Ticker, TradeData};
use crate::error::TradingError;

#[derive(Clone)]
pub struct ResilientExchange {
    gateway: Arc<dyn ExchangeGateway>,
    policy: RetryPolicy,
    dry_run: Option<DryRunConfig>,
    inactive_prefix: String,
}

impl ResilientExchange {
    pub fn new(gateway: Arc<dyn ExchangeGateway>, policy: RetryPolicy) -> Self {
        Self {
            gateway,
            policy,
            dry_run: None,
            inactive_prefix: "X".to_string(),
        }
    }

    pub fn from_config(gateway: Arc<dyn ExchangeGateway>, config: &Config) -> Self {
        let exchange = Self::new(gateway, config.retry_policy())
            .with_inactive_prefix(&config.exchange.inactive_order_prefix);
        if config.dry_run.enabled {
            exchange.with_dry_run(config.dry_run.clone())
        } else {
            exchange
        }
    }

    pub fn with_dry_run(mut self, dry_run: DryRunConfig) -> Self {
        self.dry_run = Some(dry_run);
        self
    }

    pub fn with_inactive_prefix(mut self, prefix: &str) -> Self {
        self.inactive_prefix = prefix.to_string();
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run.is_some()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn get_ticker(&self) -> Ticker {
        self.policy
            .retry_forever("get_ticker", || self.gateway.get_ticker())
            .await
    }

    /// Balances plus the open-order set. Dry runs report the configured
    /// balances and an empty book.
    pub async fn get_trade_data(&self) -> TradeData {
        if let Some(dry) = &self.dry_run {
            return TradeData {
                balances: Balances {
                    base: dry.base_balance,
                    quote: dry.quote_balance,
                },
                orders: Vec::new(),
            };
        }

        let orders = self
            .policy
            .retry_forever("list_open_orders", || self.gateway.list_open_orders())
            .await;
        let balances = self
            .policy
            .retry_forever("get_balances", || self.gateway.get_balances())
            .await;

        TradeData { balances, orders }
    }

    /// Cancel every open order on the venue, skipping ones already marked
    /// inactive. Returns the number of orders cancelled.
    pub async fn cancel_all_orders(&self) -> usize {
        if self.is_dry_run() {
            return 0;
        }

        let orders = self
            .policy
            .retry_forever("list_open_orders", || self.gateway.list_open_orders())
            .await;

        let mut cancelled = 0;
        for order in orders {
            if order.is_inactive(&self.inactive_prefix) {
                continue;
            }

            info!("Cancelling: {} {}@{}", order.side.as_str(), order.size, order.price);
            if self.cancel_order(&order.id).await {
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Cancel one order, returning false if the venue no longer knows it
    pub async fn cancel_order(&self, order_id: &str) -> bool {
        if self.is_dry_run() {
            return false;
        }

        let gateway = &self.gateway;
        self.policy
            .retry_forever("cancel_order", || async move {
                match gateway.cancel_order(order_id).await {
                    Ok(()) => Ok(true),
                    // Already gone; nothing left to retry
                    Err(TradingError::OrderNotFound(_)) => Ok(false),
                    Err(e) => Err(e),
                }
            })
            .await
    }

    /// Place a limit order and return its id. Dry runs only log the intent
    /// and hand back a synthetic id.
    pub async fn place_order(&self, side: Side, price: Decimal, size: Decimal) -> String {
        if self.is_dry_run() {
            info!("{}: {}@{} (dry run)", side, size, price);
            return format!("dry-{}", Uuid::new_v4());
        }

        let order_id = self
            .policy
            .retry_forever("place_order", || self.gateway.place_order(side, price, size))
            .await;
        info!("{}: {}@{} id: {}", side, size, price, order_id);
        order_id
    }

    pub async fn deposit_address(&self) -> String {
        self.policy
            .retry_forever("get_deposit_address", || self.gateway.get_deposit_address())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InMemoryExchange;
    use crate::core::types::OpenOrder;
    use rust_decimal_macros::dec;

    fn venue() -> Arc<InMemoryExchange> {
        Arc::new(InMemoryExchange::new(
            Ticker { last: dec!(100), bid: dec!(99.9), ask: dec!(100.1) },
            Balances { base: dec!(2), quote: dec!(500) },
        ))
    }

    #[tokio::test]
    async fn test_cancel_all_skips_inactive_orders() {
        let venue = venue();
        venue.insert_open_order(OpenOrder {
            id: "X-closed".to_string(),
            side: Side::Buy,
            price: dec!(90),
            size: dec!(1),
        });
        venue.insert_open_order(OpenOrder {
            id: "live-1".to_string(),
            side: Side::Sell,
            price: dec!(110),
            size: dec!(1),
        });

        let exchange = ResilientExchange::new(venue.clone(), RetryPolicy::immediate());
        assert_eq!(exchange.cancel_all_orders().await, 1);
        assert_eq!(venue.cancelled_ids(), vec!["live-1".to_string()]);
        assert_eq!(venue.open_orders().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_order_tolerates_unknown_id() {
        let venue = venue();
        let exchange = ResilientExchange::new(venue.clone(), RetryPolicy::immediate());
        let id = exchange.place_order(Side::Sell, dec!(101), dec!(1)).await;

        venue.fail_next(2);
        assert!(exchange.cancel_order(&id).await);
        assert!(!exchange.cancel_order(&id).await);
        assert!(!exchange.cancel_order("never-placed").await);
        assert_eq!(venue.cancelled_ids(), vec![id]);
    }

    #[tokio::test]
    async fn test_calls_survive_transient_failures() {
        let venue = venue();
        venue.fail_next(3);
        let exchange = ResilientExchange::new(venue.clone(), RetryPolicy::immediate());

        let ticker = exchange.get_ticker().await;
        assert_eq!(ticker.last, dec!(100));
    }

    #[tokio::test]
    async fn test_dry_run_never_touches_orders() {
        let venue = venue();
        let exchange = ResilientExchange::new(venue.clone(), RetryPolicy::immediate())
            .with_dry_run(DryRunConfig::default());

        let id = exchange.place_order(Side::Buy, dec!(99), dec!(0.1)).await;
        assert!(id.starts_with("dry-"));
        assert_eq!(venue.placed_count(), 0);

        let data = exchange.get_trade_data().await;
        assert_eq!(data.balances.base, dec!(100));
        assert_eq!(data.balances.quote, dec!(400));
        assert!(data.orders.is_empty());
    }
}
