// Exchange gateway contract consumed by the ladder

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::core::types::{Balances, OpenOrder, Side, Ticker};
use crate::error::TradingResult;

/// Venue operations the bot depends on.
///
/// Implementations must be safe to call concurrently: the main loop and any
/// number of stop watchers share one gateway.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Place a limit order and return the venue's order id
    async fn place_order(&self, side: Side, price: Decimal, size: Decimal) -> TradingResult<String>;

    /// Cancel an order. Unknown or already-closed ids yield `TradingError::OrderNotFound`.
    async fn cancel_order(&self, order_id: &str) -> TradingResult<()>;

    async fn list_open_orders(&self) -> TradingResult<Vec<OpenOrder>>;

    async fn get_balances(&self) -> TradingResult<Balances>;

    async fn get_ticker(&self) -> TradingResult<Ticker>;

    async fn get_deposit_address(&self) -> TradingResult<String>;
}
