// In-memory venue for simulations and tests

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::clients::gateway::ExchangeGateway;
use crate::core::types::{Balances, OpenOrder, Side, Ticker};
use crate::error::{TradingError, TradingResult};

#[derive(Debug, Default)]
struct VenueState {
    ticker: Option<Ticker>,
    balances: Balances,
    orders: BTreeMap<u64, OpenOrder>,
    next_id: u64,
    pending_failures: u32,
    placed: Vec<OpenOrder>,
    cancelled: Vec<String>,
    deposit_address: String,
}

/// A venue that keeps its book in memory.
///
/// Orders rest until [`InMemoryExchange::fill`] removes them. Transient
/// failures can be injected with [`InMemoryExchange::fail_next`]; each
/// injected failure is consumed by the next gateway call of any kind.
#[derive(Debug, Default)]
pub struct InMemoryExchange {
    state: Mutex<VenueState>,
}

impl InMemoryExchange {
    pub fn new(ticker: Ticker, balances: Balances) -> Self {
        let exchange = Self::default();
        {
            let mut state = exchange.lock();
            state.ticker = Some(ticker);
            state.balances = balances;
            state.next_id = 1;
            state.deposit_address = "1LadderDepositAddress".to_string();
        }
        exchange
    }

    fn lock(&self) -> MutexGuard<'_, VenueState> {
        // A panicking test thread must not wedge the other callers
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn take_failure(state: &mut VenueState, operation: &str) -> TradingResult<()> {
        if state.pending_failures > 0 {
            state.pending_failures -= 1;
            return Err(TradingError::ApiConnection(format!("injected failure in {}", operation)));
        }
        Ok(())
    }

    pub fn set_ticker(&self, ticker: Ticker) {
        self.lock().ticker = Some(ticker);
    }

    pub fn set_last_price(&self, last: Decimal) {
        let mut state = self.lock();
        if let Some(ticker) = state.ticker.as_mut() {
            ticker.last = last;
        }
    }

    pub fn set_balances(&self, balances: Balances) {
        self.lock().balances = balances;
    }

    /// Make the next `count` calls fail with a transient error
    pub fn fail_next(&self, count: u32) {
        self.lock().pending_failures = count;
    }

    /// Remove a resting order as if it traded. Returns false for unknown ids.
    pub fn fill(&self, order_id: &str) -> bool {
        let mut state = self.lock();
        let key = state
            .orders
            .iter()
            .find(|(_, o)| o.id == order_id)
            .map(|(k, _)| *k);
        match key {
            Some(k) => state.orders.remove(&k).is_some(),
            None => false,
        }
    }

    /// Seed a resting order that the bot did not place
    pub fn insert_open_order(&self, order: OpenOrder) {
        let mut state = self.lock();
        let key = state.next_id;
        state.next_id += 1;
        state.orders.insert(key, order);
    }

    pub fn open_orders(&self) -> Vec<OpenOrder> {
        self.lock().orders.values().cloned().collect()
    }

    pub fn placed_orders(&self) -> Vec<OpenOrder> {
        self.lock().placed.clone()
    }

    pub fn placed_count(&self) -> usize {
        self.lock().placed.len()
    }

    pub fn cancelled_ids(&self) -> Vec<String> {
        self.lock().cancelled.clone()
    }
}

#[async_trait]
impl ExchangeGateway for InMemoryExchange {
    async fn place_order(&self, side: Side, price: Decimal, size: Decimal) -> TradingResult<String> {
        let mut state = self.lock();
        Self::take_failure(&mut state, "place_order")?;

        let key = state.next_id;
        state.next_id += 1;
        let order = OpenOrder {
            id: format!("mem-{}", key),
            side,
            price,
            size,
        };
        state.orders.insert(key, order.clone());
        state.placed.push(order.clone());
        Ok(order.id)
    }

    async fn cancel_order(&self, order_id: &str) -> TradingResult<()> {
        let mut state = self.lock();
        Self::take_failure(&mut state, "cancel_order")?;

        let key = state
            .orders
            .iter()
            .find(|(_, o)| o.id == order_id)
            .map(|(k, _)| *k)
            .ok_or_else(|| TradingError::OrderNotFound(order_id.to_string()))?;
        state.orders.remove(&key);
        state.cancelled.push(order_id.to_string());
        Ok(())
    }

    async fn list_open_orders(&self) -> TradingResult<Vec<OpenOrder>> {
        let mut state = self.lock();
        Self::take_failure(&mut state, "list_open_orders")?;
        Ok(state.orders.values().cloned().collect())
    }

    async fn get_balances(&self) -> TradingResult<Balances> {
        let mut state = self.lock();
        Self::take_failure(&mut state, "get_balances")?;
        Ok(state.balances)
    }

    async fn get_ticker(&self) -> TradingResult<Ticker> {
        let mut state = self.lock();
        Self::take_failure(&mut state, "get_ticker")?;
        state
            .ticker
            .ok_or_else(|| TradingError::ApiResponse("no ticker configured".to_string()))
    }

    async fn get_deposit_address(&self) -> TradingResult<String> {
        let mut state = self.lock();
        Self::take_failure(&mut state, "get_deposit_address")?;
        Ok(state.deposit_address.clone())
    }
}
