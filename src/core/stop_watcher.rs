// Stop-order watchers
//
// Each watcher is an independent tokio task that polls the ticker until its
// trigger is crossed, then sends one deeply marketable limit order. Watchers
// hold their own clone of the exchange facade and never touch the ladder.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::StopWatchConfig;
use crate::core::exchange::ResilientExchange;
use crate::core::types::Side;
use crate::error::{TradingError, TradingResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerDirection {
    /// Fires once `last >= trigger`
    RisesAbove,
    /// Fires once `last <= trigger`
    FallsBelow,
}

impl TriggerDirection {
    pub fn is_hit(&self, last: Decimal, trigger: Decimal) -> bool {
        match self {
            TriggerDirection::RisesAbove => last >= trigger,
            TriggerDirection::FallsBelow => last <= trigger,
        }
    }
}

impl fmt::Display for TriggerDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerDirection::RisesAbove => write!(f, "rises above"),
            TriggerDirection::FallsBelow => write!(f, "falls below"),
        }
    }
}

impl FromStr for TriggerDirection {
    type Err = TradingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rises_above" | "above" | "up" => Ok(TriggerDirection::RisesAbove),
            "falls_below" | "below" | "down" => Ok(TriggerDirection::FallsBelow),
            other => Err(TradingError::Internal(format!("unknown trigger direction: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopOrder {
    pub trigger_price: Decimal,
    pub direction: TriggerDirection,
    pub side: Side,
    pub size: Decimal,
}

impl StopOrder {
    /// Buys wait for the price to rise, sells for it to fall
    pub fn for_side(side: Side, trigger_price: Decimal, size: Decimal) -> Self {
        let direction = match side {
            Side::Buy => TriggerDirection::RisesAbove,
            Side::Sell => TriggerDirection::FallsBelow,
        };
        Self {
            trigger_price,
            direction,
            side,
            size,
        }
    }

    pub fn stop_buy(trigger_price: Decimal, size: Decimal) -> Self {
        Self::for_side(Side::Buy, trigger_price, size)
    }

    pub fn stop_sell(trigger_price: Decimal, size: Decimal) -> Self {
        Self::for_side(Side::Sell, trigger_price, size)
    }

    pub fn is_triggered(&self, last: Decimal) -> bool {
        self.direction.is_hit(last, self.trigger_price)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    Executed { order_id: String, last_price: Decimal },
    Cancelled,
}

/// Spawns stop watchers with a shared poll interval and limit prices
#[derive(Clone)]
pub struct StopWatcher {
    exchange: ResilientExchange,
    poll_interval: Duration,
    buy_limit_price: Decimal,
    sell_limit_price: Decimal,
}

impl StopWatcher {
    pub fn new(exchange: ResilientExchange, config: &StopWatchConfig) -> Self {
        Self {
            exchange,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            buy_limit_price: config.buy_limit_price,
            sell_limit_price: config.sell_limit_price,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn limit_price(&self, side: Side) -> Decimal {
        match side {
            Side::Buy => self.buy_limit_price,
            Side::Sell => self.sell_limit_price,
        }
    }

    pub fn spawn(&self, order: StopOrder) -> StopWatcherHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (outcome_tx, outcome_rx) = oneshot::channel();

        info!(
            "🛑 Stop order: {} {}@{} (when price {})",
            order.side, order.size, order.trigger_price, order.direction
        );

        let exchange = self.exchange.clone();
        let poll_interval = self.poll_interval;
        let limit_price = self.limit_price(order.side);

        let task = tokio::spawn(async move {
            let outcome = watch_and_execute(exchange, order, poll_interval, limit_price, cancel_rx).await;
            // Receiver is gone when the handle was dropped
            let _ = outcome_tx.send(outcome);
        });

        StopWatcherHandle {
            cancel_tx,
            outcome_rx,
            task,
        }
    }
}

async fn watch_and_execute(
    exchange: ResilientExchange,
    order: StopOrder,
    poll_interval: Duration,
    limit_price: Decimal,
    mut cancel_rx: watch::Receiver<bool>,
) -> StopOutcome {
    let last_price = loop {
        let ticker = tokio::select! {
            biased;
            _ = wait_cancelled(&mut cancel_rx) => return StopOutcome::Cancelled,
            ticker = exchange.get_ticker() => ticker,
        };

        if order.is_triggered(ticker.last) {
            break ticker.last;
        }
        debug!("stop {} {} not hit, last {}", order.side, order.trigger_price, ticker.last);

        tokio::select! {
            biased;
            _ = wait_cancelled(&mut cancel_rx) => return StopOutcome::Cancelled,
            _ = sleep(poll_interval) => {}
        }
    };

    info!(
        "⚡ Executing stop order: {} {}@{} (last {})",
        order.side, order.size, order.trigger_price, last_price
    );
    let order_id = exchange.place_order(order.side, limit_price, order.size).await;

    StopOutcome::Executed {
        order_id,
        last_price,
    }
}

/// Resolves once the flag is set. A dropped sender never resolves it.
pub(crate) async fn wait_cancelled(cancel_rx: &mut watch::Receiver<bool>) {
    loop {
        if *cancel_rx.borrow_and_update() {
            return;
        }
        if cancel_rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Handle to a running stop watcher.
///
/// Dropping the handle leaves the watcher running.
pub struct StopWatcherHandle {
    cancel_tx: watch::Sender<bool>,
    outcome_rx: oneshot::Receiver<StopOutcome>,
    task: JoinHandle<()>,
}

impl StopWatcherHandle {
    /// Request cancellation. Has no effect once the order has been sent.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the watcher to finish. Safe to call again after the returned
    /// future is dropped unfinished.
    pub async fn outcome(&mut self) -> TradingResult<StopOutcome> {
        (&mut self.outcome_rx)
            .await
            .map_err(|_| TradingError::Internal("stop watcher ended without an outcome".to_string()))
    }
}

/// Collection of watchers started together
#[derive(Default)]
pub struct StopWatcherPool {
    handles: Vec<StopWatcherHandle>,
}

impl StopWatcherPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: StopWatcherHandle) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn cancel_all(&self) {
        for handle in &self.handles {
            handle.cancel();
        }
    }

    /// Wait for every watcher, in spawn order
    pub async fn join_all(self) -> Vec<TradingResult<StopOutcome>> {
        let mut outcomes = Vec::with_capacity(self.handles.len());
        for mut handle in self.handles {
            outcomes.push(handle.outcome().await);
        }
        outcomes
    }
}
