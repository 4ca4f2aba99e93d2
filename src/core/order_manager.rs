// Ladder order manager: builds the ladder and keeps it populated

use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::{Config, GridConfig};
use crate::core::exchange::ResilientExchange;
use crate::core::grid_calculator::GridCalculator;
use crate::core::profit::{ProfitLog, ProfitReport, SessionBaseline};
use crate::core::scheduler::PollingScheduler;
use crate::core::stop_watcher::wait_cancelled;
use crate::core::types::{Balances, Side, TrackedOrder};
use crate::error::{TradingError, TradingResult};

/// Result of one reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    /// Tracked orders that disappeared from the venue, ascending by index
    pub fills: Vec<TrackedOrder>,
    /// Orders placed during the pass, replacements and backfill
    pub placed: usize,
    pub profit: Option<ProfitReport>,
}

impl ReconcileOutcome {
    pub fn has_fills(&self) -> bool {
        !self.fills.is_empty()
    }

    pub fn fill_count(&self) -> usize {
        self.fills.len()
    }
}

/// Owns the index → order ladder.
///
/// Buys sit at negative indices and sells at positive ones. Whenever a tracked
/// order vanishes from the venue's open orders it is treated as filled and the
/// opposite side is placed one step across the gap.
pub struct LadderOrderManager {
    exchange: ResilientExchange,
    grid: GridConfig,
    calculator: Option<GridCalculator>,
    orders: BTreeMap<i64, TrackedOrder>,
    baseline: Option<SessionBaseline>,
    profit_log: Option<ProfitLog>,
}

impl LadderOrderManager {
    pub fn new(exchange: ResilientExchange, grid: GridConfig) -> Self {
        Self {
            exchange,
            grid,
            calculator: None,
            orders: BTreeMap::new(),
            baseline: None,
            profit_log: None,
        }
    }

    pub fn from_config(exchange: ResilientExchange, config: &Config) -> Self {
        Self::new(exchange, config.grid.clone())
            .with_profit_log(ProfitLog::new(&config.logging.profit_log))
    }

    pub fn with_profit_log(mut self, profit_log: ProfitLog) -> Self {
        self.profit_log = Some(profit_log);
        self
    }

    pub fn orders(&self) -> &BTreeMap<i64, TrackedOrder> {
        &self.orders
    }

    pub fn baseline(&self) -> Option<&SessionBaseline> {
        self.baseline.as_ref()
    }

    pub fn calculator(&self) -> Option<&GridCalculator> {
        self.calculator.as_ref()
    }

    pub fn buy_count(&self) -> usize {
        self.orders.values().filter(|o| o.side == Side::Buy).count()
    }

    pub fn sell_count(&self) -> usize {
        self.orders.values().filter(|o| o.side == Side::Sell).count()
    }

    /// Cancel whatever is resting, capture the session baseline and lay out
    /// `order_pairs` buys below and sells above the reference price.
    pub async fn initialize(&mut self, start_price: Option<Decimal>) -> TradingResult<()> {
        let cancelled = self.exchange.cancel_all_orders().await;
        if cancelled > 0 {
            info!("🧹 Cancelled {} open orders", cancelled);
        }
        self.orders.clear();

        let ticker = self.exchange.get_ticker().await;
        let reference_price = start_price.unwrap_or(ticker.last);

        let trade_data = self.exchange.get_trade_data().await;
        let baseline = SessionBaseline::new(reference_price, trade_data.balances);
        info!(
            "💰 Base: {} Quote: {}, Starting Price: {}",
            baseline.start_base_balance, baseline.start_quote_balance, baseline.start_price
        );
        self.baseline = Some(baseline);

        let pairs = self.grid.order_pairs as i64;
        let mut calculator = GridCalculator::new(reference_price, &self.grid);
        let lowest_sell = calculator.price(1);
        let highest_buy = calculator.price(-1);
        let worthless = (1..=pairs).map(|i| -i).find(|i| calculator.price(*i) <= Decimal::ZERO);
        self.calculator = Some(calculator);

        if let Some(index) = worthless {
            error!(
                "❌ Sanity check failed: buy {} rounds to a non-positive price at {} decimal places",
                index, self.grid.decimal_places
            );
            return Err(TradingError::SanityCheckFailed(format!(
                "buy level {} below reference {} has no positive price",
                index, reference_price
            )));
        }

        if highest_buy >= ticker.ask || lowest_sell <= ticker.bid {
            error!(
                "❌ Sanity check failed: ladder {} / {} crosses market {} / {}",
                highest_buy, lowest_sell, ticker.bid, ticker.ask
            );
            return Err(TradingError::SanityCheckFailed(format!(
                "first buy {} must be below ask {} and first sell {} above bid {}",
                highest_buy, ticker.ask, lowest_sell, ticker.bid
            )));
        }

        for i in 1..=pairs {
            self.place_order(-i, Side::Buy).await?;
            self.place_order(i, Side::Sell).await?;
        }

        info!(
            "🪜 Ladder ready: {} buys, {} sells around {}",
            self.buy_count(),
            self.sell_count(),
            reference_price
        );
        Ok(())
    }

    /// Place the order for `index` and track it, replacing any entry already there
    pub async fn place_order(&mut self, index: i64, side: Side) -> TradingResult<()> {
        self.place_tracked(index, side).await?;
        Ok(())
    }

    /// Place and track, handing back whatever entry the new order displaced
    async fn place_tracked(&mut self, index: i64, side: Side) -> TradingResult<Option<TrackedOrder>> {
        let level = self
            .calculator
            .as_mut()
            .ok_or_else(|| TradingError::Internal("ladder is not initialized".to_string()))?
            .level(index)?;

        let order_id = self.exchange.place_order(side, level.price, level.size).await;
        let order = TrackedOrder {
            index,
            exchange_order_id: order_id,
            side,
            price: level.price,
            size: level.size,
        };

        let previous = self.orders.insert(index, order);
        if let Some(previous) = &previous {
            warn!(
                "Index {} was still tracking {} {} ({}), now replaced",
                index, previous.side, previous.exchange_order_id, previous.price
            );
        }
        Ok(previous)
    }

    /// One reconciliation pass: detect fills, place replacements, restore
    /// ladder depth and report profit when anything traded.
    pub async fn check_orders(&mut self) -> TradingResult<ReconcileOutcome> {
        let trade_data = self.exchange.get_trade_data().await;
        let live: HashSet<&str> = trade_data.orders.iter().map(|o| o.id.as_str()).collect();

        let fills: Vec<TrackedOrder> = self
            .orders
            .values()
            .filter(|o| !live.contains(o.exchange_order_id.as_str()))
            .cloned()
            .collect();

        let filled_ids: HashSet<String> =
            fills.iter().map(|o| o.exchange_order_id.clone()).collect();
        let mut outcome = ReconcileOutcome::default();

        for filled in &fills {
            info!(
                "✅ Order filled, id: {} ({} {}@{})",
                filled.exchange_order_id, filled.side, filled.size, filled.price
            );

            // An earlier replacement may already occupy this index
            let still_tracked = self
                .orders
                .get(&filled.index)
                .map(|o| o.exchange_order_id == filled.exchange_order_id)
                .unwrap_or(false);
            if still_tracked {
                self.orders.remove(&filled.index);
            }

            let index = match filled.side {
                Side::Buy => filled.index + 1,
                Side::Sell => filled.index - 1,
            };
            let displaced = self.place_tracked(index, filled.side.opposite()).await?;
            outcome.placed += 1;

            // A displaced order that has not filled would rest on the venue untracked
            if let Some(displaced) = displaced {
                if !filled_ids.contains(&displaced.exchange_order_id)
                    && self.exchange.cancel_order(&displaced.exchange_order_id).await
                {
                    info!("🧹 Cancelled displaced order {}", displaced.exchange_order_id);
                }
            }
        }

        outcome.placed += self.backfill().await?;

        if let Some(last_fill) = fills.last() {
            outcome.profit = self.report_profit(trade_data.balances, last_fill.price);
        }
        outcome.fills = fills;
        Ok(outcome)
    }

    /// Top each side back up to `order_pairs`, extending outward from the
    /// current extremes. A side with no orders left keeps a one-index gap.
    async fn backfill(&mut self) -> TradingResult<usize> {
        let pairs = self.grid.order_pairs;
        let buys = self.buy_count();
        let sells = self.sell_count();
        let low = self.orders.keys().next().copied().unwrap_or(0);
        let high = self.orders.keys().next_back().copied().unwrap_or(0);
        let mut placed = 0;

        if buys < pairs {
            let anchor = if buys == 0 { low - 1 } else { low };
            for i in 1..=(pairs - buys) as i64 {
                self.place_order(anchor - i, Side::Buy).await?;
                placed += 1;
            }
        }

        if sells < pairs {
            let anchor = if sells == 0 { high + 1 } else { high };
            for i in 1..=(pairs - sells) as i64 {
                self.place_order(anchor + i, Side::Sell).await?;
                placed += 1;
            }
        }

        Ok(placed)
    }

    fn report_profit(&self, balances: Balances, trade_price: Decimal) -> Option<ProfitReport> {
        let report = self.baseline.as_ref()?.report(balances, trade_price);
        info!(
            "💹 Profit: {} base {} quote, Implied Price: {}, Run Time: {:.0}s",
            report.base_profit,
            report.quote_profit,
            report.implied_price_display(),
            report.elapsed_secs
        );

        if let Some(log) = &self.profit_log {
            if let Err(e) = log.append(&report) {
                warn!("Could not append to profit log {}: {}", log.path().display(), e);
            }
        }
        Some(report)
    }

    /// Poll forever, or until `shutdown` flips to true
    pub async fn run(
        &mut self,
        mut scheduler: PollingScheduler,
        mut shutdown: Option<watch::Receiver<bool>>,
    ) -> TradingResult<()> {
        if let Some(log) = &self.profit_log {
            log.write_run_header(&self.grid)?;
        }

        loop {
            let interval = scheduler.next_interval();
            match shutdown.as_mut() {
                Some(rx) => {
                    tokio::select! {
                        biased;
                        _ = wait_cancelled(rx) => {
                            info!("🛑 Shutdown requested, leaving {} orders resting", self.orders.len());
                            return Ok(());
                        }
                        _ = sleep(interval) => {}
                    }
                }
                None => sleep(interval).await,
            }

            let outcome = self.check_orders().await?;
            if outcome.has_fills() {
                scheduler.record_fill();
            }
        }
    }

    pub async fn deposit_address(&self) -> String {
        self.exchange.deposit_address().await
    }
}
