// Ladder command implementations
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};
use grid_ladder_bot::{
    Config, GridCalculator, LadderOrderManager, PollingScheduler, ResilientExchange, RestGateway,
    StopOutcome, StopWatcher, StopWatcherPool, TradingError, TradingResult,
};

/// REST gateway wrapped in the retrying facade, honouring the dry-run setting
pub fn build_exchange(config: &Config) -> TradingResult<ResilientExchange> {
    if !config.dry_run.enabled && !config.has_api_keys() {
        return Err(TradingError::ApiAuthentication(format!(
            "API key and secret are not set; add them to [exchange] or export {} and {}",
            grid_ladder_bot::config::API_KEY_ENV,
            grid_ladder_bot::config::API_SECRET_ENV
        )));
    }

    let gateway = RestGateway::new(&config.exchange)?;
    Ok(ResilientExchange::from_config(Arc::new(gateway), config))
}

pub async fn run_ladder(
    mut config: Config,
    start_price: Option<Decimal>,
    dry_run: bool,
) -> TradingResult<()> {
    if dry_run {
        config.dry_run.enabled = true;
    }

    if config.dry_run.enabled {
        info!("🧪 DRY RUN mode: orders are logged, not sent");
    } else {
        info!("🚀 LIVE TRADING {}/{}", config.exchange.base_currency, config.exchange.quote_currency);
        warn!("⚠️  Real money!");
    }

    let exchange = build_exchange(&config)?;
    let mut manager = LadderOrderManager::from_config(exchange.clone(), &config);

    manager.initialize(start_price).await?;

    if exchange.is_dry_run() {
        info!("🧪 Dry run complete: {} orders would rest on the book", manager.orders().len());
        return Ok(());
    }

    let watcher = StopWatcher::new(exchange, &config.stop_watch);
    let mut pool = StopWatcherPool::new();
    for stop in &config.stop_orders {
        pool.push(watcher.spawn(stop.to_stop_order()));
    }

    info!(
        "⏱️  Polling every {}s ({}s after fills), Ctrl-C to stop",
        config.polling.normal_interval_secs, config.polling.fast_interval_secs
    );

    let scheduler = PollingScheduler::new(&config.polling);
    tokio::select! {
        result = manager.run(scheduler, None) => result?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("🛑 Ctrl-C received, {} ladder orders left resting", manager.orders().len());
        }
    }

    if !pool.is_empty() {
        pool.cancel_all();
        for outcome in pool.join_all().await {
            match outcome? {
                StopOutcome::Executed { order_id, last_price } => {
                    info!("⚡ Stop order {} executed at last {}", order_id, last_price)
                }
                StopOutcome::Cancelled => info!("Stop order cancelled"),
            }
        }
    }

    Ok(())
}

pub async fn show_status(config: &Config) -> TradingResult<()> {
    let exchange = build_exchange(config)?;

    let ticker = exchange.get_ticker().await;
    let data = exchange.get_trade_data().await;

    info!("📊 Ladder Status");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        "💱 {}/{} last {} bid {} ask {}",
        config.exchange.base_currency, config.exchange.quote_currency, ticker.last, ticker.bid, ticker.ask
    );
    info!(
        "💰 {} {} / {} {}",
        data.balances.base, config.exchange.base_currency, data.balances.quote, config.exchange.quote_currency
    );
    info!("📋 Open orders: {}", data.orders.len());
    for order in &data.orders {
        info!("   {} {}@{} id: {}", order.side, order.size, order.price, order.id);
    }

    let pairs = config.grid.order_pairs as i64;
    let mut calculator = GridCalculator::new(ticker.last, &config.grid);
    info!("🪜 Ladder at last price ({} pairs, {} step):", pairs, config.grid.growth_rate);
    for index in (-pairs..=pairs).rev() {
        if index == 0 {
            info!("   ---- {} ----", ticker.last);
            continue;
        }
        let level = calculator.level(index)?;
        let side = if index > 0 { "Sell" } else { "Buy " };
        info!("   {:>3} {} {}@{}", index, side, level.size, level.price);
    }
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    Ok(())
}

pub async fn show_deposit_address(config: &Config) -> TradingResult<()> {
    let exchange = build_exchange(config)?;
    let manager = LadderOrderManager::from_config(exchange, config);

    let address = manager.deposit_address().await;
    info!("🏦 {} deposit address: {}", config.exchange.base_currency, address);
    Ok(())
}
