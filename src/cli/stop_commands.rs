// Stop order command
use rust_decimal::Decimal;
use tracing::info;
use grid_ladder_bot::{
    Config, Side, StopOrder, StopOutcome, StopWatcher, TradingResult, TriggerDirection,
};

use crate::ladder_commands::build_exchange;

pub async fn run_stop_order(
    mut config: Config,
    trigger: Decimal,
    side: Side,
    size: Decimal,
    direction: Option<TriggerDirection>,
    dry_run: bool,
) -> TradingResult<()> {
    if dry_run {
        config.dry_run.enabled = true;
    }

    let order = match direction {
        Some(direction) => StopOrder {
            trigger_price: trigger,
            direction,
            side,
            size,
        },
        None => StopOrder::for_side(side, trigger, size),
    };

    let exchange = build_exchange(&config)?;
    let watcher = StopWatcher::new(exchange, &config.stop_watch);
    info!(
        "👀 Checking price every {}s, limit {} when triggered",
        config.stop_watch.poll_interval_secs,
        watcher.limit_price(side)
    );

    let mut handle = watcher.spawn(order);
    let outcome = tokio::select! {
        outcome = handle.outcome() => outcome?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("🛑 Ctrl-C received, cancelling stop order");
            handle.cancel();
            handle.outcome().await?
        }
    };

    match outcome {
        StopOutcome::Executed { order_id, last_price } => {
            info!("✅ Stop order sent at last {}, id: {}", last_price, order_id);
        }
        StopOutcome::Cancelled => info!("Stop order cancelled before triggering"),
    }
    Ok(())
}
