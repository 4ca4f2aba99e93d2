// Integration tests for the ladder order manager against the in-memory venue

mod common;

use std::fs;

use common::{create_test_config, create_test_exchange, create_test_manager, create_test_venue, order_id_at};
use grid_ladder_bot::{
    Balances, DryRunConfig, LadderOrderManager, OpenOrder, PollingScheduler, Side, Ticker,
    TradingError,
};
use rust_decimal_macros::dec;
use tokio::sync::watch;
use tokio_test::{assert_err, assert_ok};

fn keys(manager: &LadderOrderManager) -> Vec<i64> {
    manager.orders().keys().copied().collect()
}

#[tokio::test]
async fn test_initialize_builds_symmetric_ladder() {
    let venue = create_test_venue();
    let config = create_test_config();
    let (mut manager, _dir, _log) = create_test_manager(&venue, &config);

    assert_ok!(manager.initialize(None).await);

    assert_eq!(keys(&manager), vec![-3, -2, -1, 1, 2, 3]);
    assert_eq!(manager.buy_count(), 3);
    assert_eq!(manager.sell_count(), 3);
    assert_eq!(venue.placed_count(), 6);

    for order in manager.orders().values() {
        match order.side {
            Side::Buy => assert!(order.index < 0 && order.price < dec!(100)),
            Side::Sell => assert!(order.index > 0 && order.price > dec!(100)),
        }
    }

    let baseline = manager.baseline().expect("baseline captured");
    assert_eq!(baseline.start_price, dec!(100));
    assert_eq!(baseline.start_base_balance, dec!(10));
    assert_eq!(baseline.start_quote_balance, dec!(1000));
}

#[tokio::test]
async fn test_start_price_overrides_last_trade() {
    let venue = create_test_venue();
    let config = create_test_config();
    let (mut manager, _dir, _log) = create_test_manager(&venue, &config);

    assert_ok!(manager.initialize(Some(dec!(100.02))).await);

    assert_eq!(manager.baseline().map(|b| b.start_price), Some(dec!(100.02)));
    assert_eq!(manager.calculator().map(|c| c.reference_price()), Some(dec!(100.02)));
    assert_eq!(manager.orders()[&1].price, dec!(101.0202));
}

#[tokio::test]
async fn test_sanity_check_failure_places_nothing() {
    let venue = create_test_venue();
    venue.set_ticker(Ticker { last: dec!(100), bid: dec!(101.5), ask: dec!(102) });
    let config = create_test_config();
    let (mut manager, _dir, _log) = create_test_manager(&venue, &config);

    let err = assert_err!(manager.initialize(None).await);

    assert!(matches!(err, TradingError::SanityCheckFailed(_)));
    assert!(err.is_fatal());
    assert_eq!(venue.placed_count(), 0);
    assert!(manager.orders().is_empty());
}

#[tokio::test]
async fn test_buy_level_rounding_to_zero_fails_sanity_check() {
    let venue = create_test_venue();
    venue.set_ticker(Ticker { last: dec!(0.5), bid: dec!(0.49), ask: dec!(0.51) });
    let mut config = create_test_config();
    config.grid.growth_rate = dec!(0.005);
    config.grid.decimal_places = 0;
    assert!(config.validate().is_ok());
    let (mut manager, _dir, _log) = create_test_manager(&venue, &config);

    let err = assert_err!(manager.initialize(None).await);

    assert!(matches!(err, TradingError::SanityCheckFailed(_)));
    assert!(err.is_fatal());
    assert_eq!(venue.placed_count(), 0);
    assert!(manager.orders().is_empty());
}

#[tokio::test]
async fn test_initialize_cancels_resting_orders_except_inactive() {
    let venue = create_test_venue();
    venue.insert_open_order(OpenOrder {
        id: "X-done".to_string(),
        side: Side::Buy,
        price: dec!(90),
        size: dec!(1),
    });
    venue.insert_open_order(OpenOrder {
        id: "old-1".to_string(),
        side: Side::Sell,
        price: dec!(120),
        size: dec!(1),
    });
    let config = create_test_config();
    let (mut manager, _dir, _log) = create_test_manager(&venue, &config);

    assert_ok!(manager.initialize(None).await);

    assert_eq!(venue.cancelled_ids(), vec!["old-1".to_string()]);
    assert_eq!(venue.open_orders().len(), 7);
}

#[tokio::test]
async fn test_no_fills_leaves_ladder_untouched() {
    let venue = create_test_venue();
    let config = create_test_config();
    let (mut manager, _dir, log_path) = create_test_manager(&venue, &config);
    assert_ok!(manager.initialize(None).await);

    let before = manager.orders().clone();
    let outcome = assert_ok!(manager.check_orders().await);

    assert!(!outcome.has_fills());
    assert_eq!(outcome.placed, 0);
    assert!(outcome.profit.is_none());
    assert_eq!(manager.orders(), &before);
    assert_eq!(venue.placed_count(), 6);
    assert!(venue.cancelled_ids().is_empty());
    assert!(!log_path.exists());
}

#[tokio::test]
async fn test_buy_fill_is_replaced_by_sell_one_level_up() {
    let venue = create_test_venue();
    let config = create_test_config();
    let (mut manager, _dir, _log) = create_test_manager(&venue, &config);
    assert_ok!(manager.initialize(None).await);

    let filled_id = order_id_at(&manager, -1);
    assert!(venue.fill(&filled_id));
    let outcome = assert_ok!(manager.check_orders().await);

    assert_eq!(outcome.fill_count(), 1);
    assert_eq!(outcome.fills[0].exchange_order_id, filled_id);
    assert!(!manager.orders().contains_key(&-1));

    let replacement = &manager.orders()[&0];
    assert_eq!(replacement.side, Side::Sell);
    assert_eq!(replacement.price, dec!(100));

    // Buy depth restored below the lowest remaining buy
    assert_eq!(manager.orders()[&-4].side, Side::Buy);
    assert_eq!(keys(&manager), vec![-4, -3, -2, 0, 1, 2, 3]);
    assert_eq!(outcome.placed, 2);
}

#[tokio::test]
async fn test_one_sided_fills_restore_buy_depth() {
    let venue = create_test_venue();
    let config = create_test_config();
    let (mut manager, _dir, _log) = create_test_manager(&venue, &config);
    assert_ok!(manager.initialize(None).await);

    for index in [-1, -2, -3] {
        let id = order_id_at(&manager, index);
        assert!(venue.fill(&id));
    }
    let outcome = assert_ok!(manager.check_orders().await);

    assert_eq!(outcome.fill_count(), 3);
    assert_eq!(manager.buy_count(), 3);

    let buy_indices: Vec<i64> = manager
        .orders()
        .values()
        .filter(|o| o.side == Side::Buy)
        .map(|o| o.index)
        .collect();
    assert_eq!(buy_indices, vec![-6, -5, -4]);

    // Every tracked order is actually resting on the venue
    let live: Vec<String> = venue.open_orders().into_iter().map(|o| o.id).collect();
    for order in manager.orders().values() {
        assert!(live.contains(&order.exchange_order_id));
    }
}

#[tokio::test]
async fn test_one_sided_fills_restore_sell_depth() {
    let venue = create_test_venue();
    let config = create_test_config();
    let (mut manager, _dir, _log) = create_test_manager(&venue, &config);
    assert_ok!(manager.initialize(None).await);

    for index in [1, 2, 3] {
        let id = order_id_at(&manager, index);
        assert!(venue.fill(&id));
    }
    let outcome = assert_ok!(manager.check_orders().await);

    assert_eq!(outcome.fill_count(), 3);
    assert_eq!(manager.sell_count(), 3);

    let sell_indices: Vec<i64> = manager
        .orders()
        .values()
        .filter(|o| o.side == Side::Sell)
        .map(|o| o.index)
        .collect();
    assert_eq!(sell_indices, vec![4, 5, 6]);

    // Replacement buys walked up into the vacated sell slots
    let buy_indices: Vec<i64> = manager
        .orders()
        .values()
        .filter(|o| o.side == Side::Buy)
        .map(|o| o.index)
        .collect();
    assert_eq!(buy_indices, vec![-3, -2, -1, 0, 1, 2]);

    let live: Vec<String> = venue.open_orders().into_iter().map(|o| o.id).collect();
    for order in manager.orders().values() {
        assert!(live.contains(&order.exchange_order_id));
    }
    assert!(venue.cancelled_ids().is_empty());
}

#[tokio::test]
async fn test_fill_reports_profit_and_appends_log() {
    let venue = create_test_venue();
    let config = create_test_config();
    let (mut manager, _dir, log_path) = create_test_manager(&venue, &config);
    assert_ok!(manager.initialize(None).await);

    let id = order_id_at(&manager, -1);
    venue.fill(&id);
    venue.set_balances(Balances { base: dec!(11), quote: dec!(901) });

    let outcome = assert_ok!(manager.check_orders().await);
    let profit = outcome.profit.expect("fill produces a profit report");

    assert_eq!(profit.base_profit, dec!(1));
    assert_eq!(profit.quote_profit, dec!(-99));
    assert_eq!(profit.implied_price, Some(dec!(99)));
    assert_eq!(profit.trade_price, dec!(99.0099));

    let content = fs::read_to_string(&log_path).expect("profit log written");
    let record = content.lines().last().expect("one record");
    assert!(record.starts_with("1,-99,99.0099,"), "unexpected record: {}", record);
}

#[tokio::test]
async fn test_run_writes_header_and_stops_on_shutdown() {
    let venue = create_test_venue();
    let config = create_test_config();
    let (mut manager, _dir, log_path) = create_test_manager(&venue, &config);
    assert_ok!(manager.initialize(None).await);

    let (_tx, rx) = watch::channel(true);
    let scheduler = PollingScheduler::new(&config.polling);
    assert_ok!(manager.run(scheduler, Some(rx)).await);

    let content = fs::read_to_string(&log_path).expect("header written");
    assert!(content.contains("New run "));
    assert!(content.contains("ORDER_PAIRS,ORDER_SIZE,INTERVAL\n3,1,0.01\n"));
    assert!(content.ends_with("base_profit,quote_profit,last_trade_price,time\n"));
}

#[tokio::test]
async fn test_dry_run_initialize_sends_nothing() {
    let venue = create_test_venue();
    venue.insert_open_order(OpenOrder {
        id: "manual-1".to_string(),
        side: Side::Buy,
        price: dec!(95),
        size: dec!(1),
    });
    let config = create_test_config();
    let exchange = create_test_exchange(&venue).with_dry_run(DryRunConfig::default());
    let mut manager = LadderOrderManager::new(exchange, config.grid.clone());

    assert_ok!(manager.initialize(None).await);

    assert_eq!(venue.placed_count(), 0);
    assert!(venue.cancelled_ids().is_empty());
    assert_eq!(manager.orders().len(), 6);
    assert!(manager
        .orders()
        .values()
        .all(|o| o.exchange_order_id.starts_with("dry-")));
    assert_eq!(manager.baseline().map(|b| b.start_base_balance), Some(dec!(100)));
}

#[tokio::test]
async fn test_initialize_survives_transient_failures() {
    let venue = create_test_venue();
    venue.fail_next(5);
    let config = create_test_config();
    let (mut manager, _dir, _log) = create_test_manager(&venue, &config);

    assert_ok!(manager.initialize(None).await);
    assert_eq!(manager.orders().len(), 6);
    assert_eq!(venue.placed_count(), 6);
}

#[tokio::test]
async fn test_check_before_initialize_is_an_error() {
    let venue = create_test_venue();
    let config = create_test_config();
    let (mut manager, _dir, _log) = create_test_manager(&venue, &config);

    let err = assert_err!(manager.check_orders().await);
    assert!(matches!(err, TradingError::Internal(_)));
}

#[tokio::test]
async fn test_deposit_address_forwards_to_venue() {
    let venue = create_test_venue();
    let config = create_test_config();
    let (manager, _dir, _log) = create_test_manager(&venue, &config);

    assert_eq!(manager.deposit_address().await, "1LadderDepositAddress");
}
