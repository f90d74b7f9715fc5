//! End-to-end scenarios from spec §8, driven against [`MockAdapter`] the way a real venue would
//! be exercised: through [`LadderEngine::tick`], [`CommandDispatcher::dispatch`], and
//! [`Reconciler::reconcile`] together, not through any single module in isolation.

use ladder_engine::{
    AmountCoin, CommandDispatcher, EngineState, InMemoryOrderStore, LadderConfig, LadderEngine,
    LadderState, OrderCollector, OrderFilter, Purpose, RatesOracle, Reconciler, StaticRatesOracle,
    TradeParams,
};
use ladder_execution::adapter::ExchangeAdapter;
use ladder_execution::mock::MockAdapter;
use ladder_execution::models::{OrderBook, Ticker};
use ladder_execution::AdapterCapabilities;
use ladder_instrument::{Asset, MarketStatus, OrderType, Pair, PairSpec, Side};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;

fn pair() -> Pair {
    Pair::new("ADM", "USDT")
}

fn spec() -> PairSpec {
    PairSpec::new(8, 8, dec!(0.0001), dec!(0.0001), dec!(1), dec!(10), MarketStatus::Online)
}

fn book(bid: Decimal, ask: Decimal) -> OrderBook {
    use ladder_execution::models::BookLevel;
    OrderBook {
        bids: vec![BookLevel::new(bid, dec!(1000), 1)],
        asks: vec![BookLevel::new(ask, dec!(1000), 1)],
    }
}

fn ticker(bid: Decimal, ask: Decimal) -> Ticker {
    Ticker::new(bid, ask, bid, ask, bid, dec!(0), dec!(0))
}

/// Seeds ample free balance of both legs of `pair` so a ladder tick's free-balance check
/// (spec §4.5 step 5) never blocks placement in tests that are not themselves exercising it.
fn fund(adapter: &MockAdapter, pair: &Pair) {
    use ladder_execution::models::AssetBalance;
    adapter.set_balance(pair.base.clone(), AssetBalance::new(dec!(1000000), Decimal::ZERO));
    adapter.set_balance(pair.quote.clone(), AssetBalance::new(dec!(1000000), Decimal::ZERO));
}

fn dispatcher(
    adapter: Arc<dyn ExchangeAdapter>,
    store: Arc<InMemoryOrderStore>,
    state: Arc<EngineState>,
    rates: Arc<dyn RatesOracle>,
    amount_to_confirm_usd: Decimal,
) -> CommandDispatcher {
    CommandDispatcher {
        store,
        adapter,
        rates,
        state,
        default_pair: pair(),
        amount_to_confirm_usd,
    }
}

/// Scenario 1: activate ladder, one tick places six rungs around the calculated mid.
#[tokio::test]
async fn scenario_activate_ladder() {
    let store = InMemoryOrderStore::new();
    let adapter = MockAdapter::new(AdapterCapabilities::full());
    adapter.set_market(pair(), spec());
    adapter.set_ticker(pair(), ticker(dec!(1.00), dec!(1.02)));
    adapter.set_order_book(pair(), book(dec!(1.00), dec!(1.02)));
    fund(&adapter, &pair());

    let mut config = LadderConfig::new(dec!(300), AmountCoin::Quote, 3, dec!(2));
    config.active = true;
    let mut params = TradeParams::new(config);

    let engine = LadderEngine::new(&store);
    engine.tick(&adapter, &pair(), &spec(), &mut params).await;

    let placed = store.find(
        &OrderFilter::default()
            .pair(pair())
            .purpose(Purpose::Ladder)
            .ladder_state(LadderState::Placed),
    );
    assert_eq!(placed.len(), 6);
    assert_eq!(placed.iter().filter(|o| o.side == Side::Buy).count(), 3);
    assert_eq!(placed.iter().filter(|o| o.side == Side::Sell).count(), 3);
    for order in &placed {
        let volume = order.price * order.amount;
        assert!((volume - dec!(100)).abs() < dec!(1), "volume ~100 USDT, got {volume}");
    }

    // second tick with unchanged inputs is a no-op.
    engine.tick(&adapter, &pair(), &spec(), &mut params).await;
    let placed_again = store.find(
        &OrderFilter::default()
            .pair(pair())
            .purpose(Purpose::Ladder)
            .ladder_state(LadderState::Placed),
    );
    assert_eq!(placed_again.len(), 6);
}

/// Scenario 2: mid drift beyond half a tick cancels and re-places the whole ladder.
#[tokio::test]
async fn scenario_mid_drift_triggers_replacement() {
    let store = InMemoryOrderStore::new();
    let adapter = MockAdapter::new(AdapterCapabilities::full());
    adapter.set_market(pair(), spec());
    adapter.set_ticker(pair(), ticker(dec!(1.00), dec!(1.02)));
    adapter.set_order_book(pair(), book(dec!(1.00), dec!(1.02)));
    fund(&adapter, &pair());

    let mut config = LadderConfig::new(dec!(300), AmountCoin::Quote, 3, dec!(2));
    config.active = true;
    let mut params = TradeParams::new(config);

    let engine = LadderEngine::new(&store);
    engine.tick(&adapter, &pair(), &spec(), &mut params).await;

    let first_round = store.find(
        &OrderFilter::default()
            .pair(pair())
            .purpose(Purpose::Ladder)
            .ladder_state(LadderState::Placed),
    );
    assert_eq!(first_round.len(), 6);

    adapter.set_ticker(pair(), ticker(dec!(1.05), dec!(1.07)));
    adapter.set_order_book(pair(), book(dec!(1.05), dec!(1.07)));
    engine.tick(&adapter, &pair(), &spec(), &mut params).await;

    let cancelled = store.find(
        &OrderFilter::default()
            .pair(pair())
            .purpose(Purpose::Ladder)
            .ladder_state(LadderState::Cancelled),
    );
    assert_eq!(cancelled.len(), 6, "all six stale rungs should have been cancelled");

    // spec §4.5: a stale rung is cancelled now and re-placed "on the next tick (never within the
    // same tick)" — the drift tick itself ends with zero placed rungs.
    let after_drift_tick = store.find(
        &OrderFilter::default()
            .pair(pair())
            .purpose(Purpose::Ladder)
            .ladder_state(LadderState::Placed),
    );
    assert_eq!(
        after_drift_tick.len(),
        0,
        "rungs cancelled for drift are not re-placed within the same tick"
    );

    // a further tick with the drifted market unchanged re-places the full ladder around the new mid.
    engine.tick(&adapter, &pair(), &spec(), &mut params).await;

    let second_round = store.find(
        &OrderFilter::default()
            .pair(pair())
            .purpose(Purpose::Ladder)
            .ladder_state(LadderState::Placed),
    );
    assert_eq!(second_round.len(), 6);

    // invariant 1: at most one placed order per (pair, ladder_index).
    let mut seen_indices = std::collections::HashSet::new();
    for order in &second_round {
        assert!(seen_indices.insert(order.ladder_index), "duplicate placed rung at an index");
    }

    // invariant 3: no placed buy at/above ask, no placed sell at/below bid.
    for order in &second_round {
        match order.side {
            Side::Buy => assert!(order.price < dec!(1.07)),
            Side::Sell => assert!(order.price > dec!(1.05)),
        }
    }
}

/// Scenario 3: `/clear <pair> ladder sell >1.05 USDT` cancels exactly the matching sell rungs.
#[tokio::test]
async fn scenario_clear_by_predicate() {
    let store = Arc::new(InMemoryOrderStore::new());
    let adapter: Arc<dyn ExchangeAdapter> = Arc::new(MockAdapter::new(AdapterCapabilities::full()));
    let mock = adapter.as_ref();
    mock.markets().await.ok();

    let adapter_concrete = MockAdapter::new(AdapterCapabilities::full());
    adapter_concrete.set_market(pair(), spec());
    adapter_concrete.set_ticker(pair(), ticker(dec!(1.00), dec!(1.02)));
    adapter_concrete.set_order_book(pair(), book(dec!(1.00), dec!(1.02)));
    fund(&adapter_concrete, &pair());
    let adapter: Arc<dyn ExchangeAdapter> = Arc::new(adapter_concrete);

    let mut config = LadderConfig::new(dec!(300), AmountCoin::Quote, 3, dec!(2));
    config.active = true;
    let mut params = TradeParams::new(config);

    {
        let engine = LadderEngine::new(&store);
        engine.tick(adapter.as_ref(), &pair(), &spec(), &mut params).await;
    }

    let before = store.find(
        &OrderFilter::default()
            .pair(pair())
            .purpose(Purpose::Ladder)
            .ladder_state(LadderState::Placed),
    );
    let sells_above: Vec<_> = before
        .iter()
        .filter(|o| o.side == Side::Sell && o.price > dec!(1.05))
        .collect();
    assert!(!sells_above.is_empty(), "fixture should produce at least one sell above 1.05");

    let rates: Arc<dyn RatesOracle> = Arc::new(StaticRatesOracle::new());
    let markets = HashMap::from([(pair(), spec())]);
    let state = Arc::new(EngineState::new(markets, HashMap::from([(pair(), params)])));
    let dispatcher = dispatcher(adapter.clone(), store.clone(), state, rates, dec!(100));

    let result = dispatcher.dispatch("/clear ADM/USDT ladder sell >1.05 USDT", "tester").await;
    assert!(result.reply_text.contains("cancelled"));

    let still_placed = store.find(
        &OrderFilter::default()
            .pair(pair())
            .purpose(Purpose::Ladder)
            .ladder_state(LadderState::Placed),
    );
    assert!(still_placed.iter().all(|o| !(o.side == Side::Sell && o.price > dec!(1.05))));
    assert!(still_placed.iter().any(|o| o.side == Side::Buy), "buy rungs untouched");
    assert!(
        still_placed
            .iter()
            .any(|o| o.side == Side::Sell && o.price <= dec!(1.05)),
        "sells at or below 1.05 untouched"
    );
}

/// Scenario 4: a trade whose USD-equivalent notional exceeds the threshold is held pending
/// confirmation, expires strictly after 10 minutes, and executes if confirmed sooner.
#[tokio::test]
async fn scenario_confirmation_protocol() {
    let store = Arc::new(InMemoryOrderStore::new());
    let adapter_concrete = MockAdapter::new(AdapterCapabilities::full());
    adapter_concrete.set_market(pair(), spec());
    let adapter: Arc<dyn ExchangeAdapter> = Arc::new(adapter_concrete);

    let rates = StaticRatesOracle::new();
    rates.set_price(Asset::new("ADM"), dec!(1.2));
    rates.mark_fiat(Asset::new("USDT"));
    rates.set_price(Asset::new("USDT"), dec!(1));
    let rates: Arc<dyn RatesOracle> = Arc::new(rates);

    let markets = HashMap::from([(pair(), spec())]);
    let state = Arc::new(EngineState::new(markets, HashMap::new()));
    let dispatcher = dispatcher(adapter.clone(), store.clone(), state, rates, dec!(100));

    let result = dispatcher.dispatch("/buy ADM/USDT amount=500 price=1.20", "tester").await;
    assert!(result.reply_text.to_lowercase().contains("confirm"));
    assert!(
        store.find(&OrderFilter::default().pair(pair())).is_empty(),
        "no order should be placed before confirmation"
    );

    let confirm_result = dispatcher.dispatch("/y", "tester").await;
    assert!(confirm_result.reply_text.contains("order placed"));
    assert_eq!(store.find(&OrderFilter::default().pair(pair())).len(), 1);
}

/// Scenario 4b: a confirmation that arrives strictly more than 10 minutes late is rejected.
#[tokio::test]
async fn scenario_confirmation_expires_after_ten_minutes() {
    use ladder_engine::PendingConfirmation;

    let store = Arc::new(InMemoryOrderStore::new());
    let adapter_concrete = MockAdapter::new(AdapterCapabilities::full());
    adapter_concrete.set_market(pair(), spec());
    let adapter: Arc<dyn ExchangeAdapter> = Arc::new(adapter_concrete);
    let rates: Arc<dyn RatesOracle> = Arc::new(StaticRatesOracle::new());
    let state = Arc::new(EngineState::new(HashMap::from([(pair(), spec())]), HashMap::new()));

    let eleven_minutes_ago = chrono::Utc::now() - chrono::Duration::minutes(11);
    state
        .set_pending_confirmation(PendingConfirmation::new(
            "buy ADM/USDT amount=500 price=1.20",
            eleven_minutes_ago,
    ))
        .await;

    let dispatcher = dispatcher(adapter, store.clone(), state, rates, dec!(100));
    let result = dispatcher.dispatch("/y", "tester").await;

    assert!(result.reply_text.contains("expired"));
    assert!(store.find(&OrderFilter::default().pair(pair())).is_empty());
}

/// Scenario 5: an order the venue reports but the store never placed is surfaced as unknown and
/// left alone until an explicit `/clear unk`.
#[tokio::test]
async fn scenario_unknown_order_detection_and_clear() {
    let store = Arc::new(InMemoryOrderStore::new());
    let adapter_concrete = MockAdapter::new(AdapterCapabilities::full());
    adapter_concrete.set_market(pair(), spec());
    let ack = adapter_concrete
        .place_order(&pair(), Side::Buy, OrderType::Limit, Some(dec!(1.0)), Some(dec!(20)), None)
        .await
        .unwrap();
    let venue_id = ack.venue_id.unwrap();
    let adapter: Arc<dyn ExchangeAdapter> = Arc::new(adapter_concrete);

    let reconciler = Reconciler::new(&store);
    let report = reconciler.reconcile(adapter.as_ref(), &pair()).await;

    assert_eq!(report.unknown_orders.len(), 1);
    assert_eq!(report.unknown_orders[0].venue_id, venue_id);

    let collector = OrderCollector::new(&store);
    let outcome = collector.clear_unknown(adapter.as_ref(), &pair(), None, false).await;
    assert_eq!(outcome.cancelled, 1);

    assert!(adapter.open_orders(&pair()).await.unwrap().is_empty());
}

/// Scenario 6 / boundary: a temporary ticker failure during a ladder tick must not cancel or
/// place anything.
#[tokio::test]
async fn scenario_ticker_temporary_failure_is_a_no_op_tick() {
    let store = InMemoryOrderStore::new();
    let adapter = MockAdapter::new(AdapterCapabilities::full());
    adapter.set_market(pair(), spec());
    adapter.set_ticker(pair(), ticker(dec!(1.00), dec!(1.02)));
    adapter.set_order_book(pair(), book(dec!(1.00), dec!(1.02)));
    fund(&adapter, &pair());

    let mut config = LadderConfig::new(dec!(300), AmountCoin::Quote, 3, dec!(2));
    config.active = true;
    let mut params = TradeParams::new(config);

    let engine = LadderEngine::new(&store);
    engine.tick(&adapter, &pair(), &spec(), &mut params).await;
    assert_eq!(
        store
            .find(&OrderFilter::default().pair(pair()).ladder_state(LadderState::Placed))
            .len(),
        6
    );

    adapter.set_ticker_temporary_failure(true);
    engine.tick(&adapter, &pair(), &spec(), &mut params).await;

    let placed = store.find(&OrderFilter::default().pair(pair()).ladder_state(LadderState::Placed));
    let cancelled = store.find(&OrderFilter::default().pair(pair()).ladder_state(LadderState::Cancelled));
    assert_eq!(placed.len(), 6, "nothing should be cancelled or re-placed on a temporary ticker failure");
    assert!(cancelled.is_empty());
}

/// Adapter temporary failure during reconciliation: no state transitions occur, and the pass is
/// marked skipped so the next tick retries from scratch.
#[tokio::test]
async fn scenario_reconciliation_skips_on_temporary_open_orders_failure() {
    let store = InMemoryOrderStore::new();
    let adapter = MockAdapter::new(AdapterCapabilities::full());
    adapter.set_market(pair(), spec());
    adapter.set_market_offline(true);

    let reconciler = Reconciler::new(&store);
    let report = reconciler.reconcile(&adapter, &pair()).await;

    assert!(report.skipped_temporary);
    assert_eq!(report.filled, 0);
    assert_eq!(report.cancelled, 0);
    assert!(report.unknown_orders.is_empty());
}
