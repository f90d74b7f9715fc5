use crate::order::{LadderState, Order, Purpose};
use crate::store::{InMemoryOrderStore, OrderFilter};
use ladder_execution::adapter::{free_balance, ExchangeAdapter};
use ladder_execution::models::Ticker;
use ladder_instrument::precision::{round_amount, round_price, validate_amount};
use ladder_instrument::{OrderType, Pair, PairSpec, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Half-tick hysteresis band used to decide whether a placed rung is still "at" its target price.
fn half_tick(spec: &PairSpec) -> Decimal {
    spec.quote_tick / Decimal::from(2u8)
}

/// Which currency `amount` in [`LadderConfig`] is denominated in.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
pub enum AmountCoin {
    Base,
    Quote,
}

/// Where `mid_price` comes from.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
pub enum MidOrigin {
    Manual,
    Calculated,
}

/// Per-pair ladder configuration, mutated only through commands and read by [`LadderEngine`]
/// each tick.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LadderConfig {
    pub amount: Decimal,
    pub amount_coin: AmountCoin,
    pub count_per_side: u32,
    pub step_percent: Decimal,
    pub mid_price: Decimal,
    pub mid_origin: MidOrigin,
    pub active: bool,
    pub reinit_requested: bool,
}

impl LadderConfig {
    pub fn new(
        amount: Decimal,
        amount_coin: AmountCoin,
        count_per_side: u32,
        step_percent: Decimal,
    ) -> Self {
        Self {
            amount,
            amount_coin,
            count_per_side,
            step_percent,
            mid_price: Decimal::ZERO,
            mid_origin: MidOrigin::Calculated,
            active: false,
            reinit_requested: false,
        }
    }
}

/// Per-pair engine-wide trading parameters: the ladder config plus the strategy-activation
/// knobs reserved for future strategies.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TradeParams {
    pub ladder: LadderConfig,
    pub co_active: bool,
}

impl TradeParams {
    pub fn new(ladder: LadderConfig) -> Self {
        Self {
            ladder,
            co_active: true,
        }
    }
}

/// One rung of the desired layout, before it is
/// reconciled against the current [`Order`] set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetRung {
    pub index: i32,
    pub side: Side,
    pub price: Decimal,
    pub amount: Decimal,
    pub not_placed_reason: Option<&'static str>,
}

/// Computes the target rung layout for `config` around `mid`. Pure function, exercised directly by unit tests.
pub fn target_layout(config: &LadderConfig, spec: &PairSpec, mid: Decimal) -> Vec<TargetRung> {
    let count = config.count_per_side as i32;
    let budget_per_rung = config.amount / Decimal::from(config.count_per_side.max(1));

    (-count..=count)
        .filter(|&i| i != 0)
        .map(|i| {
            let side = if i < 0 { Side::Buy } else { Side::Sell };
            let raw_price = mid * (Decimal::ONE + config.step_percent * Decimal::from(i) / Decimal::from(100u8));
            let price = round_price(spec, raw_price);

            let raw_amount = match config.amount_coin {
                AmountCoin::Base => budget_per_rung,
                AmountCoin::Quote => budget_per_rung / price,
            };
            let amount = round_amount(spec, raw_amount);

            let not_placed_reason = match validate_amount(spec, price, amount) {
                Ok(_) => None,
                Err(_) => Some("below venue minimum"),
            };

            TargetRung {
                index: i,
                side,
                price,
                amount,
                not_placed_reason,
            }
        })
        .collect()
}

/// Drives the venue toward the target rung layout.
pub struct LadderEngine<'a> {
    store: &'a InMemoryOrderStore,
}

impl<'a> LadderEngine<'a> {
    pub fn new(store: &'a InMemoryOrderStore) -> Self {
        Self { store }
    }

    /// Runs one ladder tick for `pair`.
    pub async fn tick(
        &self,
        adapter: &dyn ExchangeAdapter,
        pair: &Pair,
        spec: &PairSpec,
        params: &mut TradeParams,
    ) {
        if !params.co_active || !params.ladder.active {
            return;
        }

        if spec.status == ladder_instrument::MarketStatus::Offline {
            info!(%pair, "ladder tick suspended: market offline");
            return;
        }

        if params.ladder.reinit_requested {
            self.cancel_all_ladder(adapter, pair).await;
            let all_terminal = self
                .store
                .find(
                    &OrderFilter::default()
                    .pair(pair.clone())
                    .purpose(Purpose::Ladder),
            )
                .iter()
                .all(|order| order.is_terminal());
            if all_terminal {
                params.ladder.reinit_requested = false;
            } else {
                // cancels are in flight; clear next tick once reconciliation marks them terminal.
                return;
            }
        }

        let mid = match params.ladder.mid_origin {
            MidOrigin::Manual => params.ladder.mid_price,
            MidOrigin::Calculated => match adapter.ticker(pair).await {
                Ok(ticker) => ticker.mid(),
                Err(error) if error.is_temporary() => {
                    info!(%pair, %error, "ladder tick skipped: ticker temporary failure");
                    return;
                }
                Err(error) => {
                    warn!(%pair, %error, "ladder tick: ticker failed");
                    return;
                }
            },
        };

        let (best_bid, best_ask) = match adapter.order_book(pair, 1).await {
            Ok(book) => (book.best_bid(), book.best_ask()),
            Err(error) if error.is_temporary() => {
                info!(%pair, %error, "ladder tick skipped: order book temporary failure");
                return;
            }
            Err(error) => {
                warn!(%pair, %error, "ladder tick: order book failed");
                (None, None)
            }
        };

        let target = target_layout(&params.ladder, spec, mid);
        let mut sorted = target;
        sorted.sort_by_key(|rung| rung.index.abs());

        let existing = self.store.ordered_by(Purpose::Ladder, pair);

        // cancellations precede placements.
        let mut to_cancel = Vec::new();
        for rung in &sorted {
            if let Some(order) = existing
                .iter()
                .find(|order| order.ladder_index == Some(rung.index) && order.ladder_state == LadderState::Placed)
            {
                let stale = (order.price - rung.price).abs() > half_tick(spec);
                if stale {
                    to_cancel.push(order.clone());
                }
            }
        }

        for order in &to_cancel {
            let Some(venue_id) = order.venue_id.clone() else {
                continue;
            };
            match adapter.cancel_order(&venue_id, pair, Some(order.side)).await {
                Ok(_) => {
                    let id = order.id;
                    let _ = self
                        .store
                        .update(id, |order| order.ladder_state = LadderState::Cancelled);
                }
                Err(error) => warn!(%error, venue_id, "ladder tick: cancel of stale rung failed"),
            }
        }

        // re-read existing state after cancellations so placements don't race the rungs we just
        // cancelled (never re-place within the same tick, per spec §4.5).
        let existing = self.store.ordered_by(Purpose::Ladder, pair);
        let just_cancelled: std::collections::HashSet<i32> = to_cancel
            .iter()
            .filter_map(|order| order.ladder_index)
            .collect();

        // spec §4.5 step 5 / spec §3 invariant: committed `placed` amount per side must not
        // exceed free balance. Start from the venue-reported free balance, then subtract what is
        // already committed by rungs that remain `placed` through this tick, leaving the budget
        // available for any rung this tick is about to place.
        let balances = match adapter.balances(false).await {
            Ok(snapshot) => Some(snapshot),
            Err(error) if error.is_temporary() => {
                info!(%pair, %error, "ladder tick: balances temporary failure, skipping balance check this tick");
                None
            }
            Err(error) => {
                warn!(%pair, %error, "ladder tick: balances failed, skipping balance check this tick");
                None
            }
        };

        let mut free_quote = balances.as_ref().map(|snapshot| free_balance(snapshot, &pair.quote));
        let mut free_base = balances.as_ref().map(|snapshot| free_balance(snapshot, &pair.base));

        if let Some(free_quote) = free_quote.as_mut() {
            let committed: Decimal = existing
                .iter()
                .filter(|order| order.side == Side::Buy && order.ladder_state == LadderState::Placed)
                .map(|order| order.price * order.amount)
                .sum();
            *free_quote -= committed;
        }
        if let Some(free_base) = free_base.as_mut() {
            let committed: Decimal = existing
                .iter()
                .filter(|order| order.side == Side::Sell && order.ladder_state == LadderState::Placed)
                .map(|order| order.amount)
                .sum();
            *free_base -= committed;
        }

        for rung in &sorted {
            if just_cancelled.contains(&rung.index) {
                continue;
            }

            let already_placed = existing.iter().any(|order| {
                order.ladder_index == Some(rung.index)
                    && order.ladder_state == LadderState::Placed
                    && (order.price - rung.price).abs() <= half_tick(spec)
            });
            if already_placed {
                continue;
            }

            let already_not_placed = existing.iter().any(|order| {
                order.ladder_index == Some(rung.index) && order.ladder_state == LadderState::NotPlaced
            });
            if already_not_placed && rung.not_placed_reason.is_some() {
                continue;
            }

            if let Some(reason) = rung.not_placed_reason {
                self.record_not_placed(pair, rung, reason);
                continue;
            }

            if crosses_spread(rung, best_bid, best_ask) {
                self.record_not_placed(pair, rung, "would cross spread");
                continue;
            }

            let cost = match rung.side {
                Side::Buy => rung.price * rung.amount,
                Side::Sell => rung.amount,
            };
            let budget = match rung.side {
                Side::Buy => free_quote.as_mut(),
                Side::Sell => free_base.as_mut(),
            };
            if let Some(remaining) = budget {
                if cost > *remaining {
                    self.record_not_placed(pair, rung, "insufficient balance");
                    continue;
                }
                *remaining -= cost;
            }

            self.place_rung(adapter, pair, spec, rung).await;
        }
    }

    async fn cancel_all_ladder(&self, adapter: &dyn ExchangeAdapter, pair: &Pair) {
        let placed = self.store.find(
            &OrderFilter::default()
                .pair(pair.clone())
                .purpose(Purpose::Ladder)
                .ladder_state(LadderState::Placed),
        );

        for order in placed {
            let Some(venue_id) = order.venue_id.clone() else {
                continue;
            };
            match adapter.cancel_order(&venue_id, pair, Some(order.side)).await {
                Ok(_) => {
                    let id = order.id;
                    let _ = self
                        .store
                        .update(id, |order| order.ladder_state = LadderState::Cancelled);
                }
                Err(error) => warn!(%error, venue_id, "reinit: cancel failed"),
            }
        }
    }

    fn record_not_placed(&self, pair: &Pair, rung: &TargetRung, reason: &str) {
        let mut order = Order::new_pending(
            self.store.next_id(),
            pair.clone(),
            rung.side,
            OrderType::Limit,
            rung.price,
            rung.amount,
            rung.price * rung.amount,
            Purpose::Ladder,
            Some(rung.index),
            chrono::Utc::now(),
        );
        order.ladder_state = LadderState::NotPlaced;
        order.ladder_not_placed_reason = Some(reason.to_string());
        let _ = self.store.insert(order);
    }

    async fn place_rung(
        &self,
        adapter: &dyn ExchangeAdapter,
        pair: &Pair,
        spec: &PairSpec,
        rung: &TargetRung,
    ) {
        let volume = match validate_amount(spec, rung.price, rung.amount) {
            Ok(volume) => volume,
            Err(_) => {
                self.record_not_placed(pair, rung, "below venue minimum");
                return;
            }
        };

        let order = Order::new_pending(
            self.store.next_id(),
            pair.clone(),
            rung.side,
            OrderType::Limit,
            rung.price,
            rung.amount,
            volume,
            Purpose::Ladder,
            Some(rung.index),
            chrono::Utc::now(),
        );
        let id = order.id;
        let _ = self.store.insert(order);

        match adapter
            .place_order(
                pair,
                rung.side,
                OrderType::Limit,
                Some(rung.price),
                Some(rung.amount),
                None,
        )
            .await
        {
            Ok(ack) => match ack.venue_id {
                Some(venue_id) => {
                    let _ = self.store.update(id, |order| {
                        order.venue_id = Some(venue_id);
                        order.ladder_state = LadderState::Placed;
                    });
                }
                None => {
                    let _ = self.store.update(id, |order| {
                        order.ladder_state = LadderState::NotPlaced;
                        order.ladder_not_placed_reason = Some(ack.message.clone());
                    });
                }
            },
            Err(error) if error.is_temporary() => {
                // leave as `pending`; the reconciler's grace-period GC handles it if it never
                // resolves, and this tick simply retries the rung next time.
            }
            Err(error) => {
                let _ = self.store.update(id, |order| {
                    order.ladder_state = LadderState::NotPlaced;
                    order.ladder_not_placed_reason = Some(error.to_string());
                });
            }
        }
    }
}

fn crosses_spread(rung: &TargetRung, best_bid: Option<Decimal>, best_ask: Option<Decimal>) -> bool {
    match rung.side {
        Side::Buy => best_ask.is_some_and(|ask| rung.price >= ask),
        Side::Sell => best_bid.is_some_and(|bid| rung.price <= bid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ladder_instrument::MarketStatus;
    use rust_decimal_macros::dec;

    fn spec() -> PairSpec {
        PairSpec::new(8, 8, dec!(0.01), dec!(0.0001), dec!(1), dec!(10), MarketStatus::Online)
    }

    #[test]
    fn count_one_produces_one_rung_per_side() {
        let config = LadderConfig::new(dec!(300), AmountCoin::Quote, 1, dec!(2));
        let rungs = target_layout(&config, &spec(), dec!(1.01));
        assert_eq!(rungs.len(), 2);
        assert!(rungs.iter().any(|r| r.side == Side::Buy));
        assert!(rungs.iter().any(|r| r.side == Side::Sell));
    }

    #[test]
    fn scenario_one_activate_ladder() {
        // spec §8 scenario 1: pair ADM/USDT, step 2%, count 3, amount 300 USDT, mid calculated.
        // bid=1.00, ask=1.02 => mid=1.01.
        let config = LadderConfig::new(dec!(300), AmountCoin::Quote, 3, dec!(2));
        let mid = dec!(1.01);
        let rungs = target_layout(&config, &spec(), mid);

        assert_eq!(rungs.len(), 6);
        let buys: Vec<_> = rungs.iter().filter(|r| r.side == Side::Buy).collect();
        let sells: Vec<_> = rungs.iter().filter(|r| r.side == Side::Sell).collect();
        assert_eq!(buys.len(), 3);
        assert_eq!(sells.len(), 3);

        for rung in &rungs {
            assert!(rung.not_placed_reason.is_none());
            let volume = rung.price * rung.amount;
            assert!((volume - dec!(100)).abs() < dec!(1), "volume ~100 USDT, got {volume}");
        }
    }

    #[test]
    fn amount_below_minimum_marks_every_rung_not_placed() {
        let mut spec = spec();
        spec.min_base_amount = dec!(1000);
        let config = LadderConfig::new(dec!(300), AmountCoin::Quote, 3, dec!(2));
        let rungs = target_layout(&config, &spec, dec!(1.01));

        assert!(rungs.iter().all(|r| r.not_placed_reason.is_some()));
    }

    #[test]
    fn rung_prices_strictly_monotone_per_side() {
        let config = LadderConfig::new(dec!(300), AmountCoin::Quote, 3, dec!(2));
        let rungs = target_layout(&config, &spec(), dec!(1.01));

        let mut buys: Vec<_> = rungs
            .iter()
            .filter(|r| r.side == Side::Buy)
            .map(|r| r.price)
            .collect();
        buys.sort();
        let mut sells: Vec<_> = rungs
            .iter()
            .filter(|r| r.side == Side::Sell)
            .map(|r| r.price)
            .collect();
        sells.sort();

        assert!(buys.windows(2).all(|w| w[0] < w[1]));
        assert!(sells.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn insufficient_quote_balance_marks_buy_rungs_not_placed() {
        use ladder_execution::mock::MockAdapter;
        use ladder_execution::models::{AssetBalance, BookLevel, OrderBook};
        use ladder_execution::AdapterCapabilities;

        let pair = Pair::new("ADM", "USDT");
        let adapter = MockAdapter::new(AdapterCapabilities::full());
        adapter.set_market(pair.clone(), spec());
        adapter.set_ticker(pair.clone(), Ticker::new(dec!(1.00), dec!(1.02), dec!(1.00), dec!(1.02), dec!(1.00), dec!(0), dec!(0)));
        adapter.set_order_book(
            pair.clone(),
            OrderBook {
                bids: vec![BookLevel::new(dec!(1.00), dec!(1000), 1)],
                asks: vec![BookLevel::new(dec!(1.02), dec!(1000), 1)],
            },
        );
        // enough base to place every sell rung, but not enough quote for even one buy rung.
        adapter.set_balance(pair.base.clone(), AssetBalance::new(dec!(1000000), Decimal::ZERO));
        adapter.set_balance(pair.quote.clone(), AssetBalance::new(dec!(1), Decimal::ZERO));

        let store = InMemoryOrderStore::new();
        let mut config = LadderConfig::new(dec!(300), AmountCoin::Quote, 3, dec!(2));
        config.active = true;
        let mut params = TradeParams::new(config);

        let engine = LadderEngine::new(&store);
        engine.tick(&adapter, &pair, &spec(), &mut params).await;

        let not_placed = store.find(
            &OrderFilter::default()
                .pair(pair.clone())
                .purpose(Purpose::Ladder)
                .ladder_state(LadderState::NotPlaced),
        );
        let not_placed_buys: Vec<_> = not_placed.iter().filter(|o| o.side == Side::Buy).collect();
        assert_eq!(not_placed_buys.len(), 3);
        assert!(not_placed_buys
            .iter()
            .all(|o| o.ladder_not_placed_reason.as_deref() == Some("insufficient balance")));

        let placed = store.find(
            &OrderFilter::default()
                .pair(pair)
                .purpose(Purpose::Ladder)
                .ladder_state(LadderState::Placed),
        );
        assert_eq!(placed.iter().filter(|o| o.side == Side::Sell).count(), 3);
        assert!(placed.iter().all(|o| o.side != Side::Buy));
    }
}
