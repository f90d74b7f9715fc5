use crate::adapter::ExchangeAdapter;
use crate::capabilities::AdapterCapabilities;
use crate::error::AdapterError;
use crate::models::{
    AssetBalance, BalancesSnapshot, CancelAllOutcome, CancelOutcome, DepositAddress, Fees,
    OrderBook, PlaceOrderAck, Ticker, VenueOrder, VenueOrderStatus,
};
use chrono::Utc;
use ladder_instrument::{Asset, OrderType, Pair, PairSpec, Side};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Deterministic in-memory reference adapter: tracks balances, a single order book per pair, and
/// a minted sequence of venue ids, all behind one `Mutex`-guarded state struct.
///
/// Useful both as the shipped "mock" venue for a dry run and as a fixture for exercising the
/// engine's order lifecycle and reconciliation logic without a real exchange.
#[derive(Debug)]
pub struct MockAdapter {
    inner: Mutex<MockState>,
    capabilities: AdapterCapabilities,
}

#[derive(Debug, Default)]
struct MockState {
    markets: Vec<(Pair, PairSpec)>,
    tickers: HashMap<Pair, Ticker>,
    books: HashMap<Pair, OrderBook>,
    balances: HashMap<Asset, AssetBalance>,
    orders: HashMap<String, VenueOrder>,
    next_id: u64,
    market_offline: bool,
    ticker_temporary_failure: bool,
}

impl MockAdapter {
    pub fn new(capabilities: AdapterCapabilities) -> Self {
        Self {
            inner: Mutex::new(MockState {
                next_id: 1,
                        ..Default::default()
            }),
            capabilities,
        }
    }

    pub fn set_market(&self, pair: Pair, spec: PairSpec) {
        let mut state = self.inner.lock();
        state.markets.retain(|(p, _)| p != &pair);
        state.markets.push((pair, spec));
    }

    pub fn set_ticker(&self, pair: Pair, ticker: Ticker) {
        self.inner.lock().tickers.insert(pair, ticker);
    }

    pub fn set_order_book(&self, pair: Pair, book: OrderBook) {
        self.inner.lock().books.insert(pair, book);
    }

    pub fn set_balance(&self, asset: Asset, balance: AssetBalance) {
        self.inner.lock().balances.insert(asset, balance);
    }

    /// Makes the next `ticker` calls fail with `UpstreamTemporary`, for exercising a tick during
    /// which the ticker call fails transiently.
    pub fn set_ticker_temporary_failure(&self, failing: bool) {
        self.inner.lock().ticker_temporary_failure = failing;
    }

    pub fn set_market_offline(&self, offline: bool) {
        self.inner.lock().market_offline = offline;
    }

    /// Test helper: force the next `get_order`/reconciliation pass on `venue_id` to see the
    /// order as filled, without going through the book-crossing machinery.
    pub fn fill_order(&self, venue_id: &str) {
        if let Some(order) = self.inner.lock().orders.get_mut(venue_id) {
            order.status = VenueOrderStatus::Filled;
            order.amount_executed = order.amount;
            order.volume_executed = order.price * order.amount;
            order.average_price = Some(order.price);
        }
    }

    fn spec_for(&self, state: &MockState, pair: &Pair) -> Result<PairSpec, AdapterError> {
        state
            .markets
            .iter()
            .find(|(p, _)| p == pair)
            .map(|(_, spec)| *spec)
            .ok_or_else(|| AdapterError::Validation(format!("unknown pair {pair}")))
    }
}

#[async_trait::async_trait]
impl ExchangeAdapter for MockAdapter {
    fn capabilities(&self) -> AdapterCapabilities {
        self.capabilities
    }

    fn venue_name(&self) -> &str {
        "mock"
    }

    async fn markets(&self) -> Result<Vec<(Pair, PairSpec)>, AdapterError> {
        Ok(self.inner.lock().markets.clone())
    }

    async fn ticker(&self, pair: &Pair) -> Result<Ticker, AdapterError> {
        let state = self.inner.lock();
        if state.ticker_temporary_failure {
            return Err(AdapterError::UpstreamTemporary {
                code: None,
                message: format!("{pair} ticker temporarily unavailable"),
            });
        }
        if state.market_offline {
            return Err(AdapterError::UpstreamPermanent {
                code: Some("MARKET_OFFLINE".into()),
                message: format!("{pair} is offline"),
            });
        }
        state
            .tickers
            .get(pair)
            .copied()
            .ok_or_else(|| AdapterError::Protocol(format!("no ticker configured for {pair}")))
    }

    async fn order_book(&self, pair: &Pair, depth: u32) -> Result<OrderBook, AdapterError> {
        let state = self.inner.lock();
        let book = state
            .books
            .get(pair)
            .cloned()
            .ok_or_else(|| AdapterError::Protocol(format!("no order book configured for {pair}")))?;
        let depth = depth as usize;
        Ok(OrderBook {
            bids: book.bids.into_iter().take(depth).collect(),
            asks: book.asks.into_iter().take(depth).collect(),
        })
    }

    async fn balances(&self, nonzero_only: bool) -> Result<BalancesSnapshot, AdapterError> {
        let state = self.inner.lock();
        let balances = state
            .balances
            .iter()
            .filter(|(_, balance)| !nonzero_only || !balance.total.is_zero())
            .map(|(asset, balance)| (asset.clone(), *balance))
            .collect();
        Ok(BalancesSnapshot { balances })
    }

    async fn place_order(
        &self,
        pair: &Pair,
        side: Side,
        order_type: OrderType,
        price: Option<Decimal>,
        base_amount: Option<Decimal>,
        quote_amount: Option<Decimal>,
    ) -> Result<PlaceOrderAck, AdapterError> {
        if order_type == OrderType::Market && !self.capabilities.place_market_order {
            return Err(AdapterError::Unsupported(
                "venue does not support market orders".into(),
            ));
        }

        let mut state = self.inner.lock();
        if state.market_offline {
            return Err(AdapterError::UpstreamPermanent {
                code: Some("MARKET_OFFLINE".into()),
                message: format!("{pair} is offline"),
            });
        }

        let spec = self.spec_for(&state, pair)?;

        let price = match order_type {
            OrderType::Limit => price.ok_or_else(|| {
                AdapterError::Validation("limit order requires a price".into())
            })?,
            OrderType::Market => {
                let book = state.books.get(pair).ok_or_else(|| {
                    AdapterError::Protocol(format!("no order book configured for {pair}"))
                })?;
                match side {
                    Side::Buy => book.best_ask(),
                    Side::Sell => book.best_bid(),
                }
                .ok_or_else(|| AdapterError::UpstreamTemporary {
                    code: None,
                    message: "empty book, cannot mark market order".into(),
                })?
            }
        };

        let amount = match base_amount {
            Some(amount) => amount,
            None => {
                let quote = quote_amount.ok_or_else(|| {
                    AdapterError::Validation("order requires an amount".into())
                })?;
                quote / price
            }
        };

        if amount < spec.min_base_amount || price * amount < spec.min_quote_amount {
            return Err(AdapterError::UpstreamPermanent {
                code: Some("MIN_NOTIONAL".into()),
                message: "below venue minimum".into(),
            });
        }

        let id = state.next_id;
        state.next_id += 1;
        let venue_id = format!("mock-{id}");

        state.orders.insert(
            venue_id.clone(),
            VenueOrder {
                venue_id: venue_id.clone(),
                pair: pair.clone(),
                side,
                price,
                amount,
                status: VenueOrderStatus::New,
                amount_executed: Decimal::ZERO,
                volume_executed: Decimal::ZERO,
                average_price: None,
                created_at: Utc::now(),
            },
        );

        Ok(PlaceOrderAck {
            venue_id: Some(venue_id),
            message: "accepted".into(),
        })
    }

    async fn cancel_order(
        &self,
        venue_id: &str,
        _pair: &Pair,
        _side: Option<Side>,
    ) -> Result<CancelOutcome, AdapterError> {
        let mut state = self.inner.lock();
        match state.orders.get_mut(venue_id) {
            Some(order) if order.status == VenueOrderStatus::New => {
                order.status = VenueOrderStatus::Cancelled;
                Ok(CancelOutcome::Cancelled)
            }
            _ => Ok(CancelOutcome::AlreadyCancelledOrAbsent),
        }
    }

    async fn cancel_all(
        &self,
        pair: &Pair,
        side: Option<Side>,
    ) -> Result<CancelAllOutcome, AdapterError> {
        let mut state = self.inner.lock();
        let mut cancelled = 0u32;
        let mut target = 0u32;
        for order in state.orders.values_mut() {
            if &order.pair != pair || order.status != VenueOrderStatus::New {
                continue;
            }
            if let Some(side) = side {
                if order.side != side {
                    continue;
                }
            }
            target += 1;
            order.status = VenueOrderStatus::Cancelled;
            cancelled += 1;
        }
        Ok(CancelAllOutcome::new(cancelled, target))
    }

    async fn open_orders(&self, pair: &Pair) -> Result<Vec<VenueOrder>, AdapterError> {
        let state = self.inner.lock();
        if state.market_offline {
            return Err(AdapterError::UpstreamTemporary {
                code: Some("MARKET_OFFLINE".into()),
                message: format!("{pair} is offline"),
            });
        }
        Ok(state
            .orders
            .values()
            .filter(|order| {
                &order.pair == pair
                    && matches!(
                        order.status,
                        VenueOrderStatus::New | VenueOrderStatus::PartFilled
                    )
            })
            .cloned()
            .collect())
    }

    async fn get_order(&self, venue_id: &str, _pair: &Pair) -> Result<VenueOrder, AdapterError> {
        let state = self.inner.lock();
        state
            .orders
            .get(venue_id)
            .cloned()
            .ok_or_else(|| AdapterError::Inconsistency(format!("unknown venue order {venue_id}")))
    }

    async fn deposit_address(&self, _asset: &Asset) -> Result<Vec<DepositAddress>, AdapterError> {
        if !self.capabilities.get_deposit_address {
            return Err(AdapterError::Unsupported(
                "venue does not support deposit addresses".into(),
            ));
        }
        Ok(Vec::new())
    }

    async fn fees(&self, _pair: Option<&Pair>) -> Result<Fees, AdapterError> {
        if !self.capabilities.get_trading_fees {
            return Err(AdapterError::Unsupported(
                "venue does not expose trading fees".into(),
            ));
        }
        Ok(Fees::new(Decimal::new(1, 3), Decimal::new(2, 3)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ladder_instrument::MarketStatus;
    use rust_decimal_macros::dec;

    fn pair() -> Pair {
        Pair::new("ADM", "USDT")
    }

    fn spec() -> PairSpec {
        PairSpec::new(
            8,
            8,
            dec!(0.01),
            dec!(0.0001),
            dec!(1),
            dec!(10),
            MarketStatus::Online,
        )
    }

    #[tokio::test]
    async fn places_and_cancels_a_limit_order() {
        let adapter = MockAdapter::new(AdapterCapabilities::full());
        adapter.set_market(pair(), spec());

        let ack = adapter
            .place_order(
                &pair(),
                Side::Buy,
                OrderType::Limit,
                Some(dec!(1.0)),
                Some(dec!(20)),
                None,
            )
            .await
            .unwrap();
        let venue_id = ack.venue_id.unwrap();

        let open = adapter.open_orders(&pair()).await.unwrap();
        assert_eq!(open.len(), 1);

        let outcome = adapter
            .cancel_order(&venue_id, &pair(), None)
            .await
            .unwrap();
        assert_eq!(outcome, CancelOutcome::Cancelled);

        // idempotent cancel law
        let outcome = adapter
            .cancel_order(&venue_id, &pair(), None)
            .await
            .unwrap();
        assert_eq!(outcome, CancelOutcome::AlreadyCancelledOrAbsent);

        assert!(adapter.open_orders(&pair()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_below_minimum() {
        let adapter = MockAdapter::new(AdapterCapabilities::full());
        adapter.set_market(pair(), spec());

        let result = adapter
            .place_order(
                &pair(),
                Side::Buy,
                OrderType::Limit,
                Some(dec!(1.0)),
                Some(dec!(0.1)),
                None,
            )
            .await;

        assert!(matches!(
            result,
            Err(AdapterError::UpstreamPermanent { .. })
        ));
    }

    #[tokio::test]
    async fn market_offline_fails_ticker_and_place() {
        let adapter = MockAdapter::new(AdapterCapabilities::full());
        adapter.set_market(pair(), spec());
        adapter.set_market_offline(true);

        assert!(adapter.ticker(&pair()).await.is_err());
        assert!(
            adapter
                .place_order(
                    &pair(),
                    Side::Buy,
                    OrderType::Limit,
                    Some(dec!(1.0)),
                    Some(dec!(20)),
                    None,
                )
                .await
                .is_err()
        );
    }
}
