use async_trait::async_trait;
use ladder_execution::models::{
    BalancesSnapshot, CancelAllOutcome, CancelOutcome, DepositAddress, Fees, OrderBook,
    PlaceOrderAck, Ticker, VenueOrder,
};
use ladder_execution::{AdapterCapabilities, AdapterError, ExchangeAdapter};
use ladder_instrument::{Asset, OrderType, Pair, PairSpec, Side};
use rust_decimal::Decimal;
use tracing::info;

/// Wraps an [`ExchangeAdapter`] and turns every mutating call (`place_order`/`cancel_order`/
/// `cancel_all`) into a logged no-op, while every read-only call passes straight through
/// (`--dry-run`: SPEC_FULL "Configuration"). Placement acks a fabricated `venue_id` so the
/// ladder and reconciler exercise their normal bookkeeping against orders that never reach a
/// real venue.
pub struct DryRunAdapter<A> {
    inner: A,
}

impl<A> DryRunAdapter<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<A: ExchangeAdapter> ExchangeAdapter for DryRunAdapter<A> {
    fn capabilities(&self) -> AdapterCapabilities {
        self.inner.capabilities()
    }

    fn venue_name(&self) -> &str {
        self.inner.venue_name()
    }

    async fn markets(&self) -> Result<Vec<(Pair, PairSpec)>, AdapterError> {
        self.inner.markets().await
    }

    async fn ticker(&self, pair: &Pair) -> Result<Ticker, AdapterError> {
        self.inner.ticker(pair).await
    }

    async fn order_book(&self, pair: &Pair, depth: u32) -> Result<OrderBook, AdapterError> {
        self.inner.order_book(pair, depth).await
    }

    async fn balances(&self, nonzero_only: bool) -> Result<BalancesSnapshot, AdapterError> {
        self.inner.balances(nonzero_only).await
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
        info!(
            %pair, ?side, ?order_type, ?price, ?base_amount, ?quote_amount,
            "dry-run: would place order"
        );
        Ok(PlaceOrderAck {
            venue_id: Some(format!("dry-run-{}", uuid_like())),
            message: "dry-run, not sent to venue".to_string(),
        })
    }

    async fn cancel_order(
        &self,
        venue_id: &str,
        pair: &Pair,
        side: Option<Side>,
    ) -> Result<CancelOutcome, AdapterError> {
        info!(venue_id, %pair, ?side, "dry-run: would cancel order");
        Ok(CancelOutcome::Cancelled)
    }

    async fn cancel_all(&self, pair: &Pair, side: Option<Side>) -> Result<CancelAllOutcome, AdapterError> {
        info!(%pair, ?side, "dry-run: would cancel all orders");
        Ok(CancelAllOutcome::new(0, 0))
    }

    async fn open_orders(&self, pair: &Pair) -> Result<Vec<VenueOrder>, AdapterError> {
        self.inner.open_orders(pair).await
    }

    async fn get_order(&self, venue_id: &str, pair: &Pair) -> Result<VenueOrder, AdapterError> {
        self.inner.get_order(venue_id, pair).await
    }

    async fn deposit_address(&self, asset: &Asset) -> Result<Vec<DepositAddress>, AdapterError> {
        self.inner.deposit_address(asset).await
    }

    async fn fees(&self, pair: Option<&Pair>) -> Result<Fees, AdapterError> {
        self.inner.fees(pair).await
    }
}

/// A short, non-cryptographic token distinguishing dry-run placement acks across a run; there is
/// no real venue to collide with.
fn uuid_like() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{nanos:x}")
}
