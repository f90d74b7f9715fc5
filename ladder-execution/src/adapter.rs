use crate::capabilities::AdapterCapabilities;
use crate::error::AdapterError;
use crate::models::{
    AssetBalance, BalancesSnapshot, CancelAllOutcome, CancelOutcome, DepositAddress, Fees,
    OrderBook, PlaceOrderAck, Ticker, VenueOrder,
};
use async_trait::async_trait;
use ladder_instrument::{Asset, Pair, PairSpec, Side};
use rust_decimal::Decimal;

/// A single venue presented as a uniform capability set. Every concrete adapter
/// (one per exchange dialect) implements this; the engine never branches on which venue it is
/// talking to, only on `capabilities()`.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// Which optional operations this venue supports, computed once at construction (spec §9
    /// redesign flag, replacing implicit per-call `features()` probing).
    fn capabilities(&self) -> AdapterCapabilities;

    /// A short, lowercase identifier for logs and the adapter registry.
    fn venue_name(&self) -> &str;

    async fn markets(&self) -> Result<Vec<(Pair, PairSpec)>, AdapterError>;

    async fn ticker(&self, pair: &Pair) -> Result<Ticker, AdapterError>;

    async fn order_book(&self, pair: &Pair, depth: u32) -> Result<OrderBook, AdapterError>;

    async fn balances(&self, nonzero_only: bool) -> Result<BalancesSnapshot, AdapterError>;

    /// `price` is `None` for market orders. Exactly one of `base_amount`/`quote_amount` is
    /// populated according to `capabilities()`.
    #[allow(clippy::too_many_arguments)]
    async fn place_order(
        &self,
        pair: &Pair,
        side: Side,
        order_type: ladder_instrument::OrderType,
        price: Option<Decimal>,
        base_amount: Option<Decimal>,
        quote_amount: Option<Decimal>,
    ) -> Result<PlaceOrderAck, AdapterError>;

    async fn cancel_order(
        &self,
        venue_id: &str,
        pair: &Pair,
        side: Option<Side>,
    ) -> Result<CancelOutcome, AdapterError>;

    async fn cancel_all(
        &self,
        pair: &Pair,
        side: Option<Side>,
    ) -> Result<CancelAllOutcome, AdapterError>;

    /// All currently-open orders for `pair`. The adapter is responsible for paginating to
    /// exhaustion internally ; the engine sees one finite, already-drained
    /// `Vec`.
    async fn open_orders(&self, pair: &Pair) -> Result<Vec<VenueOrder>, AdapterError>;

    async fn get_order(&self, venue_id: &str, pair: &Pair) -> Result<VenueOrder, AdapterError>;

    async fn deposit_address(&self, asset: &Asset) -> Result<Vec<DepositAddress>, AdapterError>;

    async fn fees(&self, pair: Option<&Pair>) -> Result<Fees, AdapterError>;
}

/// Read-only view an adapter exposes for a single asset balance, used by command handlers that
/// only need one figure rather than the whole snapshot.
pub fn free_balance(snapshot: &BalancesSnapshot, asset: &Asset) -> Decimal {
    snapshot
        .get(asset)
        .map(|balance: &AssetBalance| balance.free)
        .unwrap_or_default()
}
