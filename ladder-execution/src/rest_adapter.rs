//! Wiring for a real, signed-REST venue onto the [`ExchangeAdapter`] trait. Splits generic call
//! plumbing (`RestClient`) from per-venue request signing (`RestAdapterDialect`): a concrete venue
//! implements `RestAdapterDialect` with its own endpoint paths, payload shapes, and HMAC/API-key
//! signing, and nothing else in this file needs to change.

use crate::adapter::ExchangeAdapter;
use crate::capabilities::AdapterCapabilities;
use crate::error::AdapterError;
use crate::models::{
    BalancesSnapshot, CancelAllOutcome, CancelOutcome, DepositAddress, Fees, OrderBook,
    PlaceOrderAck, Ticker, VenueOrder,
};
use async_trait::async_trait;
use ladder_instrument::{Asset, OrderType, Pair, PairSpec, Side};
use ladder_integration::error::TransportError;
use ladder_integration::rest::{BuildStrategy, RestClient};
use rust_decimal::Decimal;

/// Per-venue translation from the uniform [`ExchangeAdapter`] call surface to that venue's own
/// REST request/response shapes. Implement this once per real exchange; `RestAdapter<D>` supplies
/// the rest.
#[async_trait]
pub trait RestAdapterDialect: Send + Sync {
    type Strategy: BuildStrategy + Send + Sync;

    fn venue_name(&self) -> &str;
    fn capabilities(&self) -> AdapterCapabilities;
    fn client(&self) -> &RestClient<Self::Strategy>;

    async fn markets(&self) -> Result<Vec<(Pair, PairSpec)>, TransportError>;
    async fn ticker(&self, pair: &Pair) -> Result<Ticker, TransportError>;
    async fn order_book(&self, pair: &Pair, depth: u32) -> Result<OrderBook, TransportError>;
    async fn balances(&self, nonzero_only: bool) -> Result<BalancesSnapshot, TransportError>;
    #[allow(clippy::too_many_arguments)]
    async fn place_order(
        &self,
        pair: &Pair,
        side: Side,
        order_type: OrderType,
        price: Option<Decimal>,
        base_amount: Option<Decimal>,
        quote_amount: Option<Decimal>,
    ) -> Result<PlaceOrderAck, TransportError>;
    async fn cancel_order(
        &self,
        venue_id: &str,
        pair: &Pair,
        side: Option<Side>,
    ) -> Result<CancelOutcome, TransportError>;
    async fn cancel_all(
        &self,
        pair: &Pair,
        side: Option<Side>,
    ) -> Result<CancelAllOutcome, TransportError>;
    async fn open_orders(&self, pair: &Pair) -> Result<Vec<VenueOrder>, TransportError>;
    async fn get_order(&self, venue_id: &str, pair: &Pair) -> Result<VenueOrder, TransportError>;
    async fn deposit_address(&self, asset: &Asset) -> Result<Vec<DepositAddress>, TransportError>;
    async fn fees(&self, pair: Option<&Pair>) -> Result<Fees, TransportError>;
}

/// Adapts any [`RestAdapterDialect`] into the engine's [`ExchangeAdapter`], mapping
/// [`TransportError`] onto the spec §7 taxonomy once, in one place.
#[derive(Debug)]
pub struct RestAdapter<D> {
    dialect: D,
}

impl<D> RestAdapter<D> {
    pub fn new(dialect: D) -> Self {
        Self { dialect }
    }
}

fn map_transport_error(error: TransportError) -> AdapterError {
    if error.is_temporary() {
        AdapterError::UpstreamTemporary {
            code: None,
            message: error.to_string(),
        }
    } else {
        match error {
            TransportError::Status { status, body } if (400..500).contains(&status) => {
                AdapterError::UpstreamPermanent {
                    code: Some(status.to_string()),
                    message: body,
                }
            }
            other => AdapterError::Protocol(other.to_string()),
        }
    }
}

#[async_trait]
impl<D> ExchangeAdapter for RestAdapter<D>
where
    D: RestAdapterDialect,
{
    fn capabilities(&self) -> AdapterCapabilities {
        self.dialect.capabilities()
    }

    fn venue_name(&self) -> &str {
        self.dialect.venue_name()
    }

    async fn markets(&self) -> Result<Vec<(Pair, PairSpec)>, AdapterError> {
        self.dialect.markets().await.map_err(map_transport_error)
    }

    async fn ticker(&self, pair: &Pair) -> Result<Ticker, AdapterError> {
        self.dialect
            .ticker(pair)
            .await
            .map_err(map_transport_error)
    }

    async fn order_book(&self, pair: &Pair, depth: u32) -> Result<OrderBook, AdapterError> {
        self.dialect
            .order_book(pair, depth)
            .await
            .map_err(map_transport_error)
    }

    async fn balances(&self, nonzero_only: bool) -> Result<BalancesSnapshot, AdapterError> {
        self.dialect
            .balances(nonzero_only)
            .await
            .map_err(map_transport_error)
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
        if order_type == OrderType::Market && !self.dialect.capabilities().place_market_order {
            return Err(AdapterError::Unsupported(
                "venue does not support market orders".into(),
            ));
        }
        self.dialect
            .place_order(pair, side, order_type, price, base_amount, quote_amount)
            .await
            .map_err(map_transport_error)
    }

    async fn cancel_order(
        &self,
        venue_id: &str,
        pair: &Pair,
        side: Option<Side>,
    ) -> Result<CancelOutcome, AdapterError> {
        self.dialect
            .cancel_order(venue_id, pair, side)
            .await
            .map_err(map_transport_error)
    }

    async fn cancel_all(
        &self,
        pair: &Pair,
        side: Option<Side>,
    ) -> Result<CancelAllOutcome, AdapterError> {
        self.dialect
            .cancel_all(pair, side)
            .await
            .map_err(map_transport_error)
    }

    async fn open_orders(&self, pair: &Pair) -> Result<Vec<VenueOrder>, AdapterError> {
        self.dialect
            .open_orders(pair)
            .await
            .map_err(map_transport_error)
    }

    async fn get_order(&self, venue_id: &str, pair: &Pair) -> Result<VenueOrder, AdapterError> {
        self.dialect
            .get_order(venue_id, pair)
            .await
            .map_err(map_transport_error)
    }

    async fn deposit_address(&self, asset: &Asset) -> Result<Vec<DepositAddress>, AdapterError> {
        if !self.dialect.capabilities().get_deposit_address {
            return Err(AdapterError::Unsupported(
                "venue does not support deposit addresses".into(),
            ));
        }
        self.dialect
            .deposit_address(asset)
            .await
            .map_err(map_transport_error)
    }

    async fn fees(&self, pair: Option<&Pair>) -> Result<Fees, AdapterError> {
        if !self.dialect.capabilities().get_trading_fees {
            return Err(AdapterError::Unsupported(
                "venue does not expose trading fees".into(),
            ));
        }
        self.dialect.fees(pair).await.map_err(map_transport_error)
    }
}
