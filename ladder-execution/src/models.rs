use chrono::{DateTime, Utc};
use derive_more::{Constructor, Display};
use ladder_instrument::{Asset, Pair};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Best bid/ask plus last/high/low/volume, normalised from whatever shape the venue returns
/// (spec §4.1 `ticker(pair)`).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, Constructor)]
pub struct Ticker {
    pub bid: Decimal,
    pub ask: Decimal,
    pub last: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub volume_base: Decimal,
    pub volume_quote: Decimal,
}

impl Ticker {
    /// Half-sum of best bid and best ask.
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::from(2u8)
    }
}

/// One price level of an order book side.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, Constructor)]
pub struct BookLevel {
    pub price: Decimal,
    pub amount: Decimal,
    pub count: u32,
}

/// `bids` descending by price, `asks` ascending by price.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct OrderBook {
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

impl OrderBook {
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|level| level.price)
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|level| level.price)
    }
}

/// Per-asset balance snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct AssetBalance {
    pub free: Decimal,
    pub freezed: Decimal,
    pub total: Decimal,
    pub usd_equiv: Option<Decimal>,
    pub btc_equiv: Option<Decimal>,
}

impl AssetBalance {
    pub fn new(free: Decimal, freezed: Decimal) -> Self {
        Self {
            free,
            freezed,
            total: free + freezed,
            usd_equiv: None,
            btc_equiv: None,
        }
    }
}

/// A full balances request response, keyed by [`Asset`] code.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BalancesSnapshot {
    pub balances: Vec<(Asset, AssetBalance)>,
}

impl BalancesSnapshot {
    pub fn get(&self, asset: &Asset) -> Option<&AssetBalance> {
        self.balances
            .iter()
            .find(|(code, _)| code == asset)
            .map(|(_, balance)| balance)
    }
}

/// Outcome of a `place_order` call: a venue id on success, `None` when the venue
/// rejected the order outright but still returned a diagnostic message rather than an error.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct PlaceOrderAck {
    pub venue_id: Option<String>,
    pub message: String,
}

/// Outcome of a `cancel_order` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum CancelOutcome {
    Cancelled,
    AlreadyCancelledOrAbsent,
}

/// Outcome of a best-effort `cancel_all` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Constructor)]
pub struct CancelAllOutcome {
    pub cancelled_count: u32,
    pub target_count: u32,
}

/// Venue-reported lifecycle state of a single order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Display)]
pub enum VenueOrderStatus {
    New,
    PartFilled,
    Filled,
    Cancelled,
    Unknown,
}

/// Venue-side view of one order, as returned by `open_orders`/`get_order`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct VenueOrder {
    pub venue_id: String,
    pub pair: Pair,
    pub side: ladder_instrument::Side,
    pub price: Decimal,
    pub amount: Decimal,
    pub status: VenueOrderStatus,
    pub amount_executed: Decimal,
    pub volume_executed: Decimal,
    pub average_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// One or more deposit endpoints for an asset.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct DepositAddress {
    pub network: String,
    pub address: String,
    pub memo: Option<String>,
}

/// Maker/taker fee schedule for a pair.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, Constructor)]
pub struct Fees {
    pub maker_percent: Decimal,
    pub taker_percent: Decimal,
}
