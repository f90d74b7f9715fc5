use chrono::{DateTime, Utc};
use derive_more::Display;
use ladder_instrument::{OrderType, Pair, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Engine-assigned, unique and stable order id. Distinct from the
/// venue-assigned id, which may be absent while an order is `pending`/`not-placed`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
pub struct OrderId(pub u64);

/// Why the engine placed an order.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
pub enum Purpose {
    Ladder,
    Manual,
    FundSupplier,
    Unknown,
}

impl Purpose {
    /// Parses the free-form purpose token accepted by `/clear <purpose>` and similar commands.
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "ladder" | "ld" => Some(Purpose::Ladder),
            "manual" => Some(Purpose::Manual),
            "fund-supplier" | "fund_supplier" | "funds" => Some(Purpose::FundSupplier),
            "unknown" | "unk" => Some(Purpose::Unknown),
            _ => None,
        }
    }

    /// Purposes that `clear_all`/`clear_local` skip unless `force=true`.
    pub fn is_cancellable_by_default(self) -> bool {
        !matches!(self, Purpose::FundSupplier)
    }
}

/// Lifecycle state of a single [`Order`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
pub enum LadderState {
    Pending,
    Placed,
    Filled,
    Cancelled,
    NotPlaced,
}

/// A persistent record of one order the engine has placed, or attempted to place.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub venue_id: Option<String>,
    pub pair: Pair,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Decimal,
    pub amount: Decimal,
    pub volume: Decimal,
    pub purpose: Purpose,
    pub ladder_index: Option<i32>,
    pub ladder_state: LadderState,
    pub ladder_not_placed_reason: Option<String>,
    pub amount_executed: Decimal,
    pub volume_executed: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip, default = "Instant::now")]
    pub created_monotonic: Instant,
    pub is_processed: bool,
}

impl Order {
    /// A freshly-minted rung/manual order about to be submitted to the adapter.
    #[allow(clippy::too_many_arguments)]
    pub fn new_pending(
        id: OrderId,
        pair: Pair,
        side: Side,
        order_type: OrderType,
        price: Decimal,
        amount: Decimal,
        volume: Decimal,
        purpose: Purpose,
        ladder_index: Option<i32>,
        now: DateTime<Utc>,
) -> Self {
        Self {
            id,
            venue_id: None,
            pair,
            side,
            order_type,
            price,
            amount,
            volume,
            purpose,
            ladder_index,
            ladder_state: LadderState::Pending,
            ladder_not_placed_reason: None,
            amount_executed: Decimal::ZERO,
            volume_executed: Decimal::ZERO,
            created_at: now,
            updated_at: now,
            created_monotonic: Instant::now(),
            is_processed: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.ladder_state,
            LadderState::Filled | LadderState::Cancelled | LadderState::NotPlaced
)
    }
}
