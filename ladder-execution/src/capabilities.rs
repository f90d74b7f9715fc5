use derive_more::Constructor;
use serde::{Deserialize, Serialize};

/// Computed once at adapter construction. Callers consult this instead of attempting an
/// operation and parsing the failure.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct AdapterCapabilities {
    pub place_market_order: bool,
    pub allow_amount_for_market_buy: bool,
    pub amount_for_market_order_necessary: bool,
    pub get_deposit_address: bool,
    pub get_trading_fees: bool,
    pub get_account_trade_volume: bool,
    pub get_markets: bool,
    pub account_types: bool,
}

impl AdapterCapabilities {
    /// A venue supporting every optional capability (used by the reference/mock adapter).
    pub const fn full() -> Self {
        Self {
            place_market_order: true,
            allow_amount_for_market_buy: true,
            amount_for_market_order_necessary: false,
            get_deposit_address: true,
            get_trading_fees: true,
            get_account_trade_volume: true,
            get_markets: true,
            account_types: true,
        }
    }

    /// A minimal venue supporting only limit orders over the core operations.
    pub const fn minimal() -> Self {
        Self {
            place_market_order: false,
            allow_amount_for_market_buy: false,
            amount_for_market_order_necessary: false,
            get_deposit_address: false,
            get_trading_fees: false,
            get_account_trade_volume: false,
            get_markets: false,
            account_types: false,
        }
    }
}
