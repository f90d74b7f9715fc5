use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Which side of the book an order rests on. Also doubles as the rung sign in the ladder
/// strategy: negative rung index is a buy, positive is a sell.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Limit vs market order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
pub enum OrderType {
    Limit,
    Market,
}
