use crate::asset::Asset;
use derive_more::{Constructor, Display};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An ordered trading symbol `(base, quote)`, e.g. `ADM/USDT`. Case-folded to upper on
/// construction.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub struct Pair {
    pub base: Asset,
    pub quote: Asset,
}

impl Pair {
    pub fn new(base: impl Into<Asset>, quote: impl Into<Asset>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Error parsing a `Pair` from its `BASE/QUOTE` textual form.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid pair format {0:?}, expected BASE/QUOTE")]
pub struct PairParseError(String);

impl FromStr for Pair {
    type Err = PairParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .split_once('/')
            .ok_or_else(|| PairParseError(s.to_string()))?;

        if base.trim().is_empty() || quote.trim().is_empty() {
            return Err(PairParseError(s.to_string()));
        }

        Ok(Pair::new(base, quote))
    }
}

/// Whether a venue currently accepts trading on a [`Pair`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize, Display)]
pub enum MarketStatus {
    Online,
    Offline,
}

/// Venue-imposed descriptors for a [`Pair`], fetched once from the adapter's `markets()` call
/// and treated as immutable for the engine's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, Constructor)]
pub struct PairSpec {
    pub base_decimals: u32,
    pub quote_decimals: u32,
    pub base_step: Decimal,
    pub quote_tick: Decimal,
    pub min_base_amount: Decimal,
    pub min_quote_amount: Decimal,
    pub status: MarketStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_upper_cases() {
        let pair: Pair = "adm/usdt".parse().unwrap();
        assert_eq!(pair.base.as_str(), "ADM");
        assert_eq!(pair.quote.as_str(), "USDT");
        assert_eq!(pair.to_string(), "ADM/USDT");
    }

    #[test]
    fn rejects_missing_slash() {
        assert!("ADMUSDT".parse::<Pair>().is_err());
    }

    #[test]
    fn rejects_empty_side() {
        assert!("/USDT".parse::<Pair>().is_err());
        assert!("ADM/".parse::<Pair>().is_err());
    }
}
