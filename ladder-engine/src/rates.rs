use async_trait::async_trait;
use ladder_instrument::Asset;
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RatesError {
    #[error("no conversion path from {from} to {to}")]
    NoPath { from: Asset, to: Asset },
    #[error("upstream rates error: {0}")]
    Upstream(String),
}

/// A single conversion result.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub out_amount: Decimal,
    pub path: Vec<Asset>,
    pub stale: bool,
}

/// Cross-asset conversion for USD-equivalent sizing and the confirmation threshold.
/// The engine only ever consults this for display and the confirmation check — never for
/// trading decisions.
#[async_trait]
pub trait RatesOracle: Send + Sync {
    async fn convert(
        &self,
        from: &Asset,
        to: &Asset,
        amount: Decimal,
    ) -> Result<Conversion, RatesError>;

    fn has_ticker(&self, code: &Asset) -> bool;

    fn is_fiat(&self, code: &Asset) -> bool;

    /// Output precision policy: 2dp for fiat, the caller's configured crypto
    /// precision otherwise.
    fn precision_for(&self, code: &Asset) -> u32 {
        if self.is_fiat(code) { 2 } else { 8 }
    }
}

/// A rates oracle backed by a fixed table of USD prices, refreshed externally (e.g. by a
/// scheduled task calling [`StaticRatesOracle::set_price`]). Queried on demand as an external
/// collaborator rather than computed by the core; a production deployment would replace this
/// with an HTTP-backed client built on `ladder_integration::rest::RestClient`, following the
/// same `BuildStrategy` split as `RestAdapter`.
#[derive(Debug, Default)]
pub struct StaticRatesOracle {
    usd_prices: parking_lot::RwLock<HashMap<Asset, Decimal>>,
    fiat: parking_lot::RwLock<std::collections::HashSet<Asset>>,
    stale: std::sync::atomic::AtomicBool,
}

impl StaticRatesOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_price(&self, code: Asset, usd_price: Decimal) {
        self.usd_prices.write().insert(code, usd_price);
    }

    pub fn mark_fiat(&self, code: Asset) {
        self.fiat.write().insert(code);
    }

    pub fn set_stale(&self, stale: bool) {
        self.stale
            .store(stale, std::sync::atomic::Ordering::Relaxed);
    }

    fn usd_price(&self, code: &Asset) -> Option<Decimal> {
        if self.is_fiat(code) && code.as_str() == "USD" {
            return Some(Decimal::ONE);
        }
        self.usd_prices.read().get(code).copied()
    }
}

#[async_trait]
impl RatesOracle for StaticRatesOracle {
    async fn convert(
        &self,
        from: &Asset,
        to: &Asset,
        amount: Decimal,
    ) -> Result<Conversion, RatesError> {
        let from_usd = self.usd_price(from).ok_or_else(|| RatesError::NoPath {
            from: from.clone(),
            to: to.clone(),
        })?;
        let to_usd = self.usd_price(to).ok_or_else(|| RatesError::NoPath {
            from: from.clone(),
            to: to.clone(),
        })?;

        let precision = self.precision_for(to);
        let out_amount = (amount * from_usd / to_usd).round_dp(precision);

        Ok(Conversion {
            out_amount,
            path: vec![from.clone(), Asset::new("USD"), to.clone()],
            stale: self.stale.load(std::sync::atomic::Ordering::Relaxed),
        })
    }

    fn has_ticker(&self, code: &Asset) -> bool {
        code.as_str() == "USD" || self.usd_prices.read().contains_key(code)
    }

    fn is_fiat(&self, code: &Asset) -> bool {
        code.as_str() == "USD" || self.fiat.read().contains(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn converts_via_usd() {
        let oracle = StaticRatesOracle::new();
        oracle.set_price(Asset::new("ADM"), dec!(1.2));
        oracle.mark_fiat(Asset::new("USDT"));
        oracle.set_price(Asset::new("USDT"), dec!(1));

        let result = oracle
            .convert(&Asset::new("ADM"), &Asset::new("USD"), dec!(500))
            .await
            .unwrap();

        assert_eq!(result.out_amount, dec!(600.00));
        assert!(!result.stale);
    }

    #[tokio::test]
    async fn missing_price_has_no_path() {
        let oracle = StaticRatesOracle::new();
        let result = oracle
            .convert(&Asset::new("ZZZ"), &Asset::new("USD"), dec!(1))
            .await;
        assert!(result.is_err());
    }
}
