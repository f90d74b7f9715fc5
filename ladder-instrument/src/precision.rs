use crate::pair::PairSpec;
use rust_decimal::{Decimal, RoundingStrategy};

/// Round `value` down to the nearest multiple of `increment`, the convention venues use for
/// both price ticks and amount steps: a rung priced or sized favourably-rounded-up could cross
/// a minimum the venue would reject, so we always round towards zero movement from the ideal.
pub fn round_to_increment(value: Decimal, increment: Decimal) -> Decimal {
    if increment.is_zero() {
        return value;
    }

    (value / increment)
        .round_dp_with_strategy(0, RoundingStrategy::ToZero)
        * increment
}

/// Round a price to the pair's `quote_tick`.
pub fn round_price(spec: &PairSpec, price: Decimal) -> Decimal {
    round_to_increment(price, spec.quote_tick)
}

/// Round a base amount to the pair's `base_step`.
pub fn round_amount(spec: &PairSpec, amount: Decimal) -> Decimal {
    round_to_increment(amount, spec.base_step)
}

/// Reasons a rounded price/amount pair fails venue minimums.
#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
pub enum AmountValidationError {
    #[error("amount below venue minimum base amount")]
    BelowMinBaseAmount,
    #[error("volume below venue minimum quote amount")]
    BelowMinQuoteAmount,
    #[error("amount must be positive")]
    NonPositive,
}

/// Validate a rounded `(price, amount)` pair against the [`PairSpec`] minimums.
pub fn validate_amount(
    spec: &PairSpec,
    price: Decimal,
    amount: Decimal,
) -> Result<Decimal, AmountValidationError> {
    if amount <= Decimal::ZERO || price <= Decimal::ZERO {
        return Err(AmountValidationError::NonPositive);
    }

    if amount < spec.min_base_amount {
        return Err(AmountValidationError::BelowMinBaseAmount);
    }

    let volume = price * amount;
    if volume < spec.min_quote_amount {
        return Err(AmountValidationError::BelowMinQuoteAmount);
    }

    Ok(volume)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pair::MarketStatus;
    use rust_decimal_macros::dec;

    fn spec() -> PairSpec {
        PairSpec::new(8, 8, dec!(0.01), dec!(0.0001), dec!(1), dec!(10), MarketStatus::Online)
    }

    #[test]
    fn rounds_down_to_tick() {
        assert_eq!(round_to_increment(dec!(1.00999), dec!(0.0001)), dec!(1.0099));
    }

    #[test]
    fn rounds_exact_multiple_unchanged() {
        assert_eq!(round_to_increment(dec!(2.0002), dec!(0.0001)), dec!(2.0002));
    }

    #[test]
    fn validate_rejects_below_min_base() {
        let spec = spec();
        assert_eq!(
            validate_amount(&spec, dec!(1), dec!(0.5)),
            Err(AmountValidationError::BelowMinBaseAmount)
        );
    }

    #[test]
    fn validate_rejects_below_min_quote() {
        let spec = spec();
        // amount ok (>= 1) but price*amount < 10
        assert_eq!(
            validate_amount(&spec, dec!(1), dec!(1)),
            Err(AmountValidationError::BelowMinQuoteAmount)
        );
    }

    #[test]
    fn validate_accepts_in_range() {
        let spec = spec();
        assert_eq!(validate_amount(&spec, dec!(2), dec!(10)), Ok(dec!(20)));
    }
}
