//! Volatility-normalized position sizing.
//!
//! size = round(portfolio_value * risk_fraction / volatility)
//!
//! The risk fraction is a per-strategy constant; dividing by a realized
//! volatility estimate (typically ATR) keeps exposure independent of each
//! instrument's price scale.

#[derive(Debug, Clone, thiserror::Error)]
pub enum SizingError {
    #[error("position sizing is undefined for volatility {volatility}")]
    InvalidVolatility { volatility: f64 },
}

pub fn size_for(
    portfolio_value: f64,
    risk_fraction: f64,
    volatility: f64,
) -> Result<i64, SizingError> {
    if volatility <= 0.0 {
        return Err(SizingError::InvalidVolatility { volatility });
    }
    Ok((portfolio_value * risk_fraction / volatility).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn canonical_example() {
        assert_eq!(size_for(100_000.0, 0.02, 20.0).unwrap(), 100);
    }

    #[test]
    fn rounds_to_nearest_unit() {
        // 100000 * 0.01 / 3 = 333.33…
        assert_eq!(size_for(100_000.0, 0.01, 3.0).unwrap(), 333);
        // 100000 * 0.01 / 1.6 = 625.0
        assert_eq!(size_for(100_000.0, 0.01, 1.6).unwrap(), 625);
    }

    #[test]
    fn zero_volatility_is_an_error() {
        let err = size_for(100_000.0, 0.02, 0.0).unwrap_err();
        assert!(matches!(err, SizingError::InvalidVolatility { .. }));
    }

    #[test]
    fn negative_volatility_is_an_error() {
        assert!(size_for(100_000.0, 0.02, -5.0).is_err());
    }

    #[test]
    fn tiny_budget_rounds_to_zero() {
        assert_eq!(size_for(1_000.0, 0.001, 50.0).unwrap(), 0);
    }

    proptest! {
        /// Sizing scales linearly in portfolio value and inversely in
        /// volatility, within rounding.
        #[test]
        fn size_is_monotonic_in_value(
            value in 1_000.0f64..10_000_000.0,
            fraction in 0.001f64..0.05,
            volatility in 0.1f64..500.0,
        ) {
            let size = size_for(value, fraction, volatility).unwrap();
            let bigger = size_for(value * 2.0, fraction, volatility).unwrap();
            prop_assert!(bigger >= size);
            prop_assert!(size >= 0);
        }

        #[test]
        fn nonpositive_volatility_always_fails(
            value in 0.0f64..1_000_000.0,
            volatility in -1_000.0f64..=0.0,
        ) {
            prop_assert!(size_for(value, 0.02, volatility).is_err());
        }
    }
}
