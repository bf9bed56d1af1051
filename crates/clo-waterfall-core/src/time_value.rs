//! Discounting helpers for period-indexed cash flows.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;

use crate::error::CloError;
use crate::types::{Money, Period, Rate};
use crate::CloResult;

/// Compounding factor `(1 + rate)^periods`.
pub fn growth_factor(rate: Rate, periods: Period) -> CloResult<Decimal> {
    if rate <= Decimal::NEGATIVE_ONE {
        return Err(CloError::config(
            "rate",
            "Discount rate must be greater than -100%",
        ));
    }
    let one_plus_r = Decimal::ONE + rate;
    one_plus_r
        .checked_powd(Decimal::from(periods))
        .ok_or_else(|| CloError::Arithmetic {
            context: format!("growth factor at period {periods}"),
        })
}

/// Present value at period 0 of `(amount, period)` flows.
pub fn present_value(rate: Rate, flows: &[(Money, Period)]) -> CloResult<Money> {
    let mut result = Decimal::ZERO;
    for (amount, period) in flows {
        let factor = growth_factor(rate, *period)?;
        if factor.is_zero() {
            return Err(CloError::Arithmetic {
                context: format!("discount factor at period {period}"),
            });
        }
        result += amount / factor;
    }
    Ok(result)
}

/// Value at `period` of an amount held at period 0.
pub fn future_value(rate: Rate, amount: Money, period: Period) -> CloResult<Money> {
    Ok(amount * growth_factor(rate, period)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_present_value_basic() {
        let flows = vec![(dec!(-1000), 0), (dec!(300), 1), (dec!(400), 2), (dec!(500), 3)];
        let result = present_value(dec!(0.10), &flows).unwrap();
        // -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(0.01));
    }

    #[test]
    fn test_present_value_zero_rate() {
        let flows = vec![(dec!(-100), 0), (dec!(50), 1), (dec!(50), 4)];
        assert_eq!(present_value(dec!(0), &flows).unwrap(), dec!(0));
    }

    #[test]
    fn test_future_value_quarterly_hurdle() {
        // 3% per quarter for four quarters
        let fv = future_value(dec!(0.03), dec!(100), 4).unwrap();
        assert!((fv - dec!(112.550881)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_reject_rate_below_minus_one() {
        assert!(growth_factor(dec!(-1), 2).is_err());
    }
}
