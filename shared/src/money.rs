//! Money calculation utilities using rust_decimal for precision
//!
//! Every monetary value in the marketplace is a `Decimal` with two decimal
//! places. Commission splits for orders and payouts go through
//! [`split_commission`] so both paths round identically.

use rust_decimal::prelude::*;

/// Rounding scale for monetary values
pub const DECIMAL_PLACES: u32 = 2;

/// Scale used when persisting commission rates (e.g. 0.0525)
pub const RATE_DECIMAL_PLACES: u32 = 4;

/// Default commission rate (5%)
pub const DEFAULT_COMMISSION_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Round to 2 dp, half-up (midpoint away from zero)
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Whether a commission rate lies in `[0, 1]`
#[inline]
pub fn is_valid_rate(rate: Decimal) -> bool {
    rate >= Decimal::ZERO && rate <= Decimal::ONE
}

/// Split an amount into `(admin_commission, seller_amount)`.
///
/// The commission is rounded and the seller amount is the remainder, so the
/// two parts always add back to `total` exactly.
pub fn split_commission(total: Decimal, rate: Decimal) -> (Decimal, Decimal) {
    let commission = round_money(total * rate);
    (commission, total - commission)
}

/// Line total: unit price × quantity
#[inline]
pub fn line_total(price: Decimal, quantity: i32) -> Decimal {
    round_money(price * Decimal::from(quantity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_default_rate_is_five_percent() {
        assert_eq!(DEFAULT_COMMISSION_RATE, d("0.05"));
    }

    #[test]
    fn test_split_two_store_checkout_amounts() {
        assert_eq!(split_commission(d("200.00"), d("0.05")), (d("10.00"), d("190.00")));
        assert_eq!(split_commission(d("30.00"), d("0.05")), (d("1.50"), d("28.50")));
    }

    #[test]
    fn test_rounding_half_up() {
        // 0.125 -> 0.13, not banker's 0.12
        assert_eq!(round_money(d("0.125")), d("0.13"));
        assert_eq!(round_money(d("0.124")), d("0.12"));
        assert_eq!(round_money(d("2.675")), d("2.68"));

        // 10.05 × 0.05 = 0.5025 -> 0.50
        let (commission, seller) = split_commission(d("10.05"), d("0.05"));
        assert_eq!(commission, d("0.50"));
        assert_eq!(seller, d("9.55"));
    }

    #[test]
    fn test_split_invariant_across_rates() {
        let totals = ["0.01", "0.99", "1.00", "19.99", "33.33", "100.05", "12345.67"];
        let rates = ["0", "0.0001", "0.05", "0.0525", "0.125", "0.3333", "0.5", "0.9999", "1"];
        for t in totals {
            for r in rates {
                let total = d(t);
                let (commission, seller) = split_commission(total, d(r));
                assert_eq!(commission + seller, total, "total={t} rate={r}");
                assert!(commission >= Decimal::ZERO);
                assert!(seller >= Decimal::ZERO);
                assert!(commission.scale() <= DECIMAL_PLACES);
            }
        }
    }

    #[test]
    fn test_zero_and_full_rate() {
        assert_eq!(split_commission(d("42.10"), Decimal::ZERO), (d("0"), d("42.10")));
        assert_eq!(split_commission(d("42.10"), Decimal::ONE), (d("42.10"), d("0")));
    }

    #[test]
    fn test_rate_bounds() {
        assert!(is_valid_rate(Decimal::ZERO));
        assert!(is_valid_rate(Decimal::ONE));
        assert!(is_valid_rate(d("0.05")));
        assert!(!is_valid_rate(d("-0.01")));
        assert!(!is_valid_rate(d("1.01")));
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line_total(d("50.00"), 2), d("100.00"));
        assert_eq!(line_total(d("0.10"), 3), d("0.30"));
    }
}
