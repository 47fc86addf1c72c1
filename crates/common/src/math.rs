//! Fixed-point math utilities
//!
//! Every product of two share amounts is formed in `u128` so nothing rounds
//! before the final division. Results that do not fit back into a share
//! amount are reported as `None`.

use crate::constants::PERCENT_100;

/// Multiply two u64 values and return u128
#[inline]
pub fn mul_u64(a: u64, b: u64) -> u128 {
    (a as u128) * (b as u128)
}

/// Divide u128 by u64, rounding down
#[inline]
pub fn div_floor_u128(numerator: u128, denominator: u64) -> u128 {
    numerator / (denominator as u128)
}

/// `floor(amount * num / den)` for non-negative share amounts
///
/// Returns `None` for a zero denominator, a negative operand, or a result
/// larger than `i64::MAX`.
#[inline]
pub fn mul_div_floor(amount: i64, num: i64, den: i64) -> Option<i64> {
    if amount < 0 || num < 0 || den <= 0 {
        return None;
    }
    let wide = div_floor_u128(mul_u64(amount as u64, num as u64), den as u64);
    i64::try_from(wide).ok()
}

/// `floor(amount * pct / 100%)`
#[inline]
pub fn percent_of(amount: i64, pct: u16) -> Option<i64> {
    mul_div_floor(amount, pct as i64, PERCENT_100 as i64)
}

/// `floor(amount * (100% - pct) / 100%)`, the share left after a percentage cut
#[inline]
pub fn after_percent_cut(amount: i64, pct: u16) -> Option<i64> {
    if pct > PERCENT_100 {
        return None;
    }
    percent_of(amount, PERCENT_100 - pct)
}

/// Greatest common divisor
#[inline]
pub fn gcd_u128(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_floor_wide_intermediate() {
        // amount * num overflows i64 but the quotient fits
        let big = 9_000_000_000_000_000i64;
        assert_eq!(mul_div_floor(big, 10, 100), Some(900_000_000_000_000));
        assert_eq!(mul_div_floor(big, 2, 1), None);
        assert_eq!(mul_div_floor(1, 1, 0), None);
        assert_eq!(mul_div_floor(-1, 1, 1), None);
        // rounds toward zero
        assert_eq!(mul_div_floor(10, 1, 3), Some(3));
    }

    #[test]
    fn test_percent_cut() {
        // 1% offset on 2000 leaves 1980
        assert_eq!(after_percent_cut(2000, 100), Some(1980));
        assert_eq!(after_percent_cut(2000, 0), Some(2000));
        assert_eq!(after_percent_cut(2000, PERCENT_100), Some(0));
        assert_eq!(after_percent_cut(2000, PERCENT_100 + 1), None);
        // rounds down
        assert_eq!(after_percent_cut(999, 100), Some(989));
    }

    #[test]
    fn test_gcd() {
        assert_eq!(gcd_u128(12, 18), 6);
        assert_eq!(gcd_u128(7, 0), 7);
    }
}
