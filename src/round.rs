//! Rounding of iteration counts to readable values.

/// Largest power of ten that is `<= n`.
///
/// Returns 1 for `n == 0`.
pub fn round_down_pow10(n: u64) -> u64 {
    let mut rest = n;
    let mut result = 1u64;
    while rest >= 10 {
        rest /= 10;
        result *= 10;
    }
    result
}

/// Smallest value of the form 1, 2 or 5 times a power of ten that is `>= n`.
///
/// Saturates at `u64::MAX` when the next step would overflow.
///
/// ```
/// use benchpress::round_up_nice;
///
/// assert_eq!(round_up_nice(3), 5);
/// assert_eq!(round_up_nice(42), 50);
/// assert_eq!(round_up_nice(120), 200);
/// ```
pub fn round_up_nice(n: u64) -> u64 {
    let base = round_down_pow10(n);
    [1, 2, 5, 10]
        .into_iter()
        .map(|m| base.saturating_mul(m))
        .find(|&v| n <= v)
        .unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_nice(v: u64) -> bool {
        let base = round_down_pow10(v);
        v == base || v == base * 2 || v == base * 5
    }

    #[test]
    fn should_round_down_to_power_of_ten() {
        assert_eq!(round_down_pow10(1), 1);
        assert_eq!(round_down_pow10(9), 1);
        assert_eq!(round_down_pow10(10), 10);
        assert_eq!(round_down_pow10(99), 10);
        assert_eq!(round_down_pow10(12_345), 10_000);
        assert_eq!(round_down_pow10(1_000_000_000), 1_000_000_000);
    }

    #[test]
    fn should_bracket_n_between_consecutive_powers() {
        for n in (1..100_000u64).step_by(7).chain([u64::MAX]) {
            let p = round_down_pow10(n);
            assert!(p <= n);
            if let Some(next) = p.checked_mul(10) {
                assert!(n < next, "n={n} p={p}");
            }
        }
    }

    #[test]
    fn should_return_one_when_zero() {
        assert_eq!(round_down_pow10(0), 1);
        assert_eq!(round_up_nice(0), 1);
    }

    #[test]
    fn should_round_up_to_nice_values() {
        assert_eq!(round_up_nice(1), 1);
        assert_eq!(round_up_nice(2), 2);
        assert_eq!(round_up_nice(3), 5);
        assert_eq!(round_up_nice(5), 5);
        assert_eq!(round_up_nice(7), 10);
        assert_eq!(round_up_nice(10), 10);
        assert_eq!(round_up_nice(11), 20);
        assert_eq!(round_up_nice(42), 50);
        assert_eq!(round_up_nice(120), 200);
        assert_eq!(round_up_nice(1_500_000), 2_000_000);
    }

    #[test]
    fn should_pick_smallest_nice_value_not_below_n() {
        for n in 1..5_000u64 {
            let v = round_up_nice(n);
            assert!(v >= n);
            assert!(is_nice(v), "{v} is not nice");
            // No nice value in [n, v) exists.
            assert!((n..v).all(|m| !is_nice(m)), "n={n} v={v}");
        }
    }

    #[test]
    fn should_saturate_instead_of_overflowing() {
        assert_eq!(round_up_nice(u64::MAX), u64::MAX);
    }
}
