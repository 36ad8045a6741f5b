//! Integer-cent arithmetic for seat prices, booking totals and platform fees.

pub type Cents = i64;

pub const BPS_DENOMINATOR: i64 = 10_000;

/// Converts a dollar amount as entered by a pilot into whole cents.
///
/// Returns `None` for non-finite or negative values and for amounts that do not
/// fit in `i64` cents.
pub fn dollars_to_cents(dollars: f64) -> Option<Cents> {
    if !dollars.is_finite() || dollars < 0.0 {
        return None;
    }
    let cents = (dollars * 100.0).round();
    if cents > i64::MAX as f64 {
        return None;
    }
    Some(cents as i64)
}

/// Seat price times seat count, `None` on overflow.
pub fn total_for_seats(price_per_seat: Cents, seats: i32) -> Option<Cents> {
    price_per_seat.checked_mul(i64::from(seats))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    pub total: Cents,
    pub platform_fee: Cents,
    pub pilot_payout: Cents,
}

impl FeeSplit {
    /// Platform fee is rounded down; the pilot keeps the remainder.
    pub fn new(total: Cents, fee_bps: i32) -> Self {
        let bps = i64::from(fee_bps.clamp(0, BPS_DENOMINATOR as i32));
        let platform_fee = (i128::from(total) * i128::from(bps) / i128::from(BPS_DENOMINATOR)) as i64;
        Self {
            total,
            platform_fee,
            pilot_payout: total - platform_fee,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dollars_to_cents_rounds() {
        assert_eq!(dollars_to_cents(249.99), Some(24_999));
        assert_eq!(dollars_to_cents(0.005), Some(1));
        assert_eq!(dollars_to_cents(-1.0), None);
        assert_eq!(dollars_to_cents(f64::NAN), None);
    }

    #[test]
    fn test_fee_split_sums_to_total() {
        let split = FeeSplit::new(24_999 * 3, 1000);
        assert_eq!(split.platform_fee, 7_499);
        assert_eq!(split.platform_fee + split.pilot_payout, split.total);

        let no_fee = FeeSplit::new(10_000, 0);
        assert_eq!(no_fee.pilot_payout, 10_000);
    }

    #[test]
    fn test_total_for_seats_overflow() {
        assert_eq!(total_for_seats(25_000, 4), Some(100_000));
        assert_eq!(total_for_seats(i64::MAX, 2), None);
    }
}
