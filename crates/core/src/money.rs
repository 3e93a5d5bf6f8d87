//! Integer money arithmetic.
//!
//! Amounts are `i64` in the smallest currency unit (e.g. cents). Percentages
//! are whole percent values.

/// `amount × percent / 100`, rounded half away from zero.
pub fn percent_of(amount: i64, percent: u32) -> i64 {
    let scaled = amount as i128 * percent as i128;
    let rounded = if scaled >= 0 {
        (scaled + 50) / 100
    } else {
        (scaled - 50) / 100
    };
    rounded as i64
}

/// Share of `amount` that corresponds to `part` out of `whole` (truncating).
///
/// Returns 0 when `whole` is 0.
pub fn prorate(amount: i64, part: i64, whole: i64) -> i64 {
    if whole == 0 {
        return 0;
    }
    (amount as i128 * part as i128 / whole as i128) as i64
}
