//! Termination of the number accumulator.
//!
//! The accumulator only ever holds a prefix of a valid JSON number with the
//! leading minus stripped, so `str::parse` is all the machinery needed: it
//! is locale-independent (the separator is always `.`) and rounds to
//! nearest-even. Integer helpers fail on overflow rather than panic; the
//! state machine retries the buffer as a double.

/// Interprets a digit buffer as a signed 64-bit integer. `None` on
/// overflow.
pub(crate) fn parse_i64(digits: &str, is_negative: bool) -> Option<i64> {
    let magnitude = digits.parse::<u64>().ok()?;
    if is_negative {
        // The magnitude of i64::MIN is one past i64::MAX.
        if magnitude > i64::MAX as u64 + 1 {
            return None;
        }
        Some(0i64.wrapping_sub_unsigned(magnitude))
    } else {
        i64::try_from(magnitude).ok()
    }
}

/// Interprets a digit buffer as an unsigned 64-bit integer. `None` on
/// overflow.
pub(crate) fn parse_u64(digits: &str) -> Option<u64> {
    digits.parse::<u64>().ok()
}

/// Interprets the accumulator as a decimal literal and returns the nearest
/// double. `None` when the conversion fails or leaves the finite range.
pub(crate) fn parse_digits(digits: &str) -> Option<f64> {
    digits.parse::<f64>().ok().filter(|d| d.is_finite())
}
