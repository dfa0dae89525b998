//! Order number validation.
//!
//! Order numbers are decimal digit strings protected by a Luhn checksum. Whitespace is not significant, so
//! `"4532 0151 1283 0366"` and `"4532015112830366"` are the same order.
use crate::db_types::OrderNumber;

/// Returns true if `raw`, once whitespace is removed, is a non-empty string of decimal digits that passes the Luhn
/// check.
pub fn is_valid_order_number(raw: &str) -> bool {
    let digits = strip_whitespace(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) && luhn_checksum(&digits) % 10 == 0
}

/// Strips whitespace from `raw` and returns the canonical [`OrderNumber`] if the result is valid.
pub fn normalize_order_number(raw: &str) -> Option<OrderNumber> {
    is_valid_order_number(raw).then(|| OrderNumber::new_unchecked(strip_whitespace(raw)))
}

fn strip_whitespace(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Walks the digits from the least significant end, doubling every second one. Doubled values above 9 have 9
/// subtracted, which is the same as summing their two digits.
fn luhn_checksum(digits: &str) -> u32 {
    digits
        .bytes()
        .rev()
        .map(|b| u32::from(b - b'0'))
        .enumerate()
        .map(|(i, d)| match (i % 2 == 1, d * 2) {
            (true, doubled) if doubled > 9 => doubled - 9,
            (true, doubled) => doubled,
            (false, _) => d,
        })
        .sum()
}
