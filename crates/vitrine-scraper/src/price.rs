//! Conversion of marketplace price representations to integer minor units
//! (centavos).
//!
//! Three shapes show up upstream:
//!
//! - Shopee API integers scaled by 100 000 per real (`899_900_000` is
//!   R$ 8.999,00). One centavo is 1 000 raw units.
//! - Brazilian formatted strings from HTML (`"R$ 1.234,56"`, `"29,90"`),
//!   possibly a range (`"R$ 10,00 - R$ 15,00"`).
//! - Plain decimals from JSON APIs and JSON-LD (`"8999.00"`, `299.9`).
//!
//! No path goes through floating point.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Raw Shopee units per centavo.
const SHOPEE_UNITS_PER_MINOR: i64 = 1_000;

static BRL_AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d.]*(?:,\d+)?").expect("valid regex"));

/// Shopee scaled integer to centavos, rounding half up.
///
/// Returns `None` for negative input.
#[must_use]
pub fn shopee_scaled_to_minor(raw: i64) -> Option<i64> {
    if raw < 0 {
        return None;
    }
    let whole = raw / SHOPEE_UNITS_PER_MINOR;
    let rem = raw % SHOPEE_UNITS_PER_MINOR;
    Some(whole + i64::from(rem * 2 >= SHOPEE_UNITS_PER_MINOR))
}

/// Parse a Brazilian-formatted amount (`.` thousands, `,` decimals).
///
/// A range yields its lower bound. Without a comma, a trailing `.` group of
/// one or two digits is read as decimals (`"29.90"`), otherwise dots are
/// thousands separators (`"1.299"`).
#[must_use]
pub fn parse_brl(text: &str) -> Option<i64> {
    BRL_AMOUNT_RE
        .find_iter(text)
        .filter_map(|m| brl_token_to_minor(m.as_str()))
        .min()
}

fn brl_token_to_minor(token: &str) -> Option<i64> {
    let token = token.trim_end_matches('.');
    let (int_part, frac_part) = match token.split_once(',') {
        Some((int_part, frac)) => (int_part.replace('.', ""), frac.to_owned()),
        None => match token.rsplit_once('.') {
            Some((head, tail)) if !tail.is_empty() && tail.len() <= 2 => {
                (head.replace('.', ""), tail.to_owned())
            }
            _ => (token.replace('.', ""), String::new()),
        },
    };

    if int_part.is_empty() {
        return None;
    }

    let reais: i64 = int_part.parse().ok()?;
    let centavos = match frac_part.len() {
        0 => 0,
        1 => frac_part.parse::<i64>().ok()? * 10,
        _ => frac_part.get(..2)?.parse::<i64>().ok()?,
    };

    reais.checked_mul(100)?.checked_add(centavos)
}

/// Parse a plain decimal amount in major units, rounding half away from zero
/// at the centavo.
#[must_use]
pub fn parse_decimal(text: &str) -> Option<i64> {
    let text = text.trim();
    let value = Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()?;
    decimal_to_minor(value)
}

/// Same as [`parse_decimal`] for a JSON number.
#[must_use]
pub fn json_number_to_minor(number: &serde_json::Number) -> Option<i64> {
    if let Some(whole) = number.as_i64() {
        return whole.checked_mul(100).filter(|v| *v >= 0);
    }
    parse_decimal(&number.to_string())
}

fn decimal_to_minor(value: Decimal) -> Option<i64> {
    if value.is_sign_negative() {
        return None;
    }
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.checked_mul(Decimal::ONE_HUNDRED)?.to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Shopee scaled integers

    #[test]
    fn shopee_scaled_price_converts_exactly() {
        // R$ 8.999,00
        assert_eq!(shopee_scaled_to_minor(899_900_000), Some(899_900));
        assert_eq!(shopee_scaled_to_minor(2_990_000), Some(2_990));
    }

    #[test]
    fn shopee_scaled_price_rounds_half_up() {
        assert_eq!(shopee_scaled_to_minor(899_999), Some(900));
        assert_eq!(shopee_scaled_to_minor(1_500), Some(2));
        assert_eq!(shopee_scaled_to_minor(1_499), Some(1));
        assert_eq!(shopee_scaled_to_minor(0), Some(0));
    }

    #[test]
    fn shopee_scaled_price_rejects_negative() {
        assert_eq!(shopee_scaled_to_minor(-1), None);
    }

    // Brazilian formatted strings

    #[test]
    fn brl_with_thousands_and_decimals() {
        assert_eq!(parse_brl("R$ 1.234,56"), Some(123_456));
        assert_eq!(parse_brl("R$1.234.567,89"), Some(123_456_789));
    }

    #[test]
    fn brl_bare_amounts() {
        assert_eq!(parse_brl("29,90"), Some(2_990));
        assert_eq!(parse_brl("29,9"), Some(2_990));
        assert_eq!(parse_brl("1.299"), Some(129_900));
        assert_eq!(parse_brl("R$ 35"), Some(3_500));
    }

    #[test]
    fn brl_trailing_two_digit_dot_group_is_decimal() {
        assert_eq!(parse_brl("29.90"), Some(2_990));
    }

    #[test]
    fn brl_range_takes_lower_bound() {
        assert_eq!(parse_brl("R$ 15,00 - R$ 10,50"), Some(1_050));
        assert_eq!(parse_brl("R$10,00 ~ R$20,00"), Some(1_000));
    }

    #[test]
    fn brl_without_digits_is_none() {
        assert_eq!(parse_brl("Preço indisponível"), None);
        assert_eq!(parse_brl(""), None);
    }

    // Plain decimals

    #[test]
    fn decimal_string_converts_exactly() {
        assert_eq!(parse_decimal("8999.00"), Some(899_900));
        assert_eq!(parse_decimal(" 299.9 "), Some(29_990));
        assert_eq!(parse_decimal("35"), Some(3_500));
    }

    #[test]
    fn decimal_rounds_half_away_from_zero() {
        assert_eq!(parse_decimal("0.005"), Some(1));
        assert_eq!(parse_decimal("0.0049"), Some(0));
        assert_eq!(parse_decimal("19.995"), Some(2_000));
    }

    #[test]
    fn decimal_rejects_garbage_and_negatives() {
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal("-1.00"), None);
    }

    #[test]
    fn json_numbers_convert_without_float_drift() {
        let n: serde_json::Number = serde_json::from_str("299.9").unwrap();
        assert_eq!(json_number_to_minor(&n), Some(29_990));
        let n: serde_json::Number = serde_json::from_str("0.1").unwrap();
        assert_eq!(json_number_to_minor(&n), Some(10));
        let n: serde_json::Number = serde_json::from_str("499").unwrap();
        assert_eq!(json_number_to_minor(&n), Some(49_900));
    }
}
