// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rupiah amount parsing from free text.
//!
//! Accepts `N` optionally followed by a multiplier suffix
//! (`k | rb | ribu` = thousands, `jt | juta | m` = millions). With a
//! suffix, `.`/`,` in the number is a decimal separator (`1.5jt` =
//! 1,500,000); without one it is a thousands grouping (`10.000` =
//! 10,000). Falls back to the first bare numeric run when no suffixed
//! form matches.

use std::sync::LazyLock;

use regex::Regex;

use warung_core::WarungError;

// Suffix must be followed by a non-letter so 'k' in "kirim" or 'm' in
// "mobile" does not match.
static AMOUNT_WITH_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:[.,]\d+)?)\s*(k|rb|ribu|jt|juta|m)?(?:\s|$|[^a-z])").expect("valid regex")
});

static BARE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]?\d+)?").expect("valid regex"));

/// Parse an amount in minor units from free text.
pub fn parse_amount(text: &str) -> Result<i64, WarungError> {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return Err(WarungError::Validation("empty amount".into()));
    }

    let Some(captures) = AMOUNT_WITH_SUFFIX.captures(&text) else {
        return parse_bare(&text);
    };

    let number = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
    let multiplier = match captures.get(2).map(|m| m.as_str()) {
        Some("k") | Some("rb") | Some("ribu") => 1_000,
        Some("jt") | Some("juta") | Some("m") => 1_000_000,
        _ => 1,
    };

    if multiplier > 1 {
        let decimal: f64 = number
            .replace(',', ".")
            .parse()
            .map_err(|_| WarungError::Validation(format!("invalid numeric value: {number}")))?;
        return Ok((decimal * multiplier as f64).round() as i64);
    }

    let digits = number.replace(['.', ','], "");
    digits
        .parse()
        .map_err(|_| WarungError::Validation(format!("invalid numeric value: {digits}")))
}

fn parse_bare(text: &str) -> Result<i64, WarungError> {
    let Some(found) = BARE_NUMBER.find(text) else {
        return Err(WarungError::Validation("no numeric value".into()));
    };
    let digits = found.as_str().replace(['.', ','], "");
    digits
        .parse()
        .map_err(|_| WarungError::Validation(format!("invalid numeric value: {digits}")))
}

/// Parse a price-item nominal string ("20.000", "1GB/7d") into a number,
/// keeping digits only. Returns 0 when no digits remain.
pub fn parse_nominal_amount(value: &str) -> i64 {
    let digits: String = value
        .trim()
        .replace(['.', ','], "")
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousand_suffixes() {
        assert_eq!(parse_amount("5k").unwrap(), 5_000);
        assert_eq!(parse_amount("20rb").unwrap(), 20_000);
        assert_eq!(parse_amount("20 ribu").unwrap(), 20_000);
    }

    #[test]
    fn million_suffixes() {
        assert_eq!(parse_amount("1.5jt").unwrap(), 1_500_000);
        assert_eq!(parse_amount("2 juta").unwrap(), 2_000_000);
        assert_eq!(parse_amount("3m").unwrap(), 3_000_000);
    }

    #[test]
    fn comma_decimal_with_suffix() {
        assert_eq!(parse_amount("2,5rb").unwrap(), 2_500);
    }

    #[test]
    fn grouping_without_suffix() {
        assert_eq!(parse_amount("pulsa 10.000 dong").unwrap(), 10_000);
    }

    #[test]
    fn embedded_number_without_suffix() {
        assert_eq!(parse_amount("kirim 7500").unwrap(), 7_500);
    }

    #[test]
    fn suffix_letters_inside_words_do_not_match() {
        // "kirim" must not read as 'k' multiplier on a preceding number.
        assert_eq!(parse_amount("7500 kirim").unwrap(), 7_500);
    }

    #[test]
    fn no_number_is_an_error() {
        assert!(parse_amount("kirim").is_err());
        assert!(parse_amount("").is_err());
    }

    #[test]
    fn nominal_parsing_strips_noise() {
        assert_eq!(parse_nominal_amount("20.000"), 20_000);
        assert_eq!(parse_nominal_amount("1GB/7d"), 17);
        assert_eq!(parse_nominal_amount(""), 0);
        assert_eq!(parse_nominal_amount("abc"), 0);
    }
}
