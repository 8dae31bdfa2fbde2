//! Conversion between display amounts and integer base units.

use thiserror::Error;

/// Base units per display unit (8 decimal places).
pub const COIN: u64 = 100_000_000;

/// Number of decimal places in a display amount.
pub const DECIMALS: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitError {
    #[error("invalid amount: {0}")]
    Invalid(String),
    #[error("amount overflows: {0}")]
    Overflow(String),
}

/// Parse a display amount such as `"1.5"` into base units.
///
/// Digits past the eighth decimal place are truncated.
pub fn to_base_units(amount: &str) -> Result<u64, UnitError> {
    let amount = amount.trim();
    let invalid = || UnitError::Invalid(amount.to_string());

    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(frac) {
        return Err(invalid());
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| UnitError::Overflow(amount.to_string()))?
    };

    let mut frac_digits: String = frac.chars().take(DECIMALS).collect();
    while frac_digits.len() < DECIMALS {
        frac_digits.push('0');
    }
    let frac: u64 = frac_digits.parse().map_err(|_| invalid())?;

    whole
        .checked_mul(COIN)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(|| UnitError::Overflow(amount.to_string()))
}

/// Render base units as a display amount with all eight decimals.
pub fn to_display_units(base: u64) -> String {
    format!("{}.{:08}", base / COIN, base % COIN)
}
