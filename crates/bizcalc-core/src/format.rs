//! Display helpers for monetary amounts and percentages.
//!
//! Output follows en-US grouping (`1,234,567.89`) with the currency's own
//! symbol or ISO code as prefix.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::error::BizCalcError;
use crate::types::{Currency, Money, Percent};

impl Currency {
    /// Prefix placed before the grouped amount.
    pub fn prefix(&self) -> String {
        match self {
            Currency::USD => "$".to_string(),
            Currency::EUR => "€".to_string(),
            Currency::GBP => "£".to_string(),
            Currency::SAR => "SAR ".to_string(),
            Currency::AED => "AED ".to_string(),
            Currency::Other(code) => format!("{code} "),
        }
    }
}

impl FromStr for Currency {
    type Err = BizCalcError;

    /// Case-insensitive ISO code; unknown codes become [`Currency::Other`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        Ok(match code.as_str() {
            "" => return Err(BizCalcError::invalid("currency", "empty currency code")),
            "USD" => Currency::USD,
            "EUR" => Currency::EUR,
            "GBP" => Currency::GBP,
            "SAR" => Currency::SAR,
            "AED" => Currency::AED,
            _ => Currency::Other(code),
        })
    }
}

/// Round half away from zero to `dp` places and insert thousands separators.
pub fn group_digits(value: Decimal, dp: u32) -> String {
    let rounded = value
        .abs()
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.*}", dp as usize, rounded);

    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// `$1,234.56`, `-€980.00`, `SAR 1,250,000` (whole units when `dp` is 0).
pub fn format_currency(amount: Money, currency: &Currency, dp: u32) -> String {
    let body = group_digits(amount.abs(), dp);
    if amount.is_sign_negative() && body.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}{}", currency.prefix(), body)
    } else {
        format!("{}{}", currency.prefix(), body)
    }
}

/// Whole-number percentage to text: `12.5` with `dp = 1` gives `12.5%`.
pub fn format_percent(value: Percent, dp: u32) -> String {
    format!("{}%", group_digits(value, dp))
}
