//! Fixed-point unit formatting and parsing for token amounts and rates.

use primitive_types::U256;
use thiserror::Error;

use crate::constants::ETHERS_BASE_DIGITS;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("'{0}' is not a valid unsigned decimal number")]
    InvalidNumber(String),
    #[error("'{value}' has more than {digits} fractional digits")]
    TooManyDecimals { value: String, digits: u32 },
    #[error("'{0}' does not fit in 256 bits")]
    Overflow(String),
}

#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// Fixed-point digits of the raw value.
    pub digits: u32,
    /// Group the whole part with commas.
    pub commas: bool,
    /// Returned verbatim when the value is zero.
    pub replace_zero_by: String,
    pub truncate_to_decimal_place: Option<usize>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            digits: ETHERS_BASE_DIGITS,
            commas: false,
            replace_zero_by: String::new(),
            truncate_to_decimal_place: None,
        }
    }
}

/// Render a raw fixed-point amount as a decimal string.
pub fn format_units(value: U256, options: &FormatOptions) -> String {
    if value.is_zero() {
        return options.replace_zero_by.clone();
    }

    let raw = value.to_string();
    let digits = options.digits as usize;
    let (whole, fraction) = if raw.len() > digits {
        let (whole, fraction) = raw.split_at(raw.len() - digits);
        (whole.to_string(), fraction.to_string())
    } else {
        ("0".to_string(), format!("{raw:0>digits$}"))
    };

    let mut fraction = fraction.trim_end_matches('0');
    if let Some(places) = options.truncate_to_decimal_place {
        fraction = fraction[..places.min(fraction.len())].trim_end_matches('0');
    }

    let whole = if options.commas {
        commify(&whole)
    } else {
        whole
    };

    if fraction.is_empty() {
        whole
    } else {
        format!("{whole}.{fraction}")
    }
}

/// Parse a human decimal into raw fixed-point units.
///
/// Commas and surrounding whitespace are ignored; empty input is zero.
pub fn parse_units(value: &str, digits: u32) -> Result<U256, UnitsError> {
    let cleaned: String = value.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return Ok(U256::zero());
    }

    let (whole, fraction) = match cleaned.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (cleaned.as_str(), ""),
    };
    let is_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(UnitsError::InvalidNumber(value.to_string()));
    }

    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > digits as usize {
        return Err(UnitsError::TooManyDecimals {
            value: value.to_string(),
            digits,
        });
    }

    let scaled = format!("{whole}{fraction:0<width$}", width = digits as usize);
    let scaled = scaled.trim_start_matches('0');
    if scaled.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_dec_str(scaled).map_err(|_| UnitsError::Overflow(value.to_string()))
}

fn commify(whole: &str) -> String {
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, c) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
