//! Normalization of caller-supplied fields.

use super::error::EngineError;
use compact_str::CompactString;
use rust_decimal::Decimal;

const MAX_TEXT_LEN: usize = 4096;

/// Money columns are `NUMERIC(18, 2)`: cents, below 10^16.
const MONEY_SCALE: u32 = 2;
const MONEY_LIMIT: Decimal = Decimal::from_parts(1_874_919_424, 2_328_306, 0, false, 0);

/// Rate columns are `NUMERIC(9, 6)`: six decimals, below 1000.
const RATE_SCALE: u32 = 6;
const RATE_LIMIT: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Two ASCII letters, upper-cased. Blank means "no country".
pub fn country_code(value: Option<&str>) -> Result<Option<CompactString>, EngineError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if value.len() != 2 || !value.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(EngineError::invalid_input(format!(
            "country code must be two letters, got {value:?}"
        )));
    }
    Ok(Some(CompactString::from(value.to_ascii_uppercase())))
}

/// Three ASCII letters, upper-cased.
pub fn currency_code(value: &str) -> Result<CompactString, EngineError> {
    let value = value.trim();
    if value.len() != 3 || !value.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(EngineError::invalid_input(format!(
            "currency must be a three-letter code, got {value:?}"
        )));
    }
    Ok(CompactString::from(value.to_ascii_uppercase()))
}

pub fn required_text(field: &str, value: &str) -> Result<String, EngineError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(EngineError::invalid_input(format!("{field} must not be empty")));
    }
    if value.len() > MAX_TEXT_LEN {
        return Err(EngineError::invalid_input(format!("{field} is too long")));
    }
    Ok(value.to_string())
}

/// A redemption code. Blank codes are rejected; anything else is stored
/// exactly as given so the buyer reads back the same characters.
pub fn code(value: &str) -> Result<String, EngineError> {
    if value.trim().is_empty() {
        return Err(EngineError::invalid_input("code must not be empty"));
    }
    if value.len() > MAX_TEXT_LEN {
        return Err(EngineError::invalid_input("code is too long"));
    }
    Ok(value.to_string())
}

/// Blank optional text is treated as absent.
pub fn optional_text(field: &str, value: Option<&str>) -> Result<Option<String>, EngineError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => required_text(field, v).map(Some),
        None => Ok(None),
    }
}

pub fn positive(field: &str, value: Decimal) -> Result<Decimal, EngineError> {
    if value <= Decimal::ZERO {
        return Err(EngineError::invalid_input(format!("{field} must be positive")));
    }
    Ok(value)
}

fn bounded(
    field: &str,
    value: Decimal,
    scale: u32,
    limit: Decimal,
) -> Result<Decimal, EngineError> {
    positive(field, value)?;
    if value.normalize().scale() > scale {
        return Err(EngineError::invalid_input(format!(
            "{field} has more than {scale} decimal places"
        )));
    }
    if value >= limit {
        return Err(EngineError::invalid_input(format!("{field} is out of range")));
    }
    Ok(value)
}

/// A positive amount of money in whole cents.
pub fn money(field: &str, value: Decimal) -> Result<Decimal, EngineError> {
    bounded(field, value, MONEY_SCALE, MONEY_LIMIT)
}

/// A positive rate with at most six decimals.
pub fn rate(field: &str, value: Decimal) -> Result<Decimal, EngineError> {
    bounded(field, value, RATE_SCALE, RATE_LIMIT)
}

/// Rejects a computed amount that would not fit a money column.
pub fn within_money_range(field: &str, value: Decimal) -> Result<Decimal, EngineError> {
    if value >= MONEY_LIMIT {
        return Err(EngineError::invalid_input(format!("{field} is out of range")));
    }
    Ok(value)
}
