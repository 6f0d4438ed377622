//! Typesetting length resolution
//!
//! Lengths arrive as strings like `430.0pt`. Only the leading number is
//! read; the unit suffix is ignored since the directive writer always emits
//! points.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/// Points to millimeters
pub const PT_TO_MM: f64 = 0.3527;

/// Engine pixels per millimeter
const PX_PER_MM: f64 = 10.0;

lazy_static! {
    static ref LEADING_NUMBER: Regex = Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)").unwrap();
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DimensionError {
    #[error("No numeric prefix in length '{0}'")]
    NotANumber(String),
}

/// Resolve a length string into engine pixels.
///
/// Computes `trunc(value * 0.3527 * 10)`, truncating toward zero.
pub fn resolve(length: &str) -> Result<i64, DimensionError> {
    let trimmed = length.trim();
    let number = LEADING_NUMBER
        .find(trimmed)
        .ok_or_else(|| DimensionError::NotANumber(length.to_string()))?;

    let value: f64 = number
        .as_str()
        .parse()
        .map_err(|_| DimensionError::NotANumber(length.to_string()))?;

    Ok((value * PT_TO_MM * PX_PER_MM).trunc() as i64)
}
