//! Conversion between human-readable decimal strings and fixed-point token
//! amounts.

use alloy::primitives::U256;
use alloy::primitives::utils::{format_units, parse_units};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitsError {
    #[error("'{value}' is not a decimal amount with at most {decimals} fractional digits")]
    Parse { value: String, decimals: u8 },
    #[error("'{value}' is negative")]
    Negative { value: String },
}

/// Decimal string <-> fixed-point integer conversion for a token precision.
pub trait UnitConverter: Send + Sync {
    fn to_fixed_point(&self, value: &str, decimals: u8) -> Result<U256, UnitsError>;

    fn to_decimal_string(&self, amount: U256, decimals: u8) -> String;
}

/// [`UnitConverter`] backed by alloy's `parse_units`/`format_units`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalUnits;

impl UnitConverter for DecimalUnits {
    fn to_fixed_point(&self, value: &str, decimals: u8) -> Result<U256, UnitsError> {
        let parsed = parse_units(value, decimals).map_err(|_| UnitsError::Parse {
            value: value.to_string(),
            decimals,
        })?;

        if parsed.is_negative() {
            return Err(UnitsError::Negative {
                value: value.to_string(),
            });
        }

        Ok(parsed.get_absolute())
    }

    fn to_decimal_string(&self, amount: U256, decimals: u8) -> String {
        // Formatting a U256 only fails for decimals > 77, which cannot hold
        // a meaningful token amount anyway.
        format_units(amount, decimals)
            .map(|formatted| trim_fraction(&formatted))
            .unwrap_or_else(|_| amount.to_string())
    }
}

/// `format_units` always renders a fractional part ("5.000000000000000000");
/// drop trailing zeros and a bare trailing point.
fn trim_fraction(formatted: &str) -> String {
    if !formatted.contains('.') {
        return formatted.to_string();
    }

    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
