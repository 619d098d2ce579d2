//! Withdrawal amount validation.
//!
//! [`validate`] is a pure function of the raw input and the current
//! [`BalanceSnapshot`]. Rules run in order and stop at the first failure:
//!
//! 1. the input is a plain non-negative decimal strictly greater than zero
//!    ([`ValidationError::NotPositive`]);
//! 2. it has no more fractional digits than the token's decimals, when known
//!    ([`ValidationError::TooManyDecimals`]);
//! 3. its fixed-point value does not exceed the staked amount, when both
//!    decimals and staked amount are known
//!    ([`ValidationError::ExceedsBalance`]). An amount too large for the
//!    fixed-point type is above any known stake and fails the same way.
//!
//! Missing background data never fails validation. Without decimals there
//! is no fixed-point value yet, so the result is [`ValidationResult::Inert`];
//! without a staked amount the balance check is skipped.

use alloy::primitives::U256;

use crate::snapshot::BalanceSnapshot;
use crate::units::{DecimalUnits, UnitConverter};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Amount must be a positive number")]
    NotPositive,
    #[error("Amount cannot have more than {decimals} decimal places")]
    TooManyDecimals { decimals: u8 },
    #[error("Amount exceeds available balance")]
    ExceedsBalance,
    #[error("Amount is too large to represent")]
    Unrepresentable,
}

/// Outcome of validating the live input against the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValidationResult {
    /// Passed every rule that could be evaluated; carries the fixed-point
    /// amount to submit.
    Valid(U256),
    Invalid(ValidationError),
    /// Passed the format rule but decimals are not known yet, so neither a
    /// parsed amount nor a failure can be reported.
    #[default]
    Inert,
}

impl ValidationResult {
    pub fn amount(&self) -> Option<U256> {
        match self {
            Self::Valid(amount) => Some(*amount),
            Self::Invalid(_) | Self::Inert => None,
        }
    }

    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            Self::Invalid(error) => Some(error),
            Self::Valid(_) | Self::Inert => None,
        }
    }

    /// Inline message for the amount field, if any.
    pub fn message(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }
}

/// Validates `raw_amount` using [`DecimalUnits`] for fixed-point conversion.
pub fn validate(raw_amount: &str, snapshot: &BalanceSnapshot) -> ValidationResult {
    validate_with(&DecimalUnits, raw_amount, snapshot)
}

pub fn validate_with<Units: UnitConverter + ?Sized>(
    units: &Units,
    raw_amount: &str,
    snapshot: &BalanceSnapshot,
) -> ValidationResult {
    let Some(amount) = DecimalAmount::parse(raw_amount) else {
        return ValidationResult::Invalid(ValidationError::NotPositive);
    };

    if !amount.is_positive() {
        return ValidationResult::Invalid(ValidationError::NotPositive);
    }

    let Some(decimals) = snapshot.decimals else {
        return ValidationResult::Inert;
    };

    if amount.fraction_digits() > usize::from(decimals) {
        return ValidationResult::Invalid(ValidationError::TooManyDecimals { decimals });
    }

    let Ok(parsed) = units.to_fixed_point(&amount.normalized(), decimals) else {
        let error = match snapshot.staked_amount {
            Some(_) => ValidationError::ExceedsBalance,
            None => ValidationError::Unrepresentable,
        };
        return ValidationResult::Invalid(error);
    };

    match snapshot.staked_amount {
        Some(staked) if parsed > staked => {
            ValidationResult::Invalid(ValidationError::ExceedsBalance)
        }
        Some(_) | None => ValidationResult::Valid(parsed),
    }
}

/// A syntactically valid unsigned decimal: digits with at most one point.
/// Either side of the point may be empty ("5.", ".5") but not both.
struct DecimalAmount<'a> {
    integer: &'a str,
    fraction: &'a str,
}

impl<'a> DecimalAmount<'a> {
    fn parse(raw: &'a str) -> Option<Self> {
        let text = raw.trim();
        let (integer, fraction) = text.split_once('.').unwrap_or((text, ""));

        let all_digits = |part: &str| part.bytes().all(|byte| byte.is_ascii_digit());
        if !all_digits(integer) || !all_digits(fraction) {
            return None;
        }

        if integer.is_empty() && fraction.is_empty() {
            return None;
        }

        Some(Self { integer, fraction })
    }

    fn is_positive(&self) -> bool {
        self.integer
            .bytes()
            .chain(self.fraction.bytes())
            .any(|byte| byte != b'0')
    }

    fn fraction_digits(&self) -> usize {
        self.fraction.len()
    }

    /// Conventional spelling for the unit converter: ".5" becomes "0.5" and
    /// "2." becomes "2".
    fn normalized(&self) -> String {
        let integer = if self.integer.is_empty() {
            "0"
        } else {
            self.integer
        };

        if self.fraction.is_empty() {
            integer.to_string()
        } else {
            format!("{integer}.{}", self.fraction)
        }
    }
}
