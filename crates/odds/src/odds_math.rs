//! Conversions between American odds, decimal odds and implied probability.
//!
//! American odds are whole numbers: `+150` wins 150 per 100 staked, `-150`
//! needs 150 staked to win 100. Values strictly between -100 and +100 do
//! not exist on a moneyline and are rejected.
//!
//! ```text
//! american >= 100   decimal = american / 100 + 1
//! american <= -100  decimal = 100 / |american| + 1
//! ```

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{OddsError, Result};

/// Returns true if `value` is a valid American odds quote.
#[must_use]
pub fn is_valid_american_odds(value: i64) -> bool {
    value != 0 && (value <= -100 || value >= 100)
}

/// Converts American odds to decimal odds.
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use wager_odds::odds_math::american_to_decimal;
///
/// assert_eq!(american_to_decimal(150).unwrap(), dec!(2.5));
/// assert!(american_to_decimal(50).is_err());
/// ```
///
/// # Errors
/// Returns [`OddsError::InvalidAmerican`] for values between -100 and 100.
pub fn american_to_decimal(american: i64) -> Result<Decimal> {
    if !is_valid_american_odds(american) {
        return Err(OddsError::InvalidAmerican(american));
    }

    let value = Decimal::from(american);
    if american > 0 {
        Ok(value / Decimal::ONE_HUNDRED + Decimal::ONE)
    } else {
        Ok(Decimal::ONE_HUNDRED / value.abs() + Decimal::ONE)
    }
}

/// Converts decimal odds to American odds, rounding half away from zero.
///
/// # Errors
/// Returns [`OddsError::InvalidDecimal`] for `decimal <= 1.0` and
/// [`OddsError::OutOfRange`] when the result does not fit an `i64`.
pub fn decimal_to_american(decimal: Decimal) -> Result<i64> {
    if decimal <= Decimal::ONE {
        return Err(OddsError::InvalidDecimal(decimal));
    }

    let profit = decimal - Decimal::ONE;
    let raw = if decimal >= Decimal::TWO {
        profit.checked_mul(Decimal::ONE_HUNDRED)
    } else {
        Decimal::NEGATIVE_ONE
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|n| n.checked_div(profit))
    }
    .ok_or(OddsError::OutOfRange(decimal))?;

    raw.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(OddsError::OutOfRange(raw))
}

/// Converts float decimal odds (e.g. user input) into a [`Decimal`].
///
/// # Errors
/// Rejects NaN, infinities, unrepresentable values and odds `<= 1.0`.
pub fn decimal_odds_from_f64(value: f64) -> Result<Decimal> {
    if !value.is_finite() {
        return Err(OddsError::NonFinite);
    }
    let decimal = Decimal::from_f64(value).ok_or(OddsError::NonFinite)?;
    if decimal <= Decimal::ONE {
        return Err(OddsError::InvalidDecimal(decimal));
    }
    Ok(decimal)
}

/// Implied probability of American odds, as a percentage in (0, 100).
///
/// # Errors
/// Returns [`OddsError::InvalidAmerican`] for values between -100 and 100.
pub fn implied_probability(american: i64) -> Result<Decimal> {
    if !is_valid_american_odds(american) {
        return Err(OddsError::InvalidAmerican(american));
    }

    let value = Decimal::from(american);
    let fraction = if american > 0 {
        Decimal::ONE_HUNDRED / (value + Decimal::ONE_HUNDRED)
    } else {
        value.abs() / (value.abs() + Decimal::ONE_HUNDRED)
    };
    Ok(fraction * Decimal::ONE_HUNDRED)
}

/// Converts a win probability (fraction, not percent) to American odds.
///
/// # Errors
/// Returns [`OddsError::InvalidProbability`] unless `0 < probability < 1`.
pub fn probability_to_american(probability: Decimal) -> Result<i64> {
    if probability <= Decimal::ZERO || probability >= Decimal::ONE {
        return Err(OddsError::InvalidProbability(probability));
    }
    let decimal = Decimal::ONE
        .checked_div(probability)
        .ok_or(OddsError::OutOfRange(probability))?;
    decimal_to_american(decimal)
}

/// Combines several legs into a single American price.
///
/// Informational only; settlement never uses it.
///
/// # Errors
/// Fails on an empty list, any invalid leg, or overflow.
pub fn combined_odds(legs: &[i64]) -> Result<i64> {
    if legs.is_empty() {
        return Err(OddsError::NoLegs);
    }

    let product = legs.iter().try_fold(Decimal::ONE, |acc, &leg| {
        let decimal = american_to_decimal(leg)?;
        acc.checked_mul(decimal).ok_or(OddsError::OutOfRange(acc))
    })?;

    decimal_to_american(product)
}
