//! Error types for odds conversions.

use rust_decimal::Decimal;
use thiserror::Error;

/// Invalid input to an odds conversion.
///
/// Callers treat any of these as "no quote available", never as zero odds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OddsError {
    /// American odds strictly between -100 and 100.
    #[error("invalid American odds: {0} (must be <= -100 or >= 100)")]
    InvalidAmerican(i64),

    /// Decimal odds at or below 1.0 pay nothing.
    #[error("invalid decimal odds: {0} (must be > 1.0)")]
    InvalidDecimal(Decimal),

    /// NaN or infinite float input.
    #[error("non-finite odds value")]
    NonFinite,

    /// Probability outside the open interval (0, 1).
    #[error("invalid probability: {0} (must be strictly between 0 and 1)")]
    InvalidProbability(Decimal),

    /// Converted value does not fit the American odds range.
    #[error("odds out of range: {0}")]
    OutOfRange(Decimal),

    /// Combined odds need at least one leg.
    #[error("no legs to combine")]
    NoLegs,

    /// Stake totals cannot be negative.
    #[error("negative stake total: {0}")]
    NegativeStake(Decimal),

    /// Vig cannot be negative.
    #[error("negative vig: {0}")]
    NegativeVig(Decimal),
}

/// Result type alias for odds operations.
pub type Result<T> = std::result::Result<T, OddsError>;
