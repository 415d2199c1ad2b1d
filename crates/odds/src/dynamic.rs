//! Live odds derived from the current stake distribution.
//!
//! The quote is display-only. Settlement is pari-mutuel and never reads it.
//!
//! Each side's raw probability is the *opposing* side's share of the total
//! stake. The vig scales both probabilities by `(1 + vig)`, so they sum to
//! more than 100%:
//!
//! ```text
//! stake A = 100, stake B = 300, vig = 0.05
//!   p(A) = 300/400 * 1.05 = 0.7875  -> -371
//!   p(B) = 100/400 * 1.05 = 0.2625  -> +281
//!   overround = 1.05
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{OddsError, Result};
use crate::odds_math::{implied_probability, is_valid_american_odds, probability_to_american};

/// Conventional pick'em price with standard vig.
pub const DEFAULT_AMERICAN: i64 = -110;

/// Informational quote for both sides at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OddsQuote {
    /// American odds for side A; `None` when no quote is available.
    pub side_a: Option<i64>,
    /// American odds for side B; `None` when no quote is available.
    pub side_b: Option<i64>,
    /// Stake on side A the quote was derived from.
    pub stake_a: Decimal,
    /// Stake on side B the quote was derived from.
    pub stake_b: Decimal,
    /// Sum of the vig-adjusted probabilities (as a fraction).
    pub overround: Decimal,
}

impl OddsQuote {
    /// Returns true if both sides have a price.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.side_a.is_some() && self.side_b.is_some()
    }
}

/// Derives [`OddsQuote`]s from stake totals with a fixed house margin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicOddsCalculator {
    vig: Decimal,
    default_american: i64,
}

impl Default for DynamicOddsCalculator {
    fn default() -> Self {
        Self {
            vig: Decimal::new(5, 2), // 0.05
            default_american: DEFAULT_AMERICAN,
        }
    }
}

impl DynamicOddsCalculator {
    /// Creates a calculator with a vig and the quote shown before any stake.
    ///
    /// # Errors
    /// Rejects a negative vig or an invalid default quote.
    pub fn new(vig: Decimal, default_american: i64) -> Result<Self> {
        if vig < Decimal::ZERO {
            return Err(OddsError::NegativeVig(vig));
        }
        if !is_valid_american_odds(default_american) {
            return Err(OddsError::InvalidAmerican(default_american));
        }
        Ok(Self {
            vig,
            default_american,
        })
    }

    #[must_use]
    pub fn vig(&self) -> Decimal {
        self.vig
    }

    /// Computes the live quote for the given stake totals.
    ///
    /// # Errors
    /// Rejects negative stake totals.
    pub fn quote(&self, stake_a: Decimal, stake_b: Decimal) -> Result<OddsQuote> {
        for stake in [stake_a, stake_b] {
            if stake < Decimal::ZERO {
                return Err(OddsError::NegativeStake(stake));
            }
        }

        if stake_a.is_zero() && stake_b.is_zero() {
            return self.default_quote();
        }

        let total = stake_a + stake_b;
        let margin = Decimal::ONE + self.vig;
        let prob_a = stake_b / total * margin;
        let prob_b = stake_a / total * margin;

        let side_a = probability_to_american(prob_a).ok();
        let side_b = probability_to_american(prob_b).ok();
        if side_a.is_none() || side_b.is_none() {
            debug!(%stake_a, %stake_b, %prob_a, %prob_b, "One-sided book, quote incomplete");
        }

        Ok(OddsQuote {
            side_a,
            side_b,
            stake_a,
            stake_b,
            overround: prob_a + prob_b,
        })
    }

    fn default_quote(&self) -> Result<OddsQuote> {
        let implied = implied_probability(self.default_american)? / Decimal::ONE_HUNDRED;
        Ok(OddsQuote {
            side_a: Some(self.default_american),
            side_b: Some(self.default_american),
            stake_a: Decimal::ZERO,
            stake_b: Decimal::ZERO,
            overround: implied * Decimal::TWO,
        })
    }
}

/// One-shot form of [`DynamicOddsCalculator::quote`] with the -110 default.
///
/// # Errors
/// Rejects negative stakes or a negative vig.
pub fn compute_odds(stake_a: Decimal, stake_b: Decimal, vig: Decimal) -> Result<OddsQuote> {
    DynamicOddsCalculator::new(vig, DEFAULT_AMERICAN)?.quote(stake_a, stake_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_book_returns_default() {
        let quote = compute_odds(dec!(0), dec!(0), dec!(0.05)).unwrap();
        assert_eq!(quote.side_a, Some(-110));
        assert_eq!(quote.side_b, Some(-110));
        assert!(quote.overround > Decimal::ONE);
    }

    #[test]
    fn test_configured_default() {
        let calc = DynamicOddsCalculator::new(dec!(0.05), -105).unwrap();
        let quote = calc.quote(Decimal::ZERO, Decimal::ZERO).unwrap();
        assert_eq!(quote.side_a, Some(-105));
        assert_eq!(quote.side_b, Some(-105));
    }

    #[test]
    fn test_balanced_book_with_vig() {
        // p = 0.5 * 1.05 = 0.525 -> -110.53 -> -111
        let quote = compute_odds(dec!(100), dec!(100), dec!(0.05)).unwrap();
        assert_eq!(quote.side_a, Some(-111));
        assert_eq!(quote.side_b, Some(-111));
        assert_eq!(quote.overround, dec!(1.05));
    }

    #[test]
    fn test_balanced_book_without_vig() {
        let quote = compute_odds(dec!(250), dec!(250), Decimal::ZERO).unwrap();
        assert_eq!(quote.side_a, Some(100));
        assert_eq!(quote.side_b, Some(100));
        assert_eq!(quote.overround, Decimal::ONE);
    }

    #[test]
    fn test_probability_follows_opposing_stake() {
        let quote = compute_odds(dec!(100), dec!(300), dec!(0.05)).unwrap();
        assert_eq!(quote.side_a, Some(-371));
        assert_eq!(quote.side_b, Some(281));
        assert!(quote.is_complete());
    }

    #[test]
    fn test_one_sided_book_has_no_quote() {
        let quote = compute_odds(dec!(0), dec!(50), dec!(0.05)).unwrap();
        assert_eq!(quote.side_a, None);
        assert_eq!(quote.side_b, None);
        assert!(!quote.is_complete());
    }

    #[test]
    fn test_rejects_negative_inputs() {
        assert_eq!(
            compute_odds(dec!(-1), dec!(10), dec!(0.05)),
            Err(OddsError::NegativeStake(dec!(-1)))
        );
        assert_eq!(
            compute_odds(dec!(1), dec!(10), dec!(-0.01)),
            Err(OddsError::NegativeVig(dec!(-0.01)))
        );
    }

    #[test]
    fn test_rejects_invalid_default() {
        assert_eq!(
            DynamicOddsCalculator::new(dec!(0.05), 50).unwrap_err(),
            OddsError::InvalidAmerican(50)
        );
    }
}
