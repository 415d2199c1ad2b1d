//! Odds model for the settlement engine.
//!
//! - [`odds_math`]: pure conversions between American odds, decimal odds and
//!   implied probability
//! - [`dynamic`]: informational live quotes derived from stake totals
//!
//! Nothing here feeds payouts. Settlement is pari-mutuel.

pub mod dynamic;
pub mod error;
pub mod odds_math;

pub use dynamic::{compute_odds, DynamicOddsCalculator, OddsQuote, DEFAULT_AMERICAN};
pub use error::OddsError;
pub use odds_math::{
    american_to_decimal, combined_odds, decimal_odds_from_f64, decimal_to_american,
    implied_probability, is_valid_american_odds, probability_to_american,
};
