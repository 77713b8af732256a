//! American / decimal odds conversions and parlay combination.
//!
//! All arithmetic is exact `Decimal` math; only the final American value is
//! rounded (half away from zero).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{PickguardError, Result};

/// Smallest magnitude of a legal American price
pub const MIN_AMERICAN_ODDS: i64 = 100;
/// Largest magnitude of a legal American price
pub const MAX_AMERICAN_ODDS: i64 = 10_000;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Combined parlay price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParlayOdds {
    pub decimal: Decimal,
    pub american: i64,
}

/// Canonical bound used everywhere odds enter the system: `100 <= |odds| <= 10000`.
///
/// Prices inside (-100, 100) have no meaning in American notation, and zero is
/// rejected with them.
pub fn is_valid_american_odds(value: i64) -> bool {
    let magnitude = value.unsigned_abs();
    magnitude >= MIN_AMERICAN_ODDS as u64 && magnitude <= MAX_AMERICAN_ODDS as u64
}

/// Reject odds outside the canonical bound with an actionable message
pub fn validate_american_odds(value: i64) -> Result<()> {
    if is_valid_american_odds(value) {
        Ok(())
    } else {
        Err(PickguardError::InvalidOdds(format!(
            "american odds {value} must satisfy \
             {MIN_AMERICAN_ODDS} <= |odds| <= {MAX_AMERICAN_ODDS}"
        )))
    }
}

/// Convert American odds to decimal odds
///
/// `+150 -> 2.5`, `-200 -> 1.5`. Zero is not a price.
pub fn american_to_decimal(american: i64) -> Result<Decimal> {
    if american == 0 {
        return Err(PickguardError::InvalidOdds(
            "american odds cannot be zero".to_string(),
        ));
    }

    let value = Decimal::from(american);
    if american > 0 {
        Ok(value / HUNDRED + Decimal::ONE)
    } else {
        Ok(HUNDRED / value.abs() + Decimal::ONE)
    }
}

/// Convert decimal odds back to American odds
///
/// Even money (2.0) maps to +100.
pub fn decimal_to_american(decimal: Decimal) -> Result<i64> {
    if decimal <= Decimal::ONE {
        return Err(PickguardError::InvalidOdds(format!(
            "decimal odds {decimal} must be greater than 1"
        )));
    }

    let raw = if decimal >= Decimal::TWO {
        (decimal - Decimal::ONE)
            .checked_mul(HUNDRED)
            .ok_or_else(|| PickguardError::InvalidOdds(format!("decimal odds {decimal} overflow")))?
    } else {
        -(HUNDRED / (decimal - Decimal::ONE))
    };

    raw.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| {
            PickguardError::InvalidOdds(format!("decimal odds {decimal} out of range"))
        })
}

/// Combine straight-bet prices into a parlay price
///
/// Decimal odds multiply across legs; the American price is derived from the product.
pub fn combine_parlay_odds(legs: &[i64]) -> Result<ParlayOdds> {
    if legs.len() < 2 {
        return Err(PickguardError::InvalidParlay(format!(
            "a parlay needs at least 2 legs, got {}",
            legs.len()
        )));
    }

    let mut decimal = Decimal::ONE;
    for (idx, &leg) in legs.iter().enumerate() {
        if !is_valid_american_odds(leg) {
            return Err(PickguardError::InvalidParlay(format!(
                "leg {} has invalid american odds {}",
                idx + 1,
                leg
            )));
        }
        let leg_decimal = american_to_decimal(leg)
            .map_err(|e| PickguardError::InvalidParlay(format!("leg {}: {}", idx + 1, e)))?;
        decimal = decimal.checked_mul(leg_decimal).ok_or_else(|| {
            PickguardError::InvalidParlay("combined odds overflow".to_string())
        })?;
    }

    let american = decimal_to_american(decimal)
        .map_err(|e| PickguardError::InvalidParlay(e.to_string()))?;

    Ok(ParlayOdds { decimal, american })
}

/// Implied win probability of a decimal price
pub fn implied_probability(decimal: Decimal) -> Decimal {
    if decimal > Decimal::ZERO {
        Decimal::ONE / decimal
    } else {
        Decimal::ZERO
    }
}

/// Bound applied to a single pick's closing-line value
pub const MAX_CLV: f64 = 0.5;

/// Closing-line value of a posted price: `posted / closing - 1`, clamped to
/// `[-MAX_CLV, MAX_CLV]`.
///
/// Positive when the creator beat the closing price.
pub fn closing_line_value(posted_decimal: Decimal, closing_american: i64) -> Result<f64> {
    validate_american_odds(closing_american)?;
    let closing = american_to_decimal(closing_american)?;
    let ratio = (posted_decimal / closing - Decimal::ONE)
        .to_f64()
        .ok_or_else(|| {
            PickguardError::InvalidOdds(format!("clv for {posted_decimal} out of range"))
        })?;
    Ok(ratio.clamp(-MAX_CLV, MAX_CLV))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_american_to_decimal() {
        assert_eq!(american_to_decimal(150).unwrap(), dec!(2.5));
        assert_eq!(american_to_decimal(-200).unwrap(), dec!(1.5));
        assert_eq!(american_to_decimal(100).unwrap(), dec!(2));
        assert_eq!(american_to_decimal(-100).unwrap(), dec!(2));
        assert!(matches!(
            american_to_decimal(0),
            Err(PickguardError::InvalidOdds(_))
        ));
    }

    #[test]
    fn test_decimal_to_american() {
        assert_eq!(decimal_to_american(dec!(2.5)).unwrap(), 150);
        assert_eq!(decimal_to_american(dec!(1.5)).unwrap(), -200);
        assert_eq!(decimal_to_american(dec!(2)).unwrap(), 100);
        assert!(decimal_to_american(dec!(1)).is_err());
        assert!(decimal_to_american(dec!(0.5)).is_err());
    }

    #[test]
    fn test_american_round_trip_over_full_range() {
        let negative = -MAX_AMERICAN_ODDS..=-MIN_AMERICAN_ODDS;
        for american in negative.chain(MIN_AMERICAN_ODDS..=MAX_AMERICAN_ODDS) {
            let decimal = american_to_decimal(american).unwrap();
            let back = decimal_to_american(decimal).unwrap();
            // -100 and +100 are the same price
            let expected = if american == -100 { 100 } else { american };
            assert_eq!(back, expected, "round trip failed for {american}");
        }
    }

    #[test]
    fn test_decimal_round_trip_within_rounding() {
        let mut decimal = dec!(1.01);
        while decimal <= dec!(101) {
            let american = decimal_to_american(decimal).unwrap();
            assert!(is_valid_american_odds(american), "{decimal} -> {american}");
            let back = american_to_decimal(american).unwrap();
            assert!(
                (back - decimal).abs() <= dec!(0.005),
                "{decimal} -> {american} -> {back}"
            );
            decimal += dec!(0.37);
        }
    }

    #[test]
    fn test_validity_bounds() {
        assert!(is_valid_american_odds(-110));
        assert!(is_valid_american_odds(100));
        assert!(is_valid_american_odds(-100));
        assert!(is_valid_american_odds(10_000));
        assert!(is_valid_american_odds(-10_000));
        assert!(!is_valid_american_odds(0));
        assert!(!is_valid_american_odds(99));
        assert!(!is_valid_american_odds(-50));
        assert!(!is_valid_american_odds(10_001));
        assert!(!is_valid_american_odds(-10_001));
    }

    #[test]
    fn test_two_leg_standard_parlay() {
        let odds = combine_parlay_odds(&[-110, -110]).unwrap();
        // 1.909090... squared = 3.644628...
        assert_eq!(odds.decimal.round_dp(4), dec!(3.6446));
        assert_eq!(odds.american, 264);
    }

    #[test]
    fn test_parlay_mixed_prices() {
        // 2.5 * 1.5 = 3.75 -> +275
        let odds = combine_parlay_odds(&[150, -200]).unwrap();
        assert_eq!(odds.decimal, dec!(3.75));
        assert_eq!(odds.american, 275);
    }

    #[test]
    fn test_parlay_rejects_short_or_invalid_legs() {
        assert!(matches!(
            combine_parlay_odds(&[-110]),
            Err(PickguardError::InvalidParlay(_))
        ));
        assert!(matches!(
            combine_parlay_odds(&[]),
            Err(PickguardError::InvalidParlay(_))
        ));
        assert!(matches!(
            combine_parlay_odds(&[-110, 0]),
            Err(PickguardError::InvalidParlay(_))
        ));
        assert!(matches!(
            combine_parlay_odds(&[-110, 20_000]),
            Err(PickguardError::InvalidParlay(_))
        ));
    }

    #[test]
    fn test_implied_probability() {
        assert_eq!(implied_probability(dec!(2)), dec!(0.5));
        assert_eq!(implied_probability(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_closing_line_value() {
        // posted +150 (2.5) against a +100 close (2.0)
        let clv = closing_line_value(dec!(2.5), 100).unwrap();
        assert!((clv - 0.25).abs() < 1e-12);

        // posted 1.5 against a +150 close: -0.4
        let clv = closing_line_value(dec!(1.5), 150).unwrap();
        assert!((clv + 0.4).abs() < 1e-12);

        // clamped
        assert_eq!(closing_line_value(dec!(50), 100).unwrap(), MAX_CLV);
        assert!(closing_line_value(dec!(2), 0).is_err());
    }
}
