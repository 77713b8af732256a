/// Input validation for creator-submitted pick data
///
/// Every check returns a `Validation` error naming the offending field, so the
/// HTTP layer can hand the message straight back to the creator.
use crate::domain::{BetType, GameRef, ParlayLegInput};
use crate::error::{PickguardError, Result};
use crate::odds::validate_american_odds;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Longest accepted free-text field (selection, game description)
pub const MAX_TEXT_LEN: usize = 500;

/// Largest stake a single pick may risk, in units
pub const MAX_UNITS: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Validate a required text field and return it trimmed
///
/// # Arguments
/// * `value` - Submitted value
/// * `field_name` - Name of the field for error messages
pub fn require_text(value: Option<&str>, field_name: &str) -> Result<String> {
    let trimmed = value.map(str::trim).unwrap_or_default();

    if trimmed.is_empty() {
        return Err(PickguardError::Validation(format!(
            "{} is required",
            field_name
        )));
    }

    if trimmed.chars().count() > MAX_TEXT_LEN {
        return Err(PickguardError::Validation(format!(
            "{} exceeds {} characters",
            field_name, MAX_TEXT_LEN
        )));
    }

    Ok(trimmed.to_string())
}

/// Trim an optional text field, mapping blanks to `None`
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validate units risked (must be positive and below `MAX_UNITS`)
pub fn validate_units(units: Decimal) -> Result<()> {
    if units <= Decimal::ZERO {
        return Err(PickguardError::Validation(format!(
            "units_risked must be greater than 0: {}",
            units
        )));
    }

    if units > MAX_UNITS {
        return Err(PickguardError::Validation(format!(
            "units_risked {} exceeds maximum {}",
            units, MAX_UNITS
        )));
    }

    Ok(())
}

/// Validate a money amount (stake amount or unit value)
pub fn validate_amount(amount: Decimal, field_name: &str) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(PickguardError::Validation(format!(
            "{} must be greater than 0: {}",
            field_name, amount
        )));
    }
    Ok(())
}

/// Validate that a game start lies strictly in the future
pub fn validate_future_start(
    start: DateTime<Utc>,
    now: DateTime<Utc>,
    field_name: &str,
) -> Result<()> {
    if start <= now {
        return Err(PickguardError::Validation(format!(
            "{} must be in the future (got {}, now {})",
            field_name,
            start.to_rfc3339(),
            now.to_rfc3339()
        )));
    }
    Ok(())
}

/// Validate that a game is identified by id or description
pub fn validate_game(game: &GameRef, field_name: &str) -> Result<GameRef> {
    if game.is_empty() {
        return Err(PickguardError::Validation(format!(
            "{} needs an id or a description",
            field_name
        )));
    }

    let description = optional_text(game.description.as_deref());
    if let Some(desc) = &description {
        if desc.chars().count() > MAX_TEXT_LEN {
            return Err(PickguardError::Validation(format!(
                "{} description exceeds {} characters",
                field_name, MAX_TEXT_LEN
            )));
        }
    }

    Ok(GameRef {
        id: optional_text(game.id.as_deref()),
        description,
    })
}

/// Validate a single parlay leg
///
/// # Arguments
/// * `leg` - Submitted leg
/// * `position` - 1-based leg number for error messages
pub fn validate_leg(leg: &ParlayLegInput, position: usize) -> Result<()> {
    let prefix = format!("legs[{}]", position);

    require_text(Some(&leg.sport), &format!("{}.sport", prefix))?;
    require_text(Some(&leg.selection), &format!("{}.selection", prefix))?;
    validate_game(&leg.game, &format!("{}.game", prefix))?;

    if leg.bet_type == BetType::Parlay {
        return Err(PickguardError::InvalidParlay(format!(
            "{} cannot itself be a parlay",
            prefix
        )));
    }

    validate_american_odds(leg.odds_american)
        .map_err(|e| PickguardError::InvalidParlay(format!("{}: {}", prefix, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn leg(odds: i64) -> ParlayLegInput {
        ParlayLegInput {
            sport: "NBA".into(),
            league: None,
            game: GameRef {
                id: Some("g1".into()),
                description: None,
            },
            bet_type: BetType::Moneyline,
            selection: "Lakers".into(),
            odds_american: odds,
            game_start_time: Utc::now() + Duration::hours(1),
        }
    }

    #[test]
    fn test_require_text() {
        assert_eq!(require_text(Some("  NBA "), "sport").unwrap(), "NBA");
        assert!(require_text(Some("   "), "sport").is_err());
        assert!(require_text(None, "sport").is_err());
        assert!(require_text(Some(&"x".repeat(MAX_TEXT_LEN + 1)), "selection").is_err());
    }

    #[test]
    fn test_validate_units() {
        assert!(validate_units(dec!(0.5)).is_ok());
        assert!(validate_units(dec!(1000)).is_ok());
        assert!(validate_units(Decimal::ZERO).is_err());
        assert!(validate_units(dec!(-1)).is_err());
        assert!(validate_units(dec!(1000.01)).is_err());
    }

    #[test]
    fn test_validate_future_start() {
        let now = Utc::now();
        assert!(validate_future_start(now + Duration::seconds(1), now, "game_start_time").is_ok());
        assert!(validate_future_start(now, now, "game_start_time").is_err());
    }

    #[test]
    fn test_validate_game_trims() {
        let game = GameRef {
            id: Some("  ".into()),
            description: Some(" Lakers @ Celtics ".into()),
        };
        let cleaned = validate_game(&game, "game").unwrap();
        assert_eq!(cleaned.id, None);
        assert_eq!(cleaned.description.as_deref(), Some("Lakers @ Celtics"));
    }

    #[test]
    fn test_validate_leg() {
        assert!(validate_leg(&leg(-110), 1).is_ok());
        assert!(matches!(
            validate_leg(&leg(50), 2),
            Err(PickguardError::InvalidParlay(_))
        ));

        let mut nested = leg(120);
        nested.bet_type = BetType::Parlay;
        assert!(validate_leg(&nested, 1).is_err());
    }
}
