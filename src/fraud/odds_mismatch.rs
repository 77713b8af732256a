use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::config::FraudConfig;
use crate::domain::OddsMismatchFinding;
use crate::odds::{american_to_decimal, is_valid_american_odds};

/// Relative gap between the posted price and the market price, in decimal odds
pub fn detect_odds_mismatch(
    posted_decimal: Decimal,
    market_american: Option<i64>,
    config: &FraudConfig,
) -> OddsMismatchFinding {
    let market_decimal = market_american
        .filter(|odds| is_valid_american_odds(*odds))
        .and_then(|odds| american_to_decimal(odds).ok());

    let Some(market) = market_decimal else {
        return OddsMismatchFinding {
            posted_decimal,
            ..Default::default()
        };
    };

    let deviation = ((posted_decimal - market).abs() / market).to_f64();
    let is_mismatch = deviation.map_or(false, |d| d > config.odds_mismatch_threshold);

    OddsMismatchFinding {
        is_mismatch,
        posted_decimal,
        market_decimal: Some(market),
        deviation,
    }
}
