use chrono::{DateTime, Utc};

use crate::config::FraudConfig;
use crate::domain::{Pick, Severity, TimingFinding};

/// Posted inside the window right before game start
pub fn is_late_post(
    created_at: DateTime<Utc>,
    game_start_time: DateTime<Utc>,
    config: &FraudConfig,
) -> bool {
    let lead = (game_start_time - created_at).num_seconds();
    (0..config.timing_window_secs).contains(&lead)
}

/// Flag last-second posting, escalating when the creator does it repeatedly.
///
/// `recent` is the creator's latest picks, newest first; the pick under test is
/// skipped if present.
pub fn detect_timing(pick: &Pick, recent: &[Pick], config: &FraudConfig) -> TimingFinding {
    let lead_seconds = (pick.game_start_time - pick.created_at).num_seconds();
    let is_suspicious = is_late_post(pick.created_at, pick.game_start_time, config);

    let prior_late = recent
        .iter()
        .filter(|p| p.id != pick.id)
        .take(config.timing_recent_window.saturating_sub(1))
        .filter(|p| is_late_post(p.created_at, p.game_start_time, config))
        .count();
    let recent_late_posts = prior_late + usize::from(is_suspicious);

    let is_pattern = is_suspicious && recent_late_posts > config.timing_pattern_count;
    let severity = match (is_suspicious, is_pattern) {
        (true, true) => Some(Severity::High),
        (true, false) => Some(Severity::Low),
        _ => None,
    };

    TimingFinding {
        is_suspicious,
        lead_seconds,
        recent_late_posts,
        is_pattern,
        severity,
    }
}
