use crate::config::FraudConfig;
use crate::domain::{OutlierFinding, Severity, UnitsBaseline};

/// Compare a stake against the creator's historical units.
///
/// `baseline` must not contain the stake under test.
pub fn detect_outlier(
    units: f64,
    baseline: &UnitsBaseline,
    config: &FraudConfig,
) -> OutlierFinding {
    let (mean, std_dev) = match (baseline.mean(), baseline.std_dev()) {
        (Some(mean), Some(std_dev)) => (mean, std_dev),
        _ => return OutlierFinding::default(),
    };

    let mut finding = OutlierFinding {
        mean: Some(mean),
        std_dev: Some(std_dev),
        ..Default::default()
    };

    if baseline.count < config.outlier_min_history || std_dev <= f64::EPSILON {
        return finding;
    }

    let z = (units - mean) / std_dev;
    finding.z_score = Some(z);

    if z > config.outlier_z_threshold {
        finding.is_outlier = true;
        finding.severity = Some(if z > config.outlier_high_z {
            Severity::High
        } else if z > config.outlier_medium_z {
            Severity::Medium
        } else {
            Severity::Low
        });
    }

    finding
}
