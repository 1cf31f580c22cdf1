use crate::error::{FilterError, Result};
use crate::state_estimator::Position;

fn check_lengths(truth: &[Position], estimate: &[Position]) -> Result<()> {
    if truth.len() != estimate.len() {
        return Err(FilterError::DimensionMismatch {
            expected: truth.len(),
            found: estimate.len(),
        });
    }
    if truth.is_empty() {
        return Err(FilterError::InvalidConfiguration(
            "cannot evaluate an empty sequence".to_string(),
        ));
    }
    Ok(())
}

/// Euclidean distance between matching positions.
pub fn euclidean_errors(truth: &[Position], estimate: &[Position]) -> Result<Vec<f64>> {
    check_lengths(truth, estimate)?;
    Ok(truth
        .iter()
        .zip(estimate)
        .map(|(gt, est)| (gt - est).norm())
        .collect())
}

/// Mean over samples of the squared Euclidean distance.
pub fn mean_squared_error(truth: &[Position], estimate: &[Position]) -> Result<f64> {
    check_lengths(truth, estimate)?;
    let sum: f64 = truth
        .iter()
        .zip(estimate)
        .map(|(gt, est)| (gt - est).norm_squared())
        .sum();
    Ok(sum / truth.len() as f64)
}

/// Reduction of the filtered error relative to the raw one, in percent.
///
/// Zero when the raw error is zero, there is nothing to improve on.
pub fn improvement_percent(mse_raw: f64, mse_filtered: f64) -> f64 {
    if mse_raw > 0.0 {
        (1.0 - mse_filtered / mse_raw) * 100.0
    } else {
        0.0
    }
}
